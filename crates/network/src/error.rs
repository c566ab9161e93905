use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl TransportError {
    /// HTTP status code, when the failure came from a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(format!("{}: {}", context, err))
        } else if err.is_connect() || err.is_request() {
            TransportError::Connection(format!("{}: {}", context, err))
        } else if err.is_decode() || err.is_body() {
            TransportError::Decode(format!("{}: {}", context, err))
        } else if let Some(status) = err.status() {
            TransportError::Status {
                code: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            TransportError::Connection(format!("{}: {}", context, err))
        }
    }
}
