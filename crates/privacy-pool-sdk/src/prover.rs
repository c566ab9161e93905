//! Client for the external proof-generation service and decoding of the
//! proof bytes it returns.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use pool_transport::{Config, HttpClient, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{Result, SdkError};

pub const DEFAULT_PROOF_TIMEOUT_SECS: u64 = 120;
pub const PROOF_GENERATE_PATH: &str = "/circom/proof/generate";
pub const VERIFYING_KEY_PATH: &str = "/circom/verifying/key";

pub const PROOF_LENGTH: usize = 256;
/// Older prover builds return compressed 128-byte proofs.
pub const LEGACY_PROOF_LENGTH: usize = 128;

/// Prover failures worded for the person waiting on the withdrawal.
#[derive(Error, Debug)]
pub enum ProofServiceError {
    #[error("Proof generation timed out; the proof service may be overloaded, try again later")]
    Timeout,

    #[error("Cannot reach the proof service; check the service URL and your network connection")]
    Unreachable(String),

    #[error("Proof service internal error: {0}")]
    ServerError(String),

    #[error("Proof service rejected the request: {0}")]
    BadRequest(String),

    #[error("Proof service endpoint not found; check the service URL")]
    NotFound,

    #[error("Proof generation failed: {0}")]
    Other(String),
}

impl From<TransportError> for ProofServiceError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => ProofServiceError::Timeout,
            TransportError::Connection(msg) => ProofServiceError::Unreachable(msg),
            TransportError::Status { code: 404, .. } => ProofServiceError::NotFound,
            TransportError::Status { code, body } if code >= 500 => {
                ProofServiceError::ServerError(format!("HTTP {}: {}", code, body))
            }
            TransportError::Status { code, body } if code >= 400 => {
                ProofServiceError::BadRequest(format!("HTTP {}: {}", code, body))
            }
            other => ProofServiceError::Other(other.to_string()),
        }
    }
}

/// Body of `POST /circom/proof/generate`. Field order is what the service expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub refund: u64,
    pub nullifier: String,
    /// On-chain root, decimal.
    pub root: String,
    pub nullifier_hash: String,
    pub secret: String,
    pub path_indices: Vec<u8>,
    pub recipient: String,
    /// Sibling hashes as decimal strings reduced mod the BN254 scalar modulus.
    pub path_elements: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofResponse {
    pub proof: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_inputs: Option<String>,
}

impl ProofResponse {
    /// Accepts `{proof, public_inputs?}` either top-level or wrapped in `data`.
    pub fn from_json(value: &Value) -> std::result::Result<Self, ProofServiceError> {
        let body = value.get("data").filter(|d| d.is_object()).unwrap_or(value);
        serde_json::from_value(body.clone())
            .map_err(|e| ProofServiceError::Other(format!("unexpected response: {}", e)))
    }
}

#[async_trait]
pub trait ProofService: Send + Sync {
    async fn generate_proof(&self, request: &ProofRequest) -> Result<ProofResponse>;
}

pub struct HttpProofService {
    client: HttpClient,
    base_url: String,
}

impl HttpProofService {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(
            base_url,
            Config::default().with_timeout(DEFAULT_PROOF_TIMEOUT_SECS),
        )
    }

    pub fn with_config(base_url: impl Into<String>, config: Config) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SdkError::InvalidInput("Proof service URL is empty".into()));
        }
        Ok(Self {
            client: HttpClient::new(config)?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.client.config().timeout_secs)
    }

    /// Raw verifying key document published by the service.
    pub async fn verifying_key(&self) -> Result<Value> {
        let url = format!("{}{}", self.base_url, VERIFYING_KEY_PATH);
        let value: Value = self
            .client
            .get_json(&url)
            .await
            .map_err(ProofServiceError::from)?;
        Ok(value.get("data").cloned().unwrap_or(value))
    }
}

#[async_trait]
impl ProofService for HttpProofService {
    async fn generate_proof(&self, request: &ProofRequest) -> Result<ProofResponse> {
        let url = format!("{}{}", self.base_url, PROOF_GENERATE_PATH);
        info!(
            url = %url,
            depth = request.path_elements.len(),
            timeout_secs = self.client.config().timeout_secs,
            "Requesting withdrawal proof"
        );
        let started = Instant::now();
        let value: Value = self
            .client
            .post_json(&url, request)
            .await
            .map_err(ProofServiceError::from)?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Proof service responded");
        Ok(ProofResponse::from_json(&value)?)
    }
}

/// Decode the hex proof. 256 bytes is the current format; 128 bytes is
/// accepted with a warning.
pub fn decode_proof(proof_hex: &str) -> Result<Vec<u8>> {
    let digits = proof_hex.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    if digits.len() % 2 != 0 {
        return Err(SdkError::MalformedProofHex(format!(
            "odd number of hex digits ({})",
            digits.len()
        )));
    }
    let bytes = hex::decode(digits).map_err(|e| SdkError::MalformedProofHex(e.to_string()))?;

    match bytes.len() {
        PROOF_LENGTH => Ok(bytes),
        LEGACY_PROOF_LENGTH => {
            warn!("Proof service returned a 128-byte proof; expected 256");
            Ok(bytes)
        }
        other => Err(SdkError::InvalidProofLength(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Classify;
    use serde_json::json;

    #[test]
    fn test_decode_proof_lengths() {
        assert_eq!(decode_proof(&format!("0x{}", "ab".repeat(256))).unwrap().len(), 256);
        assert_eq!(decode_proof(&"cd".repeat(128)).unwrap().len(), 128);

        let err = decode_proof(&"00".repeat(100)).unwrap_err();
        assert!(matches!(err, SdkError::InvalidProofLength(100)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_decode_proof_malformed() {
        assert!(matches!(decode_proof("0xabc"), Err(SdkError::MalformedProofHex(_))));
        assert!(matches!(
            decode_proof(&"zz".repeat(256)),
            Err(SdkError::MalformedProofHex(_))
        ));
    }

    #[test]
    fn test_response_envelopes() {
        let flat = ProofResponse::from_json(&json!({"proof": "0x01"})).unwrap();
        assert_eq!(flat.proof, "0x01");
        assert_eq!(flat.public_inputs, None);

        let wrapped =
            ProofResponse::from_json(&json!({"data": {"proof": "0x02", "public_inputs": "0x03"}}))
                .unwrap();
        assert_eq!(wrapped.proof, "0x02");
        assert_eq!(wrapped.public_inputs.as_deref(), Some("0x03"));

        assert!(ProofResponse::from_json(&json!({"data": "nope"})).is_err());
    }

    #[test]
    fn test_request_field_order() {
        let request = ProofRequest {
            refund: 1,
            nullifier: "0x1".into(),
            root: "2".into(),
            nullifier_hash: "0x3".into(),
            secret: "0x4".into(),
            path_indices: vec![0, 1],
            recipient: "0x5".into(),
            path_elements: vec!["6".into(), "7".into()],
        };
        let body = serde_json::to_string(&request).unwrap();
        let keys = [
            "refund", "nullifier", "root", "nullifier_hash", "secret", "path_indices", "recipient",
            "path_elements",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| body.find(&format!("\"{}\":", k)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_transport_error_mapping() {
        assert!(matches!(
            ProofServiceError::from(TransportError::Timeout("t".into())),
            ProofServiceError::Timeout
        ));
        assert!(matches!(
            ProofServiceError::from(TransportError::Status { code: 404, body: String::new() }),
            ProofServiceError::NotFound
        ));
        assert!(matches!(
            ProofServiceError::from(TransportError::Status { code: 502, body: String::new() }),
            ProofServiceError::ServerError(_)
        ));
        assert!(matches!(
            ProofServiceError::from(TransportError::Status { code: 400, body: String::new() }),
            ProofServiceError::BadRequest(_)
        ));
        assert!(matches!(
            ProofServiceError::from(TransportError::Connection("refused".into())),
            ProofServiceError::Unreachable(_)
        ));
    }
}
