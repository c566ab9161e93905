use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, TransportError};
use crate::http_client::HttpClient;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 client over [`HttpClient`].
pub struct JsonRpcClient {
    http: HttpClient,
    endpoint: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(endpoint: &str, config: Config) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(TransportError::Config("RPC endpoint must not be empty".into()));
        }
        Ok(Self {
            http: HttpClient::new(config)?,
            endpoint: endpoint.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params: &params,
        };
        debug!("rpc call #{} {}", id, method);

        let response: RpcResponse = self.http.post_json(&self.endpoint, &request).await?;
        let result = decode_response(response)?;
        serde_json::from_value(result)
            .map_err(|e| TransportError::Decode(format!("{} result: {}", method, e)))
    }
}

fn decode_response(response: RpcResponse) -> Result<Value> {
    if let Some(err) = response.error {
        return Err(TransportError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    response
        .result
        .ok_or_else(|| TransportError::Decode("RPC response has neither result nor error".into()))
}
