//! HTTP and JSON-RPC transport used by the privacy pool client to reach
//! a full node and the proof-generation service.
//!
//! ```rust,no_run
//! use pool_transport::{Config, JsonRpcClient};
//!
//! #[tokio::main]
//! async fn main() -> pool_transport::Result<()> {
//!     let rpc = JsonRpcClient::new("https://fullnode.testnet.sui.io", Config::default())?;
//!     let checkpoint: String = rpc
//!         .call("sui_getLatestCheckpointSequenceNumber", serde_json::json!([]))
//!         .await?;
//!     println!("latest checkpoint: {}", checkpoint);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http_client;
pub mod jsonrpc;

pub use config::{Config, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use error::{Result, TransportError};
pub use http_client::HttpClient;
pub use jsonrpc::JsonRpcClient;

pub fn http_client() -> Result<HttpClient> {
    HttpClient::new(Config::default())
}
