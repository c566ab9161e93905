use anyhow::{anyhow, Result};
use pool_transport::DEFAULT_TIMEOUT_SECS;
use privacy_pool_sdk::config::{DEFAULT_NETWORK, DEFAULT_NET_ID};
use privacy_pool_sdk::prover::DEFAULT_PROOF_TIMEOUT_SECS;

pub const DEFAULT_RPC_URL: &str = "https://fullnode.testnet.sui.io:443";
pub const DEFAULT_PROOF_SERVICE_URL: &str = "http://localhost:8080";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliConfig {
    pub rpc_url: String,
    pub package_id: Option<String>,
    pub config_id: Option<String>,
    pub proof_service_url: String,
    pub network: String,
    pub net_id: u64,
    pub rpc_timeout_secs: u64,
    pub proof_timeout_secs: u64,
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|e| anyhow!("Invalid {}='{}': {}", key, value, e)),
                None => Ok(default),
            }
        };

        Ok(Self {
            rpc_url: lookup("POOL_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            package_id: lookup("POOL_PACKAGE_ID").filter(|s| !s.is_empty()),
            config_id: lookup("POOL_CONFIG_ID").filter(|s| !s.is_empty()),
            proof_service_url: lookup("PROOF_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_PROOF_SERVICE_URL.to_string()),
            network: lookup("POOL_NETWORK").unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
            net_id: number("POOL_NET_ID", DEFAULT_NET_ID)?,
            rpc_timeout_secs: number("RPC_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            proof_timeout_secs: number("PROOF_TIMEOUT_SECS", DEFAULT_PROOF_TIMEOUT_SECS)?,
        })
    }

    /// Package and pool config object ids, required by every chain command.
    pub fn pool_ids(&self) -> Result<(&str, &str)> {
        let package = self
            .package_id
            .as_deref()
            .ok_or_else(|| anyhow!("POOL_PACKAGE_ID is not set (or pass --package)"))?;
        let config = self
            .config_id
            .as_deref()
            .ok_or_else(|| anyhow!("POOL_CONFIG_ID is not set (or pass --pool-config)"))?;
        Ok((package, config))
    }
}
