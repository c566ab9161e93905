use std::time::Duration;

use crate::amount::CoinUnits;
use crate::merkle::{ROOT_HISTORY_SIZE, TREE_DEPTH};
use crate::retry::RetryPolicy;
use crate::transaction::{PoolObjects, DEFAULT_GAS_BUDGET, SUI_CLOCK_OBJECT_ID};

pub const DEFAULT_NETWORK: &str = "testnet";
pub const DEFAULT_NET_ID: u64 = 1;
/// A sync younger than this is reused unless forced.
pub const DEFAULT_SYNC_WINDOW: Duration = Duration::from_secs(5);
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub package_id: String,
    /// Shared pool configuration object holding the on-chain tree.
    pub config_id: String,
    pub clock_id: String,
    pub network: String,
    pub net_id: u64,
    pub tree_depth: usize,
    pub root_history_size: usize,
    pub gas_budget: u64,
    pub sync_window: Duration,
    pub page_size: usize,
    pub retry: RetryPolicy,
    pub units: CoinUnits,
}

impl ClientConfig {
    pub fn new(package_id: impl Into<String>, config_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            config_id: config_id.into(),
            clock_id: SUI_CLOCK_OBJECT_ID.to_string(),
            network: DEFAULT_NETWORK.to_string(),
            net_id: DEFAULT_NET_ID,
            tree_depth: TREE_DEPTH,
            root_history_size: ROOT_HISTORY_SIZE,
            gas_budget: DEFAULT_GAS_BUDGET,
            sync_window: DEFAULT_SYNC_WINDOW,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            units: CoinUnits::default(),
        }
    }

    pub fn with_network(mut self, network: &str, net_id: u64) -> Self {
        self.network = network.to_string();
        self.net_id = net_id;
        self
    }

    pub fn with_clock(mut self, clock_id: &str) -> Self {
        self.clock_id = clock_id.to_string();
        self
    }

    pub fn with_tree(mut self, depth: usize, root_history_size: usize) -> Self {
        self.tree_depth = depth;
        self.root_history_size = root_history_size;
        self
    }

    pub fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    pub fn with_sync_window(mut self, window: Duration) -> Self {
        self.sync_window = window;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_units(mut self, units: CoinUnits) -> Self {
        self.units = units;
        self
    }

    pub fn pool_objects(&self) -> PoolObjects {
        PoolObjects {
            package_id: self.package_id.clone(),
            config_id: self.config_id.clone(),
            clock_id: self.clock_id.clone(),
            gas_budget: self.gas_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("0xpkg", "0xcfg");
        assert_eq!(config.clock_id, "0x6");
        assert_eq!(config.tree_depth, 20);
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.gas_budget, 5_000_000_000);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new("0xpkg", "0xcfg")
            .with_network("devnet", 7)
            .with_page_size(0)
            .with_sync_window(Duration::ZERO);
        assert_eq!(config.network, "devnet");
        assert_eq!(config.net_id, 7);
        assert_eq!(config.page_size, 1);
        assert_eq!(config.pool_objects().package_id, "0xpkg");
    }
}
