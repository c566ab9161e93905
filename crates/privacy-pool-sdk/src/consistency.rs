//! Local tree vs. on-chain tree comparison run before every withdrawal proof.

use ark_bn254::Fr;
use tracing::{debug, error};

use crate::chain::OnChainTreeState;
use crate::crypto::field_to_decimal;
use crate::error::{Result, SdkError};

/// What the verifier observed when both sides agree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub leaf_count: u64,
    pub root: Fr,
}

/// Compare the local leaf count and root with the chain's `next_index` and
/// current root. `empty_root` is the local root of a tree with no leaves.
pub fn verify_consistency(
    local_leaf_count: u64,
    local_root: &Fr,
    empty_root: &Fr,
    on_chain: &OnChainTreeState,
) -> Result<ConsistencyReport> {
    if local_leaf_count != on_chain.next_index {
        debug!(
            local = local_leaf_count,
            on_chain = on_chain.next_index,
            "Leaf count mismatch"
        );
        return Err(SdkError::LeafCountMismatch {
            local: local_leaf_count,
            on_chain: on_chain.next_index,
        });
    }

    let chain_root = on_chain.current_root()?;
    if chain_root == *local_root {
        return Ok(ConsistencyReport {
            leaf_count: local_leaf_count,
            root: chain_root,
        });
    }

    let local = field_to_decimal(local_root);
    let remote = field_to_decimal(&chain_root);
    error!(
        leaf_count = local_leaf_count,
        local_root = %local,
        on_chain_root = %remote,
        "Merkle root mismatch"
    );

    if local_leaf_count == 0 && local_root == empty_root {
        return Err(SdkError::HashAlgorithmMismatch(format!(
            "empty tree roots differ (local {}, on-chain {}); check the hash function and zero value",
            local, remote
        )));
    }

    Err(SdkError::RootMismatch {
        local_root: local,
        on_chain_root: remote,
        leaf_count: local_leaf_count,
    })
}
