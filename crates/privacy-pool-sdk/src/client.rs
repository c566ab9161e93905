//! Orchestrates the pool flows: note generation → deposit → tree sync →
//! consistency check → withdrawal proof → withdraw.

use std::sync::Arc;

use ark_bn254::Fr;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::chain::{self, PoolChain};
use crate::config::ClientConfig;
use crate::consistency::verify_consistency;
use crate::crypto::{
    address_to_field, field_to_be_bytes, field_to_decimal, number_to_field, reduce_to_field,
    validate_fee,
};
use crate::error::{Result, SdkError};
use crate::events::{deposit_events, DepositEvent, WithdrawalEvent};
use crate::merkle::{MerkleProof, MerkleTree};
use crate::note::DepositNote;
use crate::prover::{decode_proof, ProofRequest, ProofService};
use crate::retry::retry_with_backoff;
use crate::stats::{compute_stats, PoolStats};
use crate::transaction::{
    build_deposit_transaction, build_withdraw_transaction, PoolTransaction, SubmitResult,
    TransactionSigner,
};

pub const DEFAULT_RELAYER: &str = "0x0";

struct Accumulator {
    tree: Arc<MerkleTree>,
    /// Bumped on every successful rebuild.
    generation: u64,
    last_sync: Option<Instant>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub generation: u64,
    pub leaf_count: u64,
    pub root: Fr,
    /// The previous sync was recent enough to reuse.
    pub cached: bool,
}

/// Values the withdrawal circuit exposes publicly, field-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    /// On-chain root, decimal.
    pub root: String,
    pub nullifier_hash: String,
    pub recipient: String,
    pub relayer: String,
    pub fee: String,
    pub refund: String,
}

#[derive(Clone, Debug)]
pub struct WithdrawalProof {
    pub proof: Vec<u8>,
    pub public_inputs: PublicInputs,
    pub merkle_proof: MerkleProof,
    /// Public inputs echoed back by the proof service, when it sends them.
    pub service_public_inputs: Option<String>,
}

#[derive(Clone, Debug)]
pub struct WithdrawParams<'a> {
    pub note: &'a DepositNote,
    pub recipient: String,
    pub relayer: String,
    pub fee: u64,
}

impl<'a> WithdrawParams<'a> {
    pub fn new(note: &'a DepositNote, recipient: impl Into<String>) -> Self {
        Self {
            note,
            recipient: recipient.into(),
            relayer: DEFAULT_RELAYER.to_string(),
            fee: 0,
        }
    }

    pub fn with_relayer(mut self, relayer: impl Into<String>, fee: u64) -> Self {
        self.relayer = relayer.into();
        self.fee = fee;
        self
    }
}

pub struct PrivacyPoolClient<C, P> {
    config: ClientConfig,
    chain: C,
    prover: P,
    accumulator: RwLock<Accumulator>,
}

impl<C: PoolChain, P: ProofService> PrivacyPoolClient<C, P> {
    pub fn new(config: ClientConfig, chain: C, prover: P) -> Result<Self> {
        let tree = MerkleTree::with_history(config.tree_depth, config.root_history_size)?;
        Ok(Self {
            config,
            chain,
            prover,
            accumulator: RwLock::new(Accumulator {
                tree: Arc::new(tree),
                generation: 0,
                last_sync: None,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn generate_deposit(&self, denomination: u64) -> Result<DepositNote> {
        let note = DepositNote::generate(
            denomination,
            &self.config.network,
            self.config.net_id,
            &self.config.units,
        )?;
        info!(id = %note.id, amount = %note.amount, "Generated deposit note");
        Ok(note)
    }

    pub fn create_deposit_transaction(
        &self,
        amount: u64,
        commitment: &[u8; 32],
        coin_ids: &[String],
    ) -> Result<PoolTransaction> {
        build_deposit_transaction(&self.config.pool_objects(), commitment, amount, coin_ids)
    }

    /// Submit the deposit for `note` and record its leaf index and digest.
    pub async fn deposit<S>(
        &self,
        note: &mut DepositNote,
        coin_ids: &[String],
        signer: &S,
    ) -> Result<SubmitResult>
    where
        S: TransactionSigner + ?Sized,
    {
        note.validate()?;
        if note.leaf_index.is_some() || note.tx_digest.is_some() {
            return Err(SdkError::InvalidNote(format!(
                "note {} is already deposited (leaf index {:?}, digest {:?})",
                note.id, note.leaf_index, note.tx_digest
            )));
        }
        let tx = self.create_deposit_transaction(note.denomination, &note.commitment, coin_ids)?;
        let result = signer.sign_and_submit(&tx).await?;

        // Funds have moved; from here on the result is always returned.
        note.set_tx_digest(result.digest.clone());
        let deposits = deposit_events(&result.events);
        let event = deposits
            .iter()
            .find(|e| e.commitment == note.commitment)
            .or_else(|| deposits.first());
        match event {
            Some(event) => {
                if let Err(e) = note.set_leaf_index(event.leaf_index) {
                    warn!(digest = %result.digest, error = %e, "Deposit leaf index conflict");
                }
            }
            None => warn!(digest = %result.digest, "Deposit emitted no DepositEvent"),
        }

        info!(digest = %result.digest, leaf_index = ?note.leaf_index, "Deposit submitted");
        Ok(result)
    }

    /// Rebuild the local tree from every deposit event unless a recent sync
    /// can be reused. The new tree is built off-lock and swapped in whole.
    pub async fn sync_merkle_tree(&self, force: bool) -> Result<SyncReport> {
        if !force {
            let acc = self.accumulator.read().await;
            if let Some(last) = acc.last_sync {
                if last.elapsed() < self.config.sync_window {
                    debug!(generation = acc.generation, "Using recently synced tree");
                    return Ok(SyncReport {
                        generation: acc.generation,
                        leaf_count: acc.tree.len() as u64,
                        root: acc.tree.root(),
                        cached: true,
                    });
                }
            }
        }

        info!(force, "Syncing Merkle tree from deposit events");
        let deposits = chain::query_all_deposit_events(&self.chain, self.config.page_size).await?;
        let tree = build_tree(&self.config, deposits)?;
        let leaf_count = tree.len() as u64;
        let root = tree.root();

        let mut acc = self.accumulator.write().await;
        acc.tree = Arc::new(tree);
        acc.generation += 1;
        acc.last_sync = Some(Instant::now());

        info!(
            generation = acc.generation,
            leaf_count,
            root = %field_to_decimal(&root),
            "Merkle tree synced"
        );
        Ok(SyncReport {
            generation: acc.generation,
            leaf_count,
            root,
            cached: false,
        })
    }

    pub async fn query_deposit_events(&self, limit: usize) -> Result<Vec<DepositEvent>> {
        chain::query_deposit_events(&self.chain, limit).await
    }

    pub async fn query_withdrawal_events(&self, limit: usize) -> Result<Vec<WithdrawalEvent>> {
        chain::query_withdrawal_events(&self.chain, limit).await
    }

    pub async fn query_all_deposit_events(&self) -> Result<Vec<DepositEvent>> {
        chain::query_all_deposit_events(&self.chain, self.config.page_size).await
    }

    pub async fn query_all_withdrawal_events(&self) -> Result<Vec<WithdrawalEvent>> {
        chain::query_all_withdrawal_events(&self.chain, self.config.page_size).await
    }

    pub async fn generate_withdrawal_proof(
        &self,
        note: &DepositNote,
        recipient: &str,
        relayer: &str,
        fee: u64,
    ) -> Result<WithdrawalProof> {
        note.validate()?;
        validate_fee(fee, note.denomination)?;
        let recipient_field = address_to_field(recipient)?;
        let relayer_field = address_to_field(relayer)?;
        let commitment = note.commitment_field()?;

        let (tree, on_chain_root) = retry_with_backoff(&self.config.retry, |attempt| async move {
            debug!(attempt, "Verifying tree consistency");
            self.sync_merkle_tree(true).await?;
            let state = self.chain.pool_tree_state().await?;
            let (tree, generation) = self.snapshot().await;

            let report = verify_consistency(
                tree.len() as u64,
                &tree.root(),
                &tree.empty_root(),
                &state,
            )?;
            check_note_leaf(&tree, note, &commitment)?;

            let current = self.generation().await;
            if current != generation {
                return Err(SdkError::StaleTree {
                    expected: generation,
                    actual: current,
                });
            }
            Ok::<_, SdkError>((tree, report.root))
        })
        .await?;

        let leaf_index = note.leaf_index.unwrap_or_default();
        let merkle_proof = tree.proof(leaf_index)?;
        if !MerkleTree::verify_proof(&tree.root(), &merkle_proof) {
            return Err(SdkError::MerkleTree(format!(
                "inclusion proof for leaf {} does not verify",
                leaf_index
            )));
        }
        debug!(leaf_index, depth = merkle_proof.path_elements.len(), "Built inclusion proof");

        let root = field_to_decimal(&on_chain_root);
        let public_inputs = PublicInputs {
            root: root.clone(),
            nullifier_hash: note.nullifier_hash_hex(),
            recipient: recipient_field,
            relayer: relayer_field,
            fee: number_to_field(fee),
            refund: number_to_field(note.denomination),
        };

        let request = ProofRequest {
            refund: note.denomination,
            nullifier: format!("0x{}", hex::encode(note.nullifier)),
            root,
            nullifier_hash: note.nullifier_hash_hex(),
            secret: format!("0x{}", hex::encode(note.secret)),
            path_indices: merkle_proof.path_indices.clone(),
            recipient: recipient.to_string(),
            path_elements: merkle_proof
                .path_elements
                .iter()
                .map(|e| reduce_to_field(&BigUint::from_bytes_be(&field_to_be_bytes(e))).to_string())
                .collect(),
        };

        let response = self.prover.generate_proof(&request).await?;
        let proof = decode_proof(&response.proof)?;
        info!(leaf_index, proof_len = proof.len(), "Withdrawal proof generated");

        Ok(WithdrawalProof {
            proof,
            public_inputs,
            merkle_proof,
            service_public_inputs: response.public_inputs,
        })
    }

    pub async fn create_withdraw_transaction(
        &self,
        params: &WithdrawParams<'_>,
    ) -> Result<PoolTransaction> {
        let proof = self
            .generate_withdrawal_proof(params.note, &params.recipient, &params.relayer, params.fee)
            .await?;
        build_withdraw_transaction(
            &self.config.pool_objects(),
            &proof.proof,
            &proof.public_inputs.root,
            &params.note.nullifier_hash,
            params.note.denomination,
        )
    }

    pub async fn withdraw<S>(&self, params: &WithdrawParams<'_>, signer: &S) -> Result<SubmitResult>
    where
        S: TransactionSigner + ?Sized,
    {
        let tx = self.create_withdraw_transaction(params).await?;
        let result = signer.sign_and_submit(&tx).await?;
        info!(digest = %result.digest, "Withdrawal submitted");
        Ok(result)
    }

    pub async fn get_stats(&self) -> Result<PoolStats> {
        let deposits = self.query_deposit_events(self.config.page_size).await?;
        let withdrawals = self.query_withdrawal_events(self.config.page_size).await?;
        Ok(compute_stats(&deposits, &withdrawals, &self.config.units))
    }

    pub async fn is_nullifier_used(&self, nullifier_hash: &[u8; 32]) -> Result<bool> {
        let withdrawals = self.query_all_withdrawal_events().await?;
        Ok(withdrawals.iter().any(|w| &w.nullifier_hash == nullifier_hash))
    }

    /// Fill the leaf index of a restored note by finding its commitment in a freshly synced tree.
    pub async fn locate_note(&self, note: &mut DepositNote) -> Result<u64> {
        let commitment = note.commitment_field()?;
        self.sync_merkle_tree(true).await?;
        let (tree, _) = self.snapshot().await;

        let index = tree
            .leaf_index_of(&commitment)
            .ok_or(SdkError::NoteNotInTree {
                leaf_index: note.leaf_index,
                leaf_count: tree.len() as u64,
            })?;
        note.set_leaf_index(index)?;
        Ok(index)
    }

    pub async fn current_root(&self) -> Fr {
        self.accumulator.read().await.tree.root()
    }

    pub async fn leaf_count(&self) -> u64 {
        self.accumulator.read().await.tree.len() as u64
    }

    pub async fn generation(&self) -> u64 {
        self.accumulator.read().await.generation
    }

    /// Current tree and its generation.
    pub async fn snapshot(&self) -> (Arc<MerkleTree>, u64) {
        let acc = self.accumulator.read().await;
        (acc.tree.clone(), acc.generation)
    }
}

/// Deposit events must cover leaf indices `0..n` exactly once.
fn build_tree(config: &ClientConfig, mut deposits: Vec<DepositEvent>) -> Result<MerkleTree> {
    deposits.sort_by_key(|e| e.leaf_index);

    let mut tree = MerkleTree::with_history(config.tree_depth, config.root_history_size)?;
    for (expected, event) in deposits.iter().enumerate() {
        let expected = expected as u64;
        if event.leaf_index < expected {
            return Err(SdkError::DuplicateLeafIndex(event.leaf_index));
        }
        if event.leaf_index > expected {
            return Err(SdkError::EventGap {
                expected,
                found: event.leaf_index,
            });
        }
        tree.insert(event.leaf()?)?;
    }
    Ok(tree)
}

fn check_note_leaf(tree: &MerkleTree, note: &DepositNote, commitment: &Fr) -> Result<()> {
    let leaf_count = tree.len() as u64;
    let index = match note.leaf_index {
        Some(index) if index < leaf_count => index,
        other => {
            return Err(SdkError::NoteNotInTree {
                leaf_index: other,
                leaf_count,
            })
        }
    };
    if tree.leaf(index).as_ref() != Some(commitment) {
        return Err(SdkError::NoteCommitmentMismatch { leaf_index: index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn event(leaf_index: u64) -> DepositEvent {
        let mut commitment = [0u8; 32];
        commitment[24..].copy_from_slice(&(leaf_index + 1).to_be_bytes());
        DepositEvent {
            commitment,
            amount: 1,
            leaf_index,
            timestamp: 0,
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("0xpkg", "0xcfg").with_tree(8, 4)
    }

    #[test]
    fn test_build_tree_sorts_events() {
        let tree = build_tree(&config(), vec![event(2), event(0), event(1)]).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.leaf(0), Some(Fr::from(1u64)));
        assert_eq!(tree.leaf(2), Some(Fr::from(3u64)));
    }

    #[test]
    fn test_build_tree_rejects_gap_and_duplicate() {
        let gap = build_tree(&config(), vec![event(0), event(2)]).unwrap_err();
        assert!(matches!(gap, SdkError::EventGap { expected: 1, found: 2 }));

        let dup = build_tree(&config(), vec![event(0), event(1), event(1)]).unwrap_err();
        assert!(matches!(dup, SdkError::DuplicateLeafIndex(1)));
    }

    #[test]
    fn test_check_note_leaf() {
        let tree = build_tree(&config(), vec![event(0), event(1)]).unwrap();
        let mut note = DepositNote::generate(10, "testnet", 1, &Default::default()).unwrap();
        let commitment = note.commitment_field().unwrap();

        assert!(matches!(
            check_note_leaf(&tree, &note, &commitment),
            Err(SdkError::NoteNotInTree { leaf_index: None, leaf_count: 2 })
        ));
        note.set_leaf_index(1).unwrap();
        assert!(matches!(
            check_note_leaf(&tree, &note, &commitment),
            Err(SdkError::NoteCommitmentMismatch { leaf_index: 1 })
        ));
    }
}
