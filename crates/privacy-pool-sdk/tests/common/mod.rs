#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use privacy_pool_sdk::chain::{EventCursor, EventPage, OnChainTreeState, PoolChain};
use privacy_pool_sdk::merkle::{MerkleTree, ROOT_HISTORY_SIZE, TREE_DEPTH};
use privacy_pool_sdk::prover::{ProofRequest, ProofResponse, ProofService};
use privacy_pool_sdk::transaction::{Argument, PoolTransaction, PureValue, SubmitResult, TransactionSigner};
use privacy_pool_sdk::{ChainEvent, DepositEvent, EventKind, Result, SdkError, WithdrawalEvent};

#[derive(Default)]
struct ChainState {
    deposits: Vec<DepositEvent>,
    withdrawals: Vec<WithdrawalEvent>,
    /// How many deposit events the indexer has caught up on; `None` means all.
    indexed_deposits: Option<usize>,
    tree_override: Option<OnChainTreeState>,
}

/// In-memory pool: events are paged by offset and the tree state is derived
/// from every deposit, indexed or not.
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
    pub event_queries: Arc<AtomicUsize>,
    pub state_queries: Arc<AtomicUsize>,
}

pub fn commitment_bytes(n: u64) -> [u8; 32] {
    let mut commitment = [0u8; 32];
    commitment[24..].copy_from_slice(&(n + 1).to_be_bytes());
    commitment
}

impl MockChain {
    pub fn with_deposits(count: u64) -> Self {
        let chain = Self::default();
        for i in 0..count {
            chain.push_deposit(commitment_bytes(i), 1_000_000_000);
        }
        chain
    }

    pub fn push_deposit(&self, commitment: [u8; 32], amount: u64) -> DepositEvent {
        let mut state = self.state.lock().unwrap();
        let event = DepositEvent {
            commitment,
            amount,
            leaf_index: state.deposits.len() as u64,
            timestamp: 1_700_000_000_000 + state.deposits.len() as u64,
        };
        state.deposits.push(event.clone());
        event
    }

    pub fn push_withdrawal(&self, nullifier_hash: [u8; 32], recipient: &str, amount: u64) -> WithdrawalEvent {
        let mut state = self.state.lock().unwrap();
        let event = WithdrawalEvent {
            nullifier_hash,
            recipient: recipient.to_string(),
            amount,
            timestamp: 1_800_000_000_000 + state.withdrawals.len() as u64,
        };
        state.withdrawals.push(event.clone());
        event
    }

    pub fn set_indexed_deposits(&self, indexed: Option<usize>) {
        self.state.lock().unwrap().indexed_deposits = indexed;
    }

    pub fn override_tree_state(&self, tree: OnChainTreeState) {
        self.state.lock().unwrap().tree_override = Some(tree);
    }

    /// Reference tree built from all deposits in order.
    pub fn reference_tree(&self) -> MerkleTree {
        let state = self.state.lock().unwrap();
        MerkleTree::from_leaves(
            TREE_DEPTH,
            ROOT_HISTORY_SIZE,
            state.deposits.iter().map(|d| d.leaf().unwrap()),
        )
        .unwrap()
    }
}

#[async_trait]
impl PoolChain for MockChain {
    async fn query_events(
        &self,
        kind: EventKind,
        cursor: Option<EventCursor>,
        limit: usize,
    ) -> Result<EventPage> {
        self.event_queries.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        let all: Vec<ChainEvent> = match kind {
            EventKind::Deposit => {
                let visible = state.indexed_deposits.unwrap_or(state.deposits.len());
                state.deposits[..visible.min(state.deposits.len())]
                    .iter()
                    .cloned()
                    .map(ChainEvent::Deposit)
                    .collect()
            }
            EventKind::Withdrawal => state
                .withdrawals
                .iter()
                .cloned()
                .map(ChainEvent::Withdrawal)
                .collect(),
        };

        let start = match cursor {
            Some(c) => c
                .event_seq
                .parse::<usize>()
                .map_err(|e| SdkError::Rpc(e.to_string()))?,
            None => 0,
        };
        let end = (start + limit).min(all.len());
        Ok(EventPage {
            events: all[start.min(end)..end].to_vec(),
            next_cursor: Some(EventCursor {
                tx_digest: format!("digest-{}", end),
                event_seq: end.to_string(),
            }),
            has_next_page: end < all.len(),
        })
    }

    async fn pool_tree_state(&self) -> Result<OnChainTreeState> {
        self.state_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(tree) = self.state.lock().unwrap().tree_override.clone() {
            return Ok(tree);
        }
        let tree = self.reference_tree();
        Ok(OnChainTreeState {
            next_index: tree.len() as u64,
            current_root_index: tree.current_root_index() as u64,
            roots: tree.roots().to_vec(),
        })
    }
}

#[derive(Clone)]
pub struct MockProver {
    proof_len: usize,
    pub calls: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<ProofRequest>>>,
}

impl MockProver {
    pub fn new(proof_len: usize) -> Self {
        Self {
            proof_len,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ProofService for MockProver {
    async fn generate_proof(&self, request: &ProofRequest) -> Result<ProofResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        Ok(ProofResponse {
            proof: format!("0x{}", "ab".repeat(self.proof_len)),
            public_inputs: None,
        })
    }
}

/// Executes pool move calls directly against a [`MockChain`].
pub struct MockSigner {
    pub chain: MockChain,
    pub submitted: Mutex<Vec<PoolTransaction>>,
}

impl MockSigner {
    pub fn new(chain: MockChain) -> Self {
        Self {
            chain,
            submitted: Mutex::new(Vec::new()),
        }
    }
}

fn bytes_arg(arg: &Argument) -> Vec<u8> {
    match arg {
        Argument::Pure {
            value: PureValue::Bytes { value },
        } => value.clone(),
        other => panic!("expected bytes argument, got {:?}", other),
    }
}

fn u64_arg(arg: &Argument) -> u64 {
    match arg {
        Argument::Pure {
            value: PureValue::U64 { value },
        } => *value,
        other => panic!("expected u64 argument, got {:?}", other),
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    async fn sign_and_submit(&self, transaction: &PoolTransaction) -> Result<SubmitResult> {
        self.submitted.lock().unwrap().push(transaction.clone());
        let (target, args) = transaction
            .move_call()
            .ok_or_else(|| SdkError::Signer("no move call".into()))?;

        let event = if target.ends_with("::deposit") {
            let commitment: [u8; 32] = bytes_arg(&args[1]).try_into().unwrap();
            ChainEvent::Deposit(self.chain.push_deposit(commitment, u64_arg(&args[3])))
        } else if target.ends_with("::withdraw") {
            let nullifier_hash: [u8; 32] = bytes_arg(&args[3]).try_into().unwrap();
            ChainEvent::Withdrawal(self.chain.push_withdrawal(
                nullifier_hash,
                "0xrecipient",
                u64_arg(&args[4]),
            ))
        } else {
            return Err(SdkError::Signer(format!("unknown target {}", target)));
        };

        Ok(SubmitResult {
            digest: format!("tx-{}", self.submitted.lock().unwrap().len()),
            events: vec![event],
        })
    }
}
