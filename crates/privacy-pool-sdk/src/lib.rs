//! Client SDK for a fixed-denomination privacy pool on Sui.
//!
//! Deposits insert a Poseidon commitment into the pool's on-chain MiMC Merkle
//! tree. Withdrawals rebuild that tree locally from deposit events, check it
//! against the chain, and ask an external service for the zero-knowledge proof.
//!
//! Commitments and nullifier hashes use Poseidon (circom parameters via
//! `light-poseidon`) rather than a Pedersen hash; the withdrawal circuit must
//! use the same scheme.

pub mod amount;
pub mod chain;
pub mod client;
pub mod config;
pub mod consistency;
pub mod crypto;
pub mod error;
pub mod events;
pub mod merkle;
pub mod mimc;
pub mod note;
pub mod prover;
pub mod retry;
pub mod rpc;
pub mod stats;
pub mod transaction;

pub use amount::CoinUnits;
pub use chain::{EventCursor, EventPage, OnChainTreeState, PoolChain};
pub use client::{PrivacyPoolClient, PublicInputs, SyncReport, WithdrawParams, WithdrawalProof};
pub use config::ClientConfig;
pub use error::{Classify, ErrorClass, Result, SdkError};
pub use events::{ChainEvent, DepositEvent, EventKind, WithdrawalEvent};
pub use merkle::{MerkleProof, MerkleTree};
pub use note::DepositNote;
pub use prover::{HttpProofService, ProofRequest, ProofResponse, ProofService, ProofServiceError};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use rpc::SuiRpcChain;
pub use stats::PoolStats;
pub use transaction::{PoolTransaction, SubmitResult, TransactionSigner};
