use thiserror::Error;

use crate::prover::ProofServiceError;

pub type Result<T> = std::result::Result<T, SdkError>;

/// Whether a failure may go away on its own (retry) or must stop the operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Fatal,
    Transient,
}

/// Implemented by error types that the retry orchestrator can classify.
pub trait Classify {
    fn class(&self) -> ErrorClass;

    fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

#[derive(Error, Debug)]
pub enum SdkError {
    #[error(
        "Merkle tree out of sync: local tree has {local} commitments but chain reports {on_chain}; \
         deposit events are probably still being indexed"
    )]
    LeafCountMismatch { local: u64, on_chain: u64 },

    #[error(
        "Merkle root mismatch with {leaf_count} commitments on both sides: \
         local root {local_root}, on-chain root {on_chain_root}"
    )]
    RootMismatch {
        local_root: String,
        on_chain_root: String,
        leaf_count: u64,
    },

    #[error("Hash algorithm mismatch: {0}")]
    HashAlgorithmMismatch(String),

    #[error("Commitment parse error: {0}")]
    CommitmentParse(String),

    #[error("Deposit event gap: expected leaf index {expected}, found {found}")]
    EventGap { expected: u64, found: u64 },

    #[error("Duplicate deposit event for leaf index {0}")]
    DuplicateLeafIndex(u64),

    #[error("Note not found in Merkle tree (leaf index {leaf_index:?}, tree has {leaf_count} leaves); it may be unconfirmed or stale")]
    NoteNotInTree {
        leaf_index: Option<u64>,
        leaf_count: u64,
    },

    #[error("Note commitment does not match the tree leaf at index {leaf_index}")]
    NoteCommitmentMismatch { leaf_index: u64 },

    #[error("Merkle tree changed during proof generation (verified generation {expected}, current {actual})")]
    StaleTree { expected: u64, actual: u64 },

    #[error("Invalid proof length: expected 128 or 256 bytes, got {0}")]
    InvalidProofLength(usize),

    #[error("Malformed proof encoding: {0}")]
    MalformedProofHex(String),

    #[error(transparent)]
    ProofService(#[from] ProofServiceError),

    #[error("Network error: {0}")]
    Network(#[from] pool_transport::TransportError),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Invalid chain state: {0}")]
    ChainState(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Merkle tree error: {0}")]
    MerkleTree(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid note: {0}")]
    InvalidNote(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Classify for SdkError {
    fn class(&self) -> ErrorClass {
        match self {
            SdkError::RootMismatch { .. }
            | SdkError::HashAlgorithmMismatch(_)
            | SdkError::CommitmentParse(_)
            | SdkError::DuplicateLeafIndex(_)
            | SdkError::NoteNotInTree { .. }
            | SdkError::NoteCommitmentMismatch { .. }
            | SdkError::InvalidProofLength(_)
            | SdkError::MalformedProofHex(_)
            | SdkError::MerkleTree(_)
            | SdkError::Crypto(_)
            | SdkError::InvalidNote(_)
            | SdkError::InvalidInput(_) => ErrorClass::Fatal,

            SdkError::LeafCountMismatch { .. }
            | SdkError::EventGap { .. }
            | SdkError::StaleTree { .. }
            | SdkError::Network(_)
            | SdkError::Rpc(_)
            | SdkError::ChainState(_)
            | SdkError::ProofService(_)
            | SdkError::Signer(_)
            | SdkError::Serialization(_) => ErrorClass::Transient,
        }
    }
}
