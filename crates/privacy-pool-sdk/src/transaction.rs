//! Programmable transactions for the pool's `deposit` and `withdraw` entry
//! functions. Building is pure; signing and submission belong to an injected
//! [`TransactionSigner`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkError};
use crate::events::ChainEvent;

pub const DEFAULT_GAS_BUDGET: u64 = 5_000_000_000;
pub const SUI_CLOCK_OBJECT_ID: &str = "0x6";
pub const POOL_MODULE: &str = "privacy_pool";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PureValue {
    U64 { value: u64 },
    /// Decimal string; u256 does not fit any native integer.
    U256 { value: String },
    Bytes { value: Vec<u8> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Argument {
    Object { id: String },
    Pure { value: PureValue },
    /// Output of an earlier command.
    Result { index: u16 },
    NestedResult { index: u16, result: u16 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    MergeCoins {
        destination: Argument,
        sources: Vec<Argument>,
    },
    SplitCoins {
        coin: Argument,
        amounts: Vec<Argument>,
    },
    MakeMoveVec {
        elements: Vec<Argument>,
    },
    MoveCall {
        target: String,
        arguments: Vec<Argument>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTransaction {
    pub commands: Vec<Command>,
    pub gas_budget: u64,
}

impl PoolTransaction {
    pub fn new(gas_budget: u64) -> Self {
        Self {
            commands: Vec::new(),
            gas_budget,
        }
    }

    /// Append a command and return a handle to its result.
    pub fn push(&mut self, command: Command) -> Argument {
        self.commands.push(command);
        Argument::Result {
            index: (self.commands.len() - 1) as u16,
        }
    }

    pub fn move_call(&self) -> Option<(&str, &[Argument])> {
        self.commands.iter().rev().find_map(|c| match c {
            Command::MoveCall { target, arguments } => Some((target.as_str(), arguments.as_slice())),
            _ => None,
        })
    }
}

/// Objects every pool call refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolObjects {
    pub package_id: String,
    pub config_id: String,
    pub clock_id: String,
    pub gas_budget: u64,
}

impl PoolObjects {
    pub fn target(&self, function: &str) -> String {
        format!("{}::{}::{}", self.package_id, POOL_MODULE, function)
    }
}

/// `deposit(config, commitment, coins, amount, clock)` funded by splitting
/// `amount` off the first coin after merging the rest into it.
pub fn build_deposit_transaction(
    objects: &PoolObjects,
    commitment: &[u8; 32],
    amount: u64,
    coin_ids: &[String],
) -> Result<PoolTransaction> {
    let (primary, rest) = coin_ids
        .split_first()
        .ok_or_else(|| SdkError::InvalidInput("No coins provided for deposit".into()))?;
    if amount == 0 {
        return Err(SdkError::InvalidInput("Deposit amount must be non-zero".into()));
    }

    let mut tx = PoolTransaction::new(objects.gas_budget);
    let primary = object(primary);

    if !rest.is_empty() {
        tx.push(Command::MergeCoins {
            destination: primary.clone(),
            sources: rest.iter().map(|id| object(id)).collect(),
        });
    }

    let split = tx.push(Command::SplitCoins {
        coin: primary,
        amounts: vec![pure(PureValue::U64 { value: amount })],
    });
    let Argument::Result { index } = split else {
        return Err(SdkError::InvalidInput("unexpected split handle".into()));
    };
    let coins = tx.push(Command::MakeMoveVec {
        elements: vec![Argument::NestedResult { index, result: 0 }],
    });

    tx.push(Command::MoveCall {
        target: objects.target("deposit"),
        arguments: vec![
            object(&objects.config_id),
            pure(PureValue::Bytes {
                value: commitment.to_vec(),
            }),
            coins,
            pure(PureValue::U64 { value: amount }),
            object(&objects.clock_id),
        ],
    });
    Ok(tx)
}

/// `withdraw(config, proof, root, nullifier_hash, amount, clock)`.
pub fn build_withdraw_transaction(
    objects: &PoolObjects,
    proof: &[u8],
    root_decimal: &str,
    nullifier_hash: &[u8; 32],
    amount: u64,
) -> Result<PoolTransaction> {
    if proof.is_empty() {
        return Err(SdkError::InvalidInput("Withdrawal proof is empty".into()));
    }
    if root_decimal.is_empty() || !root_decimal.chars().all(|c| c.is_ascii_digit()) {
        return Err(SdkError::InvalidInput(format!(
            "Root must be a decimal u256, got '{}'",
            root_decimal
        )));
    }

    let mut tx = PoolTransaction::new(objects.gas_budget);
    tx.push(Command::MoveCall {
        target: objects.target("withdraw"),
        arguments: vec![
            object(&objects.config_id),
            pure(PureValue::Bytes {
                value: proof.to_vec(),
            }),
            pure(PureValue::U256 {
                value: root_decimal.to_string(),
            }),
            pure(PureValue::Bytes {
                value: nullifier_hash.to_vec(),
            }),
            pure(PureValue::U64 { value: amount }),
            object(&objects.clock_id),
        ],
    });
    Ok(tx)
}

fn object(id: &str) -> Argument {
    Argument::Object { id: id.to_string() }
}

fn pure(value: PureValue) -> Argument {
    Argument::Pure { value }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitResult {
    pub digest: String,
    pub events: Vec<ChainEvent>,
}

/// Wallet capability: signs, executes and reports the emitted events.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign_and_submit(&self, transaction: &PoolTransaction) -> Result<SubmitResult>;
}
