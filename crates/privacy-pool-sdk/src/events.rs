//! Deposit and withdrawal events emitted by the pool module.
//! Field values are accepted as JSON numbers or strings, and byte fields as a
//! byte array, `0x` hex or a decimal u256 string.

use ark_bn254::Fr;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{field_from_be_bytes, parse_biguint};
use crate::error::{Result, SdkError};

pub const DEPOSIT_EVENT: &str = "DepositEvent";
pub const WITHDRAWAL_EVENT: &str = "WithdrawalEvent";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    #[serde(with = "hex_bytes32")]
    pub commitment: [u8; 32],
    pub amount: u64,
    pub leaf_index: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    #[serde(with = "hex_bytes32")]
    pub nullifier_hash: [u8; 32],
    pub recipient: String,
    pub amount: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),
    Other { type_name: String },
}

/// Which pool event stream a query targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Deposit,
    Withdrawal,
}

impl EventKind {
    pub fn struct_name(&self) -> &'static str {
        match self {
            EventKind::Deposit => DEPOSIT_EVENT,
            EventKind::Withdrawal => WITHDRAWAL_EVENT,
        }
    }

    /// Fully qualified Move event type, e.g. `0x..::privacy_pool::DepositEvent`.
    pub fn move_type(&self, package_id: &str) -> String {
        format!("{}::privacy_pool::{}", package_id, self.struct_name())
    }
}

impl DepositEvent {
    pub fn from_json(parsed: &Value) -> Result<Self> {
        let commitment = json_bytes32(field(parsed, "commitment")?)
            .map_err(|e| SdkError::CommitmentParse(e.to_string()))?;
        Ok(Self {
            commitment,
            amount: json_u64(field(parsed, "amount")?, "amount")?,
            leaf_index: json_u64(field(parsed, "leaf_index")?, "leaf_index")?,
            timestamp: json_u64(field(parsed, "timestamp")?, "timestamp")?,
        })
    }

    /// Commitment as a tree leaf. Values outside the field cannot be leaves.
    pub fn leaf(&self) -> Result<Fr> {
        field_from_be_bytes(&self.commitment).map_err(|e| {
            SdkError::CommitmentParse(format!("leaf {}: {}", self.leaf_index, e))
        })
    }
}

impl WithdrawalEvent {
    pub fn from_json(parsed: &Value) -> Result<Self> {
        let recipient = match field(parsed, "recipient")? {
            Value::String(s) => s.clone(),
            other => {
                return Err(SdkError::Serialization(format!(
                    "recipient must be a string, got {}",
                    other
                )))
            }
        };
        Ok(Self {
            nullifier_hash: json_bytes32(field(parsed, "nullifier_hash")?)?,
            recipient,
            amount: json_u64(field(parsed, "amount")?, "amount")?,
            timestamp: json_u64(field(parsed, "timestamp")?, "timestamp")?,
        })
    }
}

impl ChainEvent {
    /// Classify a raw event by the struct name at the end of its Move type.
    pub fn from_raw(type_name: &str, parsed: &Value) -> Result<Self> {
        match struct_name(type_name) {
            DEPOSIT_EVENT => Ok(ChainEvent::Deposit(DepositEvent::from_json(parsed)?)),
            WITHDRAWAL_EVENT => Ok(ChainEvent::Withdrawal(WithdrawalEvent::from_json(parsed)?)),
            _ => Ok(ChainEvent::Other {
                type_name: type_name.to_string(),
            }),
        }
    }
}

pub fn deposit_events(events: &[ChainEvent]) -> Vec<DepositEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ChainEvent::Deposit(d) => Some(d.clone()),
            _ => None,
        })
        .collect()
}

pub fn withdrawal_events(events: &[ChainEvent]) -> Vec<WithdrawalEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ChainEvent::Withdrawal(w) => Some(w.clone()),
            _ => None,
        })
        .collect()
}

fn struct_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

fn field<'a>(parsed: &'a Value, name: &str) -> Result<&'a Value> {
    parsed
        .get(name)
        .ok_or_else(|| SdkError::Serialization(format!("event is missing field '{}'", name)))
}

pub(crate) fn json_u64(value: &Value, name: &str) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| SdkError::Serialization(format!("'{}' is not a u64: {}", name, value)))
}

/// Byte array, hex string or decimal string, left-padded to 32 bytes big-endian.
pub(crate) fn json_bytes32(value: &Value) -> Result<[u8; 32]> {
    match value {
        Value::Array(items) => {
            if items.len() != 32 {
                return Err(SdkError::Serialization(format!(
                    "expected 32 bytes, got {}",
                    items.len()
                )));
            }
            let mut out = [0u8; 32];
            for (slot, item) in out.iter_mut().zip(items) {
                *slot = item
                    .as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| SdkError::Serialization(format!("invalid byte {}", item)))?;
            }
            Ok(out)
        }
        Value::String(s) => biguint_to_bytes32(&parse_biguint(s)?),
        other => Err(SdkError::Serialization(format!(
            "expected bytes, got {}",
            other
        ))),
    }
}

fn biguint_to_bytes32(value: &BigUint) -> Result<[u8; 32]> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(SdkError::Serialization(format!(
            "value {} does not fit in 32 bytes",
            value
        )));
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

pub(crate) mod hex_bytes32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::crypto::decode_hex32(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deposit_event_from_strings() {
        let parsed = json!({
            "commitment": "0x01",
            "amount": "1000000000",
            "leaf_index": "7",
            "timestamp": 1700000000000u64
        });
        let event = DepositEvent::from_json(&parsed).unwrap();
        assert_eq!(event.commitment[31], 1);
        assert_eq!(event.amount, 1_000_000_000);
        assert_eq!(event.leaf_index, 7);
        assert_eq!(event.leaf().unwrap(), Fr::from(1u64));
    }

    #[test]
    fn test_deposit_event_byte_array_commitment() {
        let mut bytes = vec![0u8; 32];
        bytes[31] = 42;
        let parsed = json!({
            "commitment": bytes,
            "amount": 5,
            "leaf_index": 0,
            "timestamp": 1
        });
        let event = DepositEvent::from_json(&parsed).unwrap();
        assert_eq!(event.leaf().unwrap(), Fr::from(42u64));
    }

    #[test]
    fn test_bad_commitment_is_parse_error() {
        let parsed = json!({
            "commitment": "not-a-number",
            "amount": 5,
            "leaf_index": 0,
            "timestamp": 1
        });
        assert!(matches!(
            DepositEvent::from_json(&parsed),
            Err(SdkError::CommitmentParse(_))
        ));

        let event = DepositEvent {
            commitment: [0xff; 32],
            amount: 1,
            leaf_index: 3,
            timestamp: 0,
        };
        assert!(matches!(event.leaf(), Err(SdkError::CommitmentParse(_))));
    }

    #[test]
    fn test_chain_event_classification() {
        let withdrawal = json!({
            "nullifier_hash": "0xabc",
            "recipient": "0x2",
            "amount": "10",
            "timestamp": "20"
        });
        let event =
            ChainEvent::from_raw("0xpkg::privacy_pool::WithdrawalEvent", &withdrawal).unwrap();
        match event {
            ChainEvent::Withdrawal(w) => {
                assert_eq!(w.recipient, "0x2");
                assert_eq!(&w.nullifier_hash[30..], &[0x0a, 0xbc]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let other = ChainEvent::from_raw("0x2::coin::CoinEvent<0x2::sui::SUI>", &json!({})).unwrap();
        assert!(matches!(other, ChainEvent::Other { .. }));
    }

    #[test]
    fn test_move_type() {
        assert_eq!(
            EventKind::Deposit.move_type("0xabc"),
            "0xabc::privacy_pool::DepositEvent"
        );
    }

    #[test]
    fn test_event_serde_uses_hex() {
        let event = DepositEvent {
            commitment: [1u8; 32],
            amount: 1,
            leaf_index: 0,
            timestamp: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["commitment"], format!("0x{}", "01".repeat(32)));
        let back: DepositEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
