//! Deposit notes: the secret pair behind a pool commitment plus the data
//! needed to find and spend it later.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use ark_bn254::Fr;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::amount::CoinUnits;
use crate::crypto::{
    field_from_be_bytes, generate_commitment, generate_nullifier_hash, random_secret,
    validate_non_zero,
};
use crate::error::{Result, SdkError};
use crate::events::hex_bytes32;

pub const NOTE_PREFIX: &str = "privacy";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositNote {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub network: String,
    pub net_id: u64,
    /// Human readable, e.g. `"1 SUI"`.
    pub amount: String,
    /// Smallest coin unit.
    pub denomination: u64,
    #[serde(with = "hex_bytes32")]
    pub nullifier: [u8; 32],
    #[serde(with = "hex_bytes32")]
    pub secret: [u8; 32],
    #[serde(with = "hex_bytes32")]
    pub commitment: [u8; 32],
    #[serde(with = "hex_bytes32")]
    pub nullifier_hash: [u8; 32],
    /// Position in the pool tree, known once the deposit event has been observed.
    pub leaf_index: Option<u64>,
    pub tx_digest: Option<String>,
    pub note_string: String,
}

impl DepositNote {
    /// Draw a fresh nullifier/secret pair for a deposit of `denomination`.
    pub fn generate(denomination: u64, network: &str, net_id: u64, units: &CoinUnits) -> Result<Self> {
        Self::from_secrets(random_secret(), random_secret(), denomination, network, net_id, units)
    }

    pub fn from_secrets(
        nullifier: [u8; 32],
        secret: [u8; 32],
        denomination: u64,
        network: &str,
        net_id: u64,
        units: &CoinUnits,
    ) -> Result<Self> {
        if denomination == 0 {
            return Err(SdkError::InvalidInput("Denomination must be non-zero".into()));
        }
        validate_network(network)?;

        let commitment = generate_commitment(&nullifier, &secret)?;
        let nullifier_hash = generate_nullifier_hash(&nullifier)?;
        let created_at = now_millis();

        let mut suffix = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut suffix);

        let mut note = Self {
            id: format!("{}-{}", created_at, hex::encode(suffix)),
            created_at,
            network: network.to_string(),
            net_id,
            amount: units.format(denomination),
            denomination,
            nullifier,
            secret,
            commitment,
            nullifier_hash,
            leaf_index: None,
            tx_digest: None,
            note_string: String::new(),
        };
        note.note_string = note.to_note_string(units);
        Ok(note)
    }

    /// `privacy-{network}-{amount}-{net_id}-0x{commitment}{nullifier}{secret}`
    pub fn to_note_string(&self, units: &CoinUnits) -> String {
        format!(
            "{}-{}-{}-{}-0x{}{}{}",
            NOTE_PREFIX,
            self.network,
            crate::amount::format_units(self.denomination as u128, units.decimals),
            self.net_id,
            hex::encode(self.commitment),
            hex::encode(self.nullifier),
            hex::encode(self.secret),
        )
    }

    /// Restore a note from its backup string. The commitment embedded in the
    /// string must match the one recomputed from the secrets.
    pub fn from_note_string(value: &str, units: &CoinUnits) -> Result<Self> {
        let invalid = |reason: &str| SdkError::InvalidNote(reason.to_string());

        let rest = value
            .trim()
            .strip_prefix(NOTE_PREFIX)
            .and_then(|r| r.strip_prefix('-'))
            .ok_or_else(|| invalid("missing 'privacy-' prefix"))?;
        let parts: Vec<&str> = rest.split('-').collect();
        let [network, amount, net_id, payload] = parts.as_slice() else {
            return Err(invalid("expected network, amount, net id and payload"));
        };

        let denomination = units.parse(amount)?;
        let net_id: u64 = net_id.parse().map_err(|_| invalid("net id is not a number"))?;
        let payload = payload
            .strip_prefix("0x")
            .ok_or_else(|| invalid("payload must start with 0x"))?;
        let bytes = hex::decode(payload).map_err(|e| invalid(&format!("payload: {}", e)))?;
        if bytes.len() != 96 {
            return Err(invalid("payload must hold 96 bytes"));
        }

        let mut commitment = [0u8; 32];
        let mut nullifier = [0u8; 32];
        let mut secret = [0u8; 32];
        commitment.copy_from_slice(&bytes[..32]);
        nullifier.copy_from_slice(&bytes[32..64]);
        secret.copy_from_slice(&bytes[64..]);

        let note = Self::from_secrets(nullifier, secret, denomination, network, net_id, units)?;
        if note.commitment != commitment {
            return Err(invalid("commitment does not match nullifier and secret"));
        }
        Ok(note)
    }

    pub fn commitment_field(&self) -> Result<Fr> {
        field_from_be_bytes(&self.commitment)
    }

    pub fn nullifier_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.nullifier_hash))
    }

    /// The leaf index never changes once observed.
    pub fn set_leaf_index(&mut self, index: u64) -> Result<()> {
        match self.leaf_index {
            Some(existing) if existing != index => Err(SdkError::InvalidNote(format!(
                "leaf index already set to {}, refusing {}",
                existing, index
            ))),
            _ => {
                self.leaf_index = Some(index);
                Ok(())
            }
        }
    }

    pub fn set_tx_digest(&mut self, digest: impl Into<String>) {
        self.tx_digest = Some(digest.into());
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| SdkError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let note: Self =
            serde_json::from_slice(bytes).map_err(|e| SdkError::Serialization(e.to_string()))?;
        note.validate()?;
        Ok(note)
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_zero(&self.nullifier)?;
        validate_non_zero(&self.secret)?;
        if self.denomination == 0 {
            return Err(SdkError::InvalidNote("Denomination must be non-zero".into()));
        }
        if generate_commitment(&self.nullifier, &self.secret)? != self.commitment {
            return Err(SdkError::InvalidNote("commitment does not match secrets".into()));
        }
        if generate_nullifier_hash(&self.nullifier)? != self.nullifier_hash {
            return Err(SdkError::InvalidNote("nullifier hash does not match".into()));
        }
        Ok(())
    }
}

// Secrets stay out of logs.
impl fmt::Debug for DepositNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepositNote")
            .field("id", &self.id)
            .field("network", &self.network)
            .field("amount", &self.amount)
            .field("commitment", &format!("0x{}", hex::encode(self.commitment)))
            .field("nullifier_hash", &self.nullifier_hash_hex())
            .field("leaf_index", &self.leaf_index)
            .field("tx_digest", &self.tx_digest)
            .finish_non_exhaustive()
    }
}

fn validate_network(network: &str) -> Result<()> {
    if network.is_empty()
        || !network
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(SdkError::InvalidInput(format!(
            "Network label '{}' must be non-empty and alphanumeric",
            network
        )));
    }
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
