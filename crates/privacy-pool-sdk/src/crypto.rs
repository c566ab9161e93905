use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use rand::RngCore;

use crate::error::{Result, SdkError};

/// Random bytes drawn per nullifier/secret. 248 bits always fit below the BN254 modulus.
pub const SECRET_BYTES: usize = 31;

/// BN254 scalar field modulus. Path elements sent to the prover are reduced by it.
pub const BN254_SCALAR_MODULUS: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

static MODULUS: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(BN254_SCALAR_MODULUS.as_bytes(), 10).unwrap_or_default()
});

pub fn field_modulus() -> &'static BigUint {
    &MODULUS
}

/// Generate a random 32-byte big-endian field element from 31 CSPRNG bytes (non-zero).
pub fn random_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    loop {
        rand::thread_rng().fill_bytes(&mut secret[32 - SECRET_BYTES..]);
        if secret.iter().any(|&b| b != 0) {
            return secret;
        }
    }
}

pub fn validate_non_zero(value: &[u8; 32]) -> Result<()> {
    if value.iter().all(|&b| b == 0) {
        return Err(SdkError::Crypto("Value must be non-zero".into()));
    }
    Ok(())
}

pub fn validate_fee(fee: u64, amount: u64) -> Result<()> {
    if fee >= amount {
        return Err(SdkError::InvalidInput(format!(
            "Fee ({}) must be less than amount ({})",
            fee, amount
        )));
    }
    Ok(())
}

/// Strict conversion: values at or above the modulus are rejected rather than wrapped.
pub fn field_from_be_bytes(bytes: &[u8; 32]) -> Result<Fr> {
    let value = Fr::from_be_bytes_mod_order(bytes);
    if field_to_be_bytes(&value) != *bytes {
        return Err(SdkError::Crypto(format!(
            "0x{} is not a canonical field element",
            hex::encode(bytes)
        )));
    }
    Ok(value)
}

pub fn field_to_be_bytes(value: &Fr) -> [u8; 32] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

pub fn field_to_hex(value: &Fr) -> String {
    format!("0x{}", hex::encode(field_to_be_bytes(value)))
}

pub fn field_to_decimal(value: &Fr) -> String {
    BigUint::from_bytes_be(&field_to_be_bytes(value)).to_string()
}

/// Parse a `0x` hex or decimal integer string without reduction.
pub fn parse_biguint(value: &str) -> Result<BigUint> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(digits) if !digits.is_empty() => BigUint::parse_bytes(digits.as_bytes(), 16),
        Some(_) => None,
        None if !trimmed.is_empty() => BigUint::parse_bytes(trimmed.as_bytes(), 10),
        None => None,
    };
    parsed.ok_or_else(|| SdkError::Crypto(format!("'{}' is not an integer", value)))
}

/// Parse a hex or decimal string into a field element, rejecting out-of-range values.
pub fn parse_field_element(value: &str) -> Result<Fr> {
    let number = parse_biguint(value)?;
    if &number >= field_modulus() {
        return Err(SdkError::Crypto(format!(
            "'{}' exceeds the field modulus",
            value
        )));
    }
    Ok(Fr::from_be_bytes_mod_order(&number.to_bytes_be()))
}

pub fn reduce_to_field(value: &BigUint) -> BigUint {
    value % field_modulus()
}

/// Address (hex, with or without `0x`) reduced into the field, as `0x` + 64 hex digits.
pub fn address_to_field(address: &str) -> Result<String> {
    let digits = address.trim().trim_start_matches("0x");
    if digits.is_empty() || digits.len() > 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SdkError::InvalidInput(format!("Invalid address: {}", address)));
    }
    let value = BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| SdkError::InvalidInput(format!("Invalid address: {}", address)))?;
    Ok(biguint_to_field_hex(&reduce_to_field(&value)))
}

pub fn number_to_field(value: u64) -> String {
    biguint_to_field_hex(&reduce_to_field(&BigUint::from(value)))
}

fn biguint_to_field_hex(value: &BigUint) -> String {
    format!("0x{:0>64}", value.to_str_radix(16))
}

pub fn poseidon_hash(inputs: &[Fr]) -> Result<Fr> {
    let mut poseidon = Poseidon::<Fr>::new_circom(inputs.len())
        .map_err(|e| SdkError::Crypto(format!("Poseidon init failed: {}", e)))?;
    poseidon
        .hash(inputs)
        .map_err(|e| SdkError::Crypto(format!("Poseidon hash failed: {}", e)))
}

/// commitment = Poseidon(nullifier, secret)
pub fn generate_commitment(nullifier: &[u8; 32], secret: &[u8; 32]) -> Result<[u8; 32]> {
    validate_non_zero(nullifier)?;
    validate_non_zero(secret)?;
    let hash = poseidon_hash(&[field_from_be_bytes(nullifier)?, field_from_be_bytes(secret)?])?;
    Ok(field_to_be_bytes(&hash))
}

/// nullifierHash = Poseidon(nullifier)
pub fn generate_nullifier_hash(nullifier: &[u8; 32]) -> Result<[u8; 32]> {
    validate_non_zero(nullifier)?;
    let hash = poseidon_hash(&[field_from_be_bytes(nullifier)?])?;
    Ok(field_to_be_bytes(&hash))
}

/// Decode a `0x`-prefixed (or bare) 32-byte hex value.
pub fn decode_hex32(value: &str) -> Result<[u8; 32]> {
    let digits = value.trim().trim_start_matches("0x");
    let bytes = hex::decode(digits)
        .map_err(|e| SdkError::Serialization(format!("Invalid hex '{}': {}", value, e)))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| SdkError::Serialization(format!("Expected 32 bytes, got {}", b.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulus_constant_matches_curve() {
        let from_curve = BigUint::from_bytes_be(&Fr::MODULUS.to_bytes_be());
        assert_eq!(&from_curve, field_modulus());
    }

    #[test]
    fn test_commitment_generation() {
        let nullifier = random_secret();
        let secret = random_secret();

        let commitment1 = generate_commitment(&nullifier, &secret).unwrap();
        let commitment2 = generate_commitment(&nullifier, &secret).unwrap();
        assert_eq!(commitment1, commitment2);

        let other_secret = random_secret();
        let commitment3 = generate_commitment(&nullifier, &other_secret).unwrap();
        assert_ne!(commitment1, commitment3);
    }

    #[test]
    fn test_nullifier_hash_differs_from_commitment() {
        let nullifier = random_secret();
        let secret = random_secret();

        let hash = generate_nullifier_hash(&nullifier).unwrap();
        assert_eq!(hash, generate_nullifier_hash(&nullifier).unwrap());
        assert_ne!(hash, generate_commitment(&nullifier, &secret).unwrap());
    }

    #[test]
    fn test_random_secret_is_31_bytes() {
        for _ in 0..32 {
            let secret = random_secret();
            assert_eq!(secret[0], 0);
            assert!(field_from_be_bytes(&secret).is_ok());
        }
    }

    #[test]
    fn test_zero_validation() {
        let zero = [0u8; 32];
        assert!(validate_non_zero(&zero).is_err());
        assert!(generate_commitment(&zero, &random_secret()).is_err());
    }

    #[test]
    fn test_non_canonical_bytes_rejected() {
        assert!(field_from_be_bytes(&[0xff; 32]).is_err());
    }

    #[test]
    fn test_parse_field_element_formats() {
        let from_dec = parse_field_element("255").unwrap();
        let from_hex = parse_field_element("0xff").unwrap();
        assert_eq!(from_dec, from_hex);
        assert_eq!(field_to_decimal(&from_dec), "255");
        assert!(parse_field_element(BN254_SCALAR_MODULUS).is_err());
        assert!(parse_field_element("0x").is_err());
        assert!(parse_field_element("twelve").is_err());
    }

    #[test]
    fn test_address_to_field() {
        assert_eq!(address_to_field("0x0").unwrap(), format!("0x{}", "0".repeat(64)));
        let max = format!("0x{}", "f".repeat(64));
        let reduced = address_to_field(&max).unwrap();
        assert_eq!(reduced.len(), 66);
        let value = parse_biguint(&reduced).unwrap();
        assert!(&value < field_modulus());
        assert!(address_to_field("0xzz").is_err());
    }

    #[test]
    fn test_number_to_field() {
        assert_eq!(number_to_field(16), format!("0x{}10", "0".repeat(62)));
    }

    #[test]
    fn test_fee_validation() {
        assert!(validate_fee(0, 1_000).is_ok());
        assert!(validate_fee(1_000, 1_000).is_err());
    }
}
