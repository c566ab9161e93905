use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkError};

pub const DEFAULT_DECIMALS: u32 = 9;
pub const DEFAULT_SYMBOL: &str = "SUI";

/// Maximum decimals an amount can carry while still fitting the u128 scaling factor.
pub const MAX_DECIMALS: u32 = 38;

/// Display units of the pooled coin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinUnits {
    pub decimals: u32,
    pub symbol: String,
}

impl Default for CoinUnits {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
            symbol: DEFAULT_SYMBOL.to_string(),
        }
    }
}

impl CoinUnits {
    pub fn new(decimals: u32, symbol: impl Into<String>) -> Self {
        Self {
            decimals: decimals.min(MAX_DECIMALS),
            symbol: symbol.into(),
        }
    }

    /// `1_500_000_000` -> `"1.5 SUI"`
    pub fn format(&self, value: u64) -> String {
        format!("{} {}", format_units(value as u128, self.decimals), self.symbol)
    }

    pub fn parse(&self, value: &str) -> Result<u64> {
        parse_units(value, self.decimals)
    }
}

/// Render a smallest-unit amount in whole units, trimming trailing fractional zeros.
pub fn format_units(value: u128, decimals: u32) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    let scale = 10u128.pow(decimals);
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Inverse of [`format_units`]. Rejects more fractional digits than `decimals`.
pub fn parse_units(value: &str, decimals: u32) -> Result<u64> {
    let invalid = || SdkError::InvalidInput(format!("Invalid amount '{}'", value));
    let decimals = decimals.min(MAX_DECIMALS);

    let (whole, frac) = match value.trim().split_once('.') {
        Some((w, f)) => (w, f),
        None => (value.trim(), ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
        || frac.len() > decimals as usize
    {
        return Err(invalid());
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(10u128.pow(decimals))
        .and_then(|w| w.checked_add(frac))
        .and_then(|total| u64::try_from(total).ok())
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(1_000_000_000, 9), "1");
        assert_eq!(format_units(1_500_000_000, 9), "1.5");
        assert_eq!(format_units(1, 9), "0.000000001");
        assert_eq!(format_units(0, 9), "0");
        assert_eq!(CoinUnits::default().format(2_250_000_000), "2.25 SUI");
    }

    #[test]
    fn test_format_units_clamps_decimals() {
        assert_eq!(format_units(5, 40), format_units(5, MAX_DECIMALS));
        assert_eq!(format_units(5, 40), format!("0.{}5", "0".repeat(37)));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1", 9).unwrap(), 1_000_000_000);
        assert_eq!(parse_units("1.5", 9).unwrap(), 1_500_000_000);
        assert_eq!(parse_units("0.000000001", 9).unwrap(), 1);
        assert_eq!(parse_units(".5", 9).unwrap(), 500_000_000);
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        assert!(parse_units("", 9).is_err());
        assert!(parse_units("1.0000000001", 9).is_err());
        assert!(parse_units("1e9", 9).is_err());
        assert!(parse_units("-1", 9).is_err());
        assert!(parse_units("99999999999999999999", 9).is_err());
    }
}
