//! Amount type and unit conversion
//!
//! Amounts are unsigned base units scaled by a fixed decimal exponent.

use thiserror::Error;

/// Token amounts in base units
pub type Amount = u128;

/// Fixed decimal exponent of the unit of value
pub const DECIMALS: u8 = 18;

/// Base units per whole token (10^18)
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Allowance value that is never decremented by delegated transfers
pub const UNLIMITED_ALLOWANCE: Amount = Amount::MAX;

/// Errors parsing a human-readable amount
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount: {0}")]
    Invalid(String),
    #[error("Too many decimal places: at most 18 allowed")]
    TooPrecise,
    #[error("Amount too large")]
    TooLarge,
}

/// Parse a decimal string of whole tokens ("1.5") into base units.
///
/// `"max"` parses to [`UNLIMITED_ALLOWANCE`].
pub fn parse_units(input: &str) -> Result<Amount, AmountError> {
    let input = input.trim().replace('_', "");
    if input.eq_ignore_ascii_case("max") {
        return Ok(UNLIMITED_ALLOWANCE);
    }

    let (whole, fraction) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input.as_str(), ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid(input.clone()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(AmountError::Invalid(input.clone()));
    }
    if fraction.len() > DECIMALS as usize {
        return Err(AmountError::TooPrecise);
    }

    let whole: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::TooLarge)?
    };

    let fraction_units: Amount = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = DECIMALS as usize);
        padded.parse().map_err(|_| AmountError::Invalid(input.clone()))?
    };

    whole
        .checked_mul(UNIT)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or(AmountError::TooLarge)
}

/// Format base units as a decimal string of whole tokens.
///
/// Trailing fractional zeros are dropped; the unlimited sentinel prints as
/// `"unlimited"`.
pub fn format_units(amount: Amount) -> String {
    if amount == UNLIMITED_ALLOWANCE {
        return "unlimited".to_string();
    }

    let whole = amount / UNIT;
    let fraction = amount % UNIT;
    if fraction == 0 {
        return whole.to_string();
    }

    let fraction = format!("{:0>width$}", fraction, width = DECIMALS as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1").unwrap(), UNIT);
        assert_eq!(parse_units("1.5").unwrap(), UNIT + UNIT / 2);
        assert_eq!(parse_units(".25").unwrap(), UNIT / 4);
        assert_eq!(parse_units("0.000000000000000001").unwrap(), 1);
        assert_eq!(parse_units("5_000_000_000").unwrap(), 5_000_000_000 * UNIT);
        assert_eq!(parse_units("max").unwrap(), UNLIMITED_ALLOWANCE);
    }

    #[test]
    fn test_parse_units_errors() {
        assert!(matches!(parse_units(""), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_units("-1"), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_units("1.2.3"), Err(AmountError::Invalid(_))));
        assert_eq!(
            parse_units("0.0000000000000000001"),
            Err(AmountError::TooPrecise)
        );
        assert_eq!(
            parse_units("999999999999999999999999"),
            Err(AmountError::TooLarge)
        );
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(0), "0");
        assert_eq!(format_units(UNIT), "1");
        assert_eq!(format_units(UNIT + UNIT / 2), "1.5");
        assert_eq!(format_units(1), "0.000000000000000001");
        assert_eq!(format_units(UNLIMITED_ALLOWANCE), "unlimited");
    }
}
