/// Decimal unit conversion
///
/// Token amounts are configured in display units ("1.5 USDT") and submitted
/// in smallest units. Conversion is exact; amounts with more fractional
/// digits than the token supports are rejected rather than rounded.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::price::PriceError;

/// `10^exp` as an arbitrary-precision integer.
pub fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u8).pow(exp)
}

/// Scale a whole-unit amount to smallest units: `amount * 10^decimals`.
pub fn scale_units(amount: u64, decimals: u32) -> BigUint {
    BigUint::from(amount) * pow10(decimals)
}

/// Parse a decimal string such as `"1"`, `"0.15"` or `"1000000"` into
/// smallest units.
pub fn parse_units(amount: &str, decimals: u32) -> Result<BigUint, PriceError> {
    let invalid = |reason: &str| PriceError::InvalidAmount {
        amount: amount.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty amount"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("only unsigned decimal digits are allowed"));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(invalid(&format!("more than {} fractional digits", decimals)));
    }

    let whole_value = if whole.is_empty() {
        BigUint::zero()
    } else {
        whole
            .parse::<BigUint>()
            .map_err(|e| invalid(&e.to_string()))?
    };

    let fraction_value = if fraction.is_empty() {
        BigUint::zero()
    } else {
        let padding = decimals - fraction.len() as u32;
        fraction
            .parse::<BigUint>()
            .map_err(|e| invalid(&e.to_string()))?
            * pow10(padding)
    };

    Ok(whole_value * pow10(decimals) + fraction_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional_amounts() {
        assert_eq!(parse_units("1", 6).unwrap(), BigUint::from(1_000_000u64));
        assert_eq!(parse_units("0.15", 6).unwrap(), BigUint::from(150_000u64));
        assert_eq!(parse_units(".5", 1).unwrap(), BigUint::from(5u64));
        assert_eq!(parse_units("2.50", 1).unwrap(), BigUint::from(25u64));
        assert_eq!(parse_units("1000000", 18).unwrap(), pow10(24));
    }

    #[test]
    fn test_parse_rejects_malformed_amounts() {
        assert!(parse_units("", 6).is_err());
        assert!(parse_units(".", 6).is_err());
        assert!(parse_units("-1", 6).is_err());
        assert!(parse_units("1e6", 6).is_err());
        assert!(parse_units("0.1234567", 6).is_err());
    }

    #[test]
    fn test_scale_units() {
        assert_eq!(scale_units(2000, 6), BigUint::from(2_000_000_000u64));
        assert_eq!(scale_units(0, 18), BigUint::zero());
    }
}
