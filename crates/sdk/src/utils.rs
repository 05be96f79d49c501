//! Conversions between the big-integer math and on-chain word types

use chrono::Utc;
use ethers::types::U256;
use num_bigint::BigUint;

use crate::{ProvisionError, SdkResult};

/// Largest value of an unsigned 256-bit word.
pub const MAX_UINT256: U256 = U256::MAX;

pub fn to_biguint(value: U256) -> BigUint {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

/// Narrow a big integer into a 256-bit word, `None` when it does not fit.
pub fn narrow_u256(value: &BigUint) -> Option<U256> {
    let bytes = value.to_bytes_be();
    (bytes.len() <= 32).then(|| U256::from_big_endian(&bytes))
}

pub fn to_u256(value: &BigUint) -> SdkResult<U256> {
    narrow_u256(value)
        .ok_or_else(|| ProvisionError::config(format!("{} does not fit in 256 bits", value)))
}

/// Unix timestamp `seconds` from now.
pub fn deadline_in(seconds: u64) -> U256 {
    let now = Utc::now().timestamp().max(0) as u64;
    U256::from(now + seconds)
}

/// Format smallest units as a decimal amount, e.g. `1500000` at 6 decimals is `1.5`.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}
