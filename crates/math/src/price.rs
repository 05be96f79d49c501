/// Square-root price encoding
///
/// Pools are initialized with `sqrtPriceX96 = floor(sqrt(price) * 2^96)` where
/// `price` is the ratio of token1 to token0 in smallest units. The pool
/// compares this value exactly on-chain, so it is computed with integer
/// arithmetic only.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use thiserror::Error;

use crate::units::pow10;

/// Fixed-point resolution of the ratio before the square root is taken.
pub const RATIO_SHIFT: usize = 192;

/// Fixed-point resolution of the encoded square-root price.
pub const SQRT_PRICE_SHIFT: usize = 96;

/// Width of the pool's `sqrtPriceX96` slot.
pub const SQRT_PRICE_BITS: u64 = 160;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("Division by zero: reference amount for token0 is zero")]
    DivisionByZero,

    #[error("sqrtPriceX96 {0} does not fit in 160 bits")]
    OutOfRange(BigUint),

    #[error("Invalid amount '{amount}': {reason}")]
    InvalidAmount { amount: String, reason: String },
}

/// `2^96`, the encoded price of a 1:1 ratio.
pub fn q96() -> BigUint {
    BigUint::one() << SQRT_PRICE_SHIFT
}

/// Encode the price "`amount1` of token1 per `amount0` of token0" as
/// `sqrtPriceX96`, scaling each side by its decimals first.
///
/// `encode_sqrt_price(1, d, 1, d)` is exactly `2^96` for any `d`.
pub fn encode_sqrt_price(
    amount1: &BigUint,
    decimals1: u32,
    amount0: &BigUint,
    decimals0: u32,
) -> Result<BigUint, PriceError> {
    let n1 = amount1 * pow10(decimals1);
    let n0 = amount0 * pow10(decimals0);
    encode_sqrt_price_units(&n1, &n0)
}

/// Same as [`encode_sqrt_price`] for amounts already in smallest units.
pub fn encode_sqrt_price_units(n1: &BigUint, n0: &BigUint) -> Result<BigUint, PriceError> {
    if n0.is_zero() {
        return Err(PriceError::DivisionByZero);
    }

    let ratio_x192 = (n1 << RATIO_SHIFT) / n0;
    Ok(integer_sqrt(&ratio_x192))
}

/// Reject values wider than the pool's 160-bit price slot.
pub fn ensure_fits_sqrt_price(sqrt_price: BigUint) -> Result<BigUint, PriceError> {
    if sqrt_price.bits() > SQRT_PRICE_BITS {
        return Err(PriceError::OutOfRange(sqrt_price));
    }
    Ok(sqrt_price)
}

/// Floor of the square root of `y` by Newton's method.
///
/// Returns `z` with `z^2 <= y < (z+1)^2`.
pub fn integer_sqrt(y: &BigUint) -> BigUint {
    if y.is_zero() {
        return BigUint::zero();
    }

    let two = BigUint::from(2u8);
    let mut z = y.clone();
    let mut x = (y + 1u8) / &two;
    while x < z {
        z = x.clone();
        x = (y / &x + &x) / &two;
    }
    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_equal_amounts_and_decimals_encode_to_q96() {
        for decimals in [0u32, 6, 8, 18] {
            let encoded = encode_sqrt_price(&big(1), decimals, &big(1), decimals).unwrap();
            assert_eq!(encoded, q96(), "decimals {}", decimals);
        }
        assert_eq!(q96().to_string(), "79228162514264337593543950336");
    }

    #[test]
    fn test_decimal_disparity() {
        // One 18-decimal token1 per one 6-decimal token0: price 1e12 in raw units
        let encoded = encode_sqrt_price(&big(1), 18, &big(1), 6).unwrap();
        assert_eq!(encoded.to_string(), "79228162514264337593543950336000000");

        // The inverse orientation floors to 2^96 / 1e6
        let encoded = encode_sqrt_price(&big(1), 6, &big(1), 18).unwrap();
        assert_eq!(encoded.to_string(), "79228162514264337593543");
    }

    #[test]
    fn test_non_square_ratio_floors() {
        // sqrt(1.21) * 2^96 = 87150978765690771352898345369.6
        let encoded = encode_sqrt_price(&big(121), 0, &big(100), 0).unwrap();
        assert_eq!(encoded.to_string(), "87150978765690771352898345369");
    }

    #[test]
    fn test_zero_reference_amount_fails() {
        assert_eq!(
            encode_sqrt_price(&big(1), 6, &big(0), 18),
            Err(PriceError::DivisionByZero)
        );
    }

    #[test]
    fn test_zero_numerator_is_zero_price() {
        let encoded = encode_sqrt_price(&big(0), 6, &big(1), 6).unwrap();
        assert!(encoded.is_zero());
    }

    #[test]
    fn test_out_of_range_rejected() {
        // 1e40 token1 (18 decimals) per raw unit of token0 is far above uint160
        let huge = pow10(40);
        let result = encode_sqrt_price(&huge, 18, &big(1), 0).and_then(ensure_fits_sqrt_price);
        assert!(matches!(result, Err(PriceError::OutOfRange(_))));

        let ok = encode_sqrt_price(&big(1), 18, &big(1), 6).and_then(ensure_fits_sqrt_price);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_integer_sqrt_small_values() {
        let expected = [0u64, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3];
        for (y, z) in expected.iter().enumerate() {
            assert_eq!(integer_sqrt(&big(y as u64)), big(*z), "sqrt({})", y);
        }
    }

    proptest! {
        #[test]
        fn prop_integer_sqrt_is_floor(hi in any::<u128>(), lo in any::<u128>()) {
            let y = (BigUint::from(hi) << 128) + BigUint::from(lo);
            let z = integer_sqrt(&y);
            prop_assert!(&z * &z <= y);
            let next = &z + 1u8;
            prop_assert!(&next * &next > y);
        }

        #[test]
        fn prop_encoded_price_is_floor_sqrt_of_ratio(
            amount1 in 1u64..1_000_000_000,
            amount0 in 1u64..1_000_000_000,
            decimals1 in 0u32..=18,
            decimals0 in 0u32..=18,
        ) {
            let encoded = encode_sqrt_price(&big(amount1), decimals1, &big(amount0), decimals0).unwrap();
            let n1 = big(amount1) * pow10(decimals1);
            let n0 = big(amount0) * pow10(decimals0);
            let ratio = (n1 << RATIO_SHIFT) / n0;
            prop_assert!(&encoded * &encoded <= ratio);
            let next = &encoded + 1u8;
            prop_assert!(&next * &next > ratio);
        }

        #[test]
        fn prop_equal_prices_encode_to_q96(amount in 1u64..u64::MAX, decimals in 0u32..=24) {
            let encoded = encode_sqrt_price(&big(amount), decimals, &big(amount), decimals).unwrap();
            prop_assert_eq!(encoded, q96());
        }
    }
}
