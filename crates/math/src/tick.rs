/// Fee tiers and full-range tick bounds

use std::fmt;

use thiserror::Error;

/// Lowest tick representable by the pool's price range.
pub const MIN_TICK: i32 = -887_272;

/// Highest tick representable by the pool's price range.
pub const MAX_TICK: i32 = 887_272;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickError {
    #[error("Unsupported fee tier {0} (expected one of 100, 500, 3000, 10000)")]
    UnsupportedFeeTier(u32),
}

/// Pool fee in hundredths of a basis point, with its tick spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeeTier {
    Lowest,
    Low,
    Medium,
    High,
}

impl FeeTier {
    pub const ALL: [FeeTier; 4] = [FeeTier::Lowest, FeeTier::Low, FeeTier::Medium, FeeTier::High];

    pub fn fee(self) -> u32 {
        match self {
            FeeTier::Lowest => 100,
            FeeTier::Low => 500,
            FeeTier::Medium => 3000,
            FeeTier::High => 10_000,
        }
    }

    pub fn tick_spacing(self) -> i32 {
        match self {
            FeeTier::Lowest => 1,
            FeeTier::Low => 10,
            FeeTier::Medium => 60,
            FeeTier::High => 200,
        }
    }

    /// Widest `(tick_lower, tick_upper)` aligned to this tier's spacing.
    pub fn full_range(self) -> (i32, i32) {
        full_range_ticks(self.tick_spacing())
    }
}

impl TryFrom<u32> for FeeTier {
    type Error = TickError;

    fn try_from(fee: u32) -> Result<Self, Self::Error> {
        FeeTier::ALL
            .into_iter()
            .find(|tier| tier.fee() == fee)
            .ok_or(TickError::UnsupportedFeeTier(fee))
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fee())
    }
}

/// Full-range bounds for an arbitrary tick spacing.
pub fn full_range_ticks(tick_spacing: i32) -> (i32, i32) {
    let max = (MAX_TICK / tick_spacing) * tick_spacing;
    (-max, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range_for_medium_tier() {
        assert_eq!(FeeTier::Medium.full_range(), (-887_220, 887_220));
    }

    #[test]
    fn test_full_range_is_aligned_and_in_bounds() {
        for tier in FeeTier::ALL {
            let (lower, upper) = tier.full_range();
            let spacing = tier.tick_spacing();
            assert_eq!(lower % spacing, 0);
            assert_eq!(upper % spacing, 0);
            assert!(lower >= MIN_TICK && upper <= MAX_TICK);
            assert!(upper + spacing > MAX_TICK);
        }
    }

    #[test]
    fn test_fee_tier_conversion() {
        assert_eq!(FeeTier::try_from(3000), Ok(FeeTier::Medium));
        assert_eq!(FeeTier::try_from(500), Ok(FeeTier::Low));
        assert_eq!(FeeTier::try_from(250), Err(TickError::UnsupportedFeeTier(250)));
        assert_eq!(FeeTier::High.to_string(), "10000");
    }
}
