//! Mathematical utilities for the DEX testbed
//!
//! Exact integer price encoding for pool initialization and the tick
//! bounds used for full-range liquidity. Everything here is pure and
//! uses arbitrary-precision integers; no floating point is involved.

pub mod price;
pub mod tick;
pub mod units;

pub use price::*;
pub use tick::*;
pub use units::*;
