//! Test support: an in-memory chain implementing every gateway trait.

mod chain;

pub use chain::{dev_native_balance, SimulatedChain, DEV_CHAIN_ID};
