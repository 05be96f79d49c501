//! Shared types for the DEX testbed
//!
//! The persisted deployment record, canonical pool identity and account
//! identifier validation used by the SDK and the CLI.

pub mod address;
pub mod errors;
pub mod pool_key;
pub mod record;
pub mod serde_helpers;

pub use address::*;
pub use errors::*;
pub use pool_key::*;
pub use record::*;

/// Result type alias using the shared error type
pub type TypesResult<T> = std::result::Result<T, TypesError>;
