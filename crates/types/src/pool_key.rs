/// Canonical pair ordering and pool keys
///
/// The AMM orders a pair by address: the token with the numerically smaller
/// address is `token0`. Comparing the raw 20 bytes gives the same order as a
/// case-insensitive comparison of the hex form.

use std::fmt;
use std::str::FromStr;

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::{TypesError, TypesResult};

/// A token as the pool bootstrapper sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub symbol: String,
    pub address: Address,
    pub decimals: u32,
}

impl TokenRef {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u32) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            decimals,
        }
    }
}

/// Two tokens in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPair {
    pub token0: TokenRef,
    pub token1: TokenRef,
    /// Whether the caller's first token ended up as `token1`
    pub flipped: bool,
}

impl CanonicalPair {
    pub fn new(a: TokenRef, b: TokenRef) -> TypesResult<Self> {
        if a.address == b.address {
            return Err(TypesError::IdenticalTokens(a.address));
        }
        if a.address < b.address {
            Ok(Self {
                token0: a,
                token1: b,
                flipped: false,
            })
        } else {
            Ok(Self {
                token0: b,
                token1: a,
                flipped: true,
            })
        }
    }

    pub fn pool_key(&self, fee: u32) -> PoolKey {
        PoolKey {
            symbol0: self.token0.symbol.clone(),
            symbol1: self.token1.symbol.clone(),
            fee,
        }
    }
}

/// Persisted identifier of a pool: `{symbol0}_{symbol1}_{fee}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    pub symbol0: String,
    pub symbol1: String,
    pub fee: u32,
}

impl PoolKey {
    /// Key for a pair given in any order.
    pub fn for_pair(a: &TokenRef, b: &TokenRef, fee: u32) -> TypesResult<Self> {
        Ok(CanonicalPair::new(a.clone(), b.clone())?.pool_key(fee))
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.symbol0, self.symbol1, self.fee)
    }
}

impl FromStr for PoolKey {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypesError::InvalidPoolKey(s.to_string());

        // Fee is always the last segment
        let (symbols, fee) = s.rsplit_once('_').ok_or_else(invalid)?;
        let fee = fee.parse::<u32>().map_err(|_| invalid())?;
        let (symbol0, symbol1) = symbols.split_once('_').ok_or_else(invalid)?;
        if symbol0.is_empty() || symbol1.is_empty() || symbol1.contains('_') {
            return Err(invalid());
        }

        Ok(Self {
            symbol0: symbol0.to_string(),
            symbol1: symbol1.to_string(),
            fee,
        })
    }
}
