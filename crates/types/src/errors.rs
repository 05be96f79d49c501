use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Invalid account identifier '{0}'")]
    InvalidAddress(String),

    #[error("Invalid pool key '{0}': expected SYMBOL0_SYMBOL1_FEE")]
    InvalidPoolKey(String),

    #[error("Identical tokens cannot form a pair: {0:?}")]
    IdenticalTokens(ethers::types::Address),
}
