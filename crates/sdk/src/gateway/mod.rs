//! Chain gateway
//!
//! The only seam through which provisioning talks to a network. Calls are
//! grouped per protocol; every write returns once its transaction is
//! confirmed, so callers never hold more than one transaction in flight.

pub mod bindings;
mod ethers_gateway;

pub use ethers_gateway::EthersGateway;

use async_trait::async_trait;
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Bytes, Signature, TxHash, U256};

use crate::GatewayResult;

/// A contract the provisioning stages know how to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployable {
    Weth9,
    Factory,
    PositionManager {
        factory: Address,
        weth9: Address,
        descriptor: Address,
    },
    SwapRouter {
        factory: Address,
        weth9: Address,
    },
    Quoter {
        factory: Address,
        weth9: Address,
    },
    /// Permit-capable ERC20; `initial_supply` in smallest units
    Token {
        name: String,
        symbol: String,
        decimals: u8,
        initial_supply: U256,
        owner: Address,
    },
    /// Lending pool mock accepting a single asset
    LendingPool {
        asset: Address,
        decimals: u8,
    },
}

impl Deployable {
    pub fn label(&self) -> &str {
        match self {
            Deployable::Weth9 => "WETH9",
            Deployable::Factory => "Factory",
            Deployable::PositionManager { .. } => "PositionManager",
            Deployable::SwapRouter { .. } => "SwapRouter",
            Deployable::Quoter { .. } => "Quoter",
            Deployable::Token { symbol, .. } => symbol,
            Deployable::LendingPool { .. } => "LendingPool",
        }
    }
}

/// Parameters of a position-manager mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0_desired: U256,
    pub amount1_desired: U256,
    pub amount0_min: U256,
    pub amount1_min: U256,
    pub recipient: Address,
    pub deadline: U256,
}

/// What a mint produced (or would produce, when simulated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintOutcome {
    pub token_id: U256,
    pub liquidity: u128,
    pub amount0: U256,
    pub amount1: U256,
}

/// Parameters of a single-pool exact-input swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub recipient: Address,
    pub deadline: U256,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
    pub sqrt_price_limit_x96: U256,
}

/// EIP-2612 permit arguments with the signature split into `(v, r, s)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitCall {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub deadline: U256,
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl PermitCall {
    pub fn new(owner: Address, spender: Address, value: U256, deadline: U256, signature: &Signature) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        signature.r.to_big_endian(&mut r);
        signature.s.to_big_endian(&mut s);
        Self {
            owner,
            spender,
            value,
            deadline,
            v: signature.v as u8,
            r,
            s,
        }
    }

    pub fn signature(&self) -> Signature {
        Signature {
            r: U256::from_big_endian(&self.r),
            s: U256::from_big_endian(&self.s),
            v: u64::from(self.v),
        }
    }
}

#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// The single account that signs every transaction.
    fn signer(&self) -> Address;

    async fn chain_id(&self) -> GatewayResult<u64>;

    async fn get_code(&self, address: Address) -> GatewayResult<Bytes>;

    async fn has_code(&self, address: Address) -> GatewayResult<bool> {
        Ok(!self.get_code(address).await?.is_empty())
    }

    async fn sign_typed_data(&self, data: &TypedData) -> GatewayResult<Signature>;

    async fn deploy(&self, contract: Deployable) -> GatewayResult<Address>;
}

#[async_trait]
pub trait TokenClient: Send + Sync {
    async fn name(&self, token: Address) -> GatewayResult<String>;

    async fn decimals(&self, token: Address) -> GatewayResult<u8>;

    async fn balance_of(&self, token: Address, owner: Address) -> GatewayResult<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> GatewayResult<U256>;

    async fn nonces(&self, token: Address, owner: Address) -> GatewayResult<U256>;

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> GatewayResult<TxHash>;

    async fn transfer(&self, token: Address, to: Address, amount: U256) -> GatewayResult<TxHash>;

    async fn permit(&self, token: Address, call: &PermitCall) -> GatewayResult<TxHash>;

    /// Wrap native currency into the wrapped-native token.
    async fn deposit(&self, weth9: Address, amount: U256) -> GatewayResult<TxHash>;
}

#[async_trait]
pub trait AmmClient: Send + Sync {
    /// Pool for the pair and fee, or the zero address.
    async fn get_pool(&self, factory: Address, token_a: Address, token_b: Address, fee: u32) -> GatewayResult<Address>;

    async fn create_and_initialize_pool_if_necessary(
        &self,
        position_manager: Address,
        token0: Address,
        token1: Address,
        fee: u32,
        sqrt_price_x96: U256,
    ) -> GatewayResult<TxHash>;

    /// Evaluate a mint without submitting it.
    async fn simulate_mint(&self, position_manager: Address, request: &MintRequest) -> GatewayResult<MintOutcome>;

    async fn mint(&self, position_manager: Address, request: &MintRequest) -> GatewayResult<TxHash>;

    async fn pool_liquidity(&self, pool: Address) -> GatewayResult<u128>;

    async fn pool_sqrt_price(&self, pool: Address) -> GatewayResult<U256>;

    async fn exact_input_single(&self, router: Address, request: &SwapRequest) -> GatewayResult<TxHash>;
}

#[async_trait]
pub trait LendingClient: Send + Sync {
    /// Receipt token minted by the pool on supply.
    async fn a_token(&self, pool: Address) -> GatewayResult<Address>;

    async fn supply(&self, pool: Address, asset: Address, amount: U256, on_behalf_of: Address) -> GatewayResult<TxHash>;
}

/// Everything a provisioning run needs from the network.
pub trait ChainGateway: NetworkClient + TokenClient + AmmClient + LendingClient {}

impl<T> ChainGateway for T where T: NetworkClient + TokenClient + AmmClient + LendingClient {}
