//! In-memory chain
//!
//! Implements every gateway trait against plain maps so provisioning flows
//! can run without a node. Token, permit, wrapping and lending semantics
//! follow the deployed contracts; mints and swaps treat every position as
//! full-range, which reduces the pool to a constant product.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use dex_testbed_math::{FeeTier, MAX_TICK, MIN_TICK};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::{Eip712, TypedData};
use ethers::types::{Address, Bytes, Signature, TxHash, H256, U256};
use ethers::utils::keccak256;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::allowance::{permit_typed_data, PermitDomain, PermitMessage};
use crate::config::DEV_PRIVATE_KEY;
use crate::gateway::{
    AmmClient, Deployable, LendingClient, MintOutcome, MintRequest, NetworkClient, PermitCall,
    SwapRequest, TokenClient,
};
use crate::utils::{narrow_u256, to_biguint, MAX_UINT256};
use crate::{GatewayError, GatewayResult};

pub const DEV_CHAIN_ID: u64 = 31337;

/// Native currency the signer starts with: 10,000 whole units.
pub fn dev_native_balance() -> U256 {
    U256::from(10_000u64) * U256::exp10(18)
}

/// Lowest price a pool accepts at initialization.
const MIN_SQRT_RATIO: u64 = 4_295_128_739;
const FEE_DENOMINATOR: u32 = 1_000_000;

fn revert<T>(reason: impl Into<String>) -> GatewayResult<T> {
    Err(GatewayError::Reverted(reason.into()))
}

#[derive(Debug, Clone, Default)]
struct TokenState {
    name: String,
    symbol: String,
    decimals: u8,
    wrapped_native: bool,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    nonces: HashMap<Address, U256>,
}

impl TokenState {
    fn new(name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            ..Default::default()
        }
    }

    fn balance(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or_default()
    }

    fn nonce(&self, owner: Address) -> U256 {
        self.nonces.get(&owner).copied().unwrap_or_default()
    }

    fn credit(&mut self, owner: Address, amount: U256) {
        let balance = self.balance(owner);
        self.balances.insert(owner, balance.saturating_add(amount));
    }

    fn debit(&mut self, owner: Address, amount: U256) -> GatewayResult<()> {
        let balance = self.balance(owner);
        if balance < amount {
            return revert(format!("{}: transfer amount exceeds balance", self.symbol));
        }
        self.balances.insert(owner, balance - amount);
        Ok(())
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> GatewayResult<()> {
        self.debit(from, amount)?;
        self.credit(to, amount);
        Ok(())
    }

    /// Consume `amount` of `spender`'s allowance; a full-word allowance is
    /// never decreased.
    fn spend_allowance(&mut self, owner: Address, spender: Address, amount: U256) -> GatewayResult<()> {
        let allowance = self.allowance(owner, spender);
        if allowance == MAX_UINT256 {
            return Ok(());
        }
        if allowance < amount {
            return revert(format!("{}: insufficient allowance", self.symbol));
        }
        self.allowances.insert((owner, spender), allowance - amount);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct PoolState {
    token0: Address,
    fee: u32,
    sqrt_price_x96: U256,
    liquidity: u128,
}

#[derive(Debug, Clone, Copy)]
struct LendingState {
    asset: Address,
    a_token: Address,
}

#[derive(Debug, Clone, Default)]
struct ChainState {
    address_nonce: u64,
    tx_count: u64,
    approvals: u64,
    timestamp: Option<u64>,
    code: HashMap<Address, Bytes>,
    native: HashMap<Address, U256>,
    tokens: HashMap<Address, TokenState>,
    unreadable_decimals: HashSet<Address>,
    position_managers: HashMap<Address, Address>,
    routers: HashMap<Address, Address>,
    pools: HashMap<(Address, Address, Address, u32), Address>,
    pool_states: HashMap<Address, PoolState>,
    next_position_id: u64,
    lending: HashMap<Address, LendingState>,
}

impl ChainState {
    fn now(&self) -> u64 {
        self.timestamp
            .unwrap_or_else(|| Utc::now().timestamp().max(0) as u64)
    }

    fn fresh_address(&mut self) -> Address {
        self.address_nonce += 1;
        let hash = keccak256(format!("contract:{}", self.address_nonce));
        let address = Address::from_slice(&hash[12..]);
        self.code.insert(address, Bytes::from(vec![0x60, 0x80, 0x60, 0x40]));
        address
    }

    fn record_tx(&mut self) -> TxHash {
        self.tx_count += 1;
        H256::from(keccak256(format!("tx:{}", self.tx_count)))
    }

    fn token(&self, address: Address) -> GatewayResult<&TokenState> {
        match self.tokens.get(&address) {
            Some(token) => Ok(token),
            None => revert(format!("no token contract at {:?}", address)),
        }
    }

    fn token_mut(&mut self, address: Address) -> GatewayResult<&mut TokenState> {
        match self.tokens.get_mut(&address) {
            Some(token) => Ok(token),
            None => revert(format!("no token contract at {:?}", address)),
        }
    }

    /// `transferFrom` executed by `spender` on behalf of `owner`.
    fn pull(&mut self, token: Address, owner: Address, spender: Address, to: Address, amount: U256) -> GatewayResult<()> {
        let token = self.token_mut(token)?;
        token.spend_allowance(owner, spender, amount)?;
        token.move_balance(owner, to, amount)
    }

    fn check_deadline(&self, deadline: U256) -> GatewayResult<()> {
        if U256::from(self.now()) > deadline {
            return revert("Transaction too old");
        }
        Ok(())
    }

    fn pool_for(&self, factory: Address, token_a: Address, token_b: Address, fee: u32) -> Option<Address> {
        let (token0, token1) = if token_a < token_b { (token_a, token_b) } else { (token_b, token_a) };
        self.pools.get(&(factory, token0, token1, fee)).copied()
    }

    fn deploy(&mut self, contract: Deployable) -> GatewayResult<Address> {
        let address = self.fresh_address();
        match contract {
            Deployable::Weth9 => {
                let mut weth = TokenState::new("Wrapped Ether", "WETH", 18);
                weth.wrapped_native = true;
                self.tokens.insert(address, weth);
            }
            Deployable::Factory | Deployable::Quoter { .. } => {}
            Deployable::PositionManager { factory, .. } => {
                self.position_managers.insert(address, factory);
            }
            Deployable::SwapRouter { factory, .. } => {
                self.routers.insert(address, factory);
            }
            Deployable::Token {
                name,
                symbol,
                decimals,
                initial_supply,
                owner,
            } => {
                let mut token = TokenState::new(&name, &symbol, decimals);
                token.credit(owner, initial_supply);
                self.tokens.insert(address, token);
            }
            Deployable::LendingPool { asset, decimals } => {
                let symbol = self.token(asset)?.symbol.clone();
                let a_token = self.fresh_address();
                self.tokens.insert(
                    a_token,
                    TokenState::new(&format!("Aave {}", symbol), &format!("a{}", symbol), decimals),
                );
                self.lending.insert(address, LendingState { asset, a_token });
            }
        }
        self.record_tx();
        Ok(address)
    }

    fn mint(&mut self, caller: Address, position_manager: Address, request: &MintRequest) -> GatewayResult<MintOutcome> {
        self.check_deadline(request.deadline)?;

        let factory = match self.position_managers.get(&position_manager) {
            Some(factory) => *factory,
            None => return revert("not a position manager"),
        };
        let pool = match self.pools.get(&(factory, request.token0, request.token1, request.fee)) {
            Some(pool) => *pool,
            None => return revert("pool not initialized"),
        };

        let spacing = match FeeTier::try_from(request.fee) {
            Ok(tier) => tier.tick_spacing(),
            Err(_) => return revert("unsupported fee"),
        };
        if request.tick_lower >= request.tick_upper {
            return revert("TLU");
        }
        if request.tick_lower < MIN_TICK || request.tick_lower % spacing != 0 {
            return revert("TLM");
        }
        if request.tick_upper > MAX_TICK || request.tick_upper % spacing != 0 {
            return revert("TUM");
        }

        let sqrt_price = match self.pool_states.get(&pool) {
            Some(state) => to_biguint(state.sqrt_price_x96),
            None => return revert("pool not initialized"),
        };
        let q96 = BigUint::from(1u8) << 96;

        // Liquidity backed by each side at the current price
        let from0: BigUint = to_biguint(request.amount0_desired) * &sqrt_price / &q96;
        let from1: BigUint = to_biguint(request.amount1_desired) * &q96 / &sqrt_price;
        let liquidity = from0.min(from1);
        if liquidity.is_zero() {
            return revert("zero liquidity");
        }

        let amount0 = narrow_u256(&(&liquidity * &q96 / &sqrt_price)).unwrap_or(MAX_UINT256);
        let amount1 = narrow_u256(&(&liquidity * &sqrt_price / &q96)).unwrap_or(MAX_UINT256);
        if amount0 < request.amount0_min || amount1 < request.amount1_min {
            return revert("Price slippage check");
        }

        let liquidity = match u128::try_from(liquidity) {
            Ok(liquidity) => liquidity,
            Err(_) => return revert("liquidity overflow"),
        };

        self.pull(request.token0, caller, position_manager, pool, amount0)?;
        self.pull(request.token1, caller, position_manager, pool, amount1)?;

        if let Some(state) = self.pool_states.get_mut(&pool) {
            state.liquidity = state.liquidity.saturating_add(liquidity);
        }

        self.next_position_id += 1;
        Ok(MintOutcome {
            token_id: U256::from(self.next_position_id),
            liquidity,
            amount0,
            amount1,
        })
    }

    fn swap(&mut self, caller: Address, router: Address, request: &SwapRequest) -> GatewayResult<U256> {
        self.check_deadline(request.deadline)?;

        let factory = match self.routers.get(&router) {
            Some(factory) => *factory,
            None => return revert("not a swap router"),
        };
        let pool = match self.pool_for(factory, request.token_in, request.token_out, request.fee) {
            Some(pool) => pool,
            None => return revert("pool does not exist"),
        };
        let state = match self.pool_states.get(&pool) {
            Some(state) if state.liquidity > 0 => state.clone(),
            _ => return revert("no liquidity"),
        };

        // Full-range liquidity behaves as a constant product over virtual reserves
        let q96 = BigUint::from(1u8) << 96;
        let liquidity = BigUint::from(state.liquidity);
        let sqrt_price = to_biguint(state.sqrt_price_x96);
        let reserve0 = &liquidity * &q96 / &sqrt_price;
        let reserve1 = &liquidity * &sqrt_price / &q96;

        let after_fee = to_biguint(request.amount_in) * (FEE_DENOMINATOR - state.fee) / FEE_DENOMINATOR;
        let (out, next_sqrt_price) = if request.token_in == state.token0 {
            let next0 = &reserve0 + &after_fee;
            (&reserve1 * &after_fee / &next0, &liquidity * &q96 / &next0)
        } else {
            let next1 = &reserve1 + &after_fee;
            (&reserve0 * &after_fee / &next1, &next1 * &q96 / &liquidity)
        };
        let out = narrow_u256(&out).unwrap_or(MAX_UINT256);

        let reserve = self.token(request.token_out)?.balance(pool);
        if out > reserve {
            return revert("insufficient liquidity for swap");
        }
        if out < request.amount_out_minimum {
            return revert("Too little received");
        }

        self.pull(request.token_in, caller, router, pool, request.amount_in)?;
        self.token_mut(request.token_out)?
            .move_balance(pool, request.recipient, out)?;
        if let (Some(state), Some(next)) = (self.pool_states.get_mut(&pool), narrow_u256(&next_sqrt_price)) {
            state.sqrt_price_x96 = next;
        }
        Ok(out)
    }
}

/// Gateway over an in-memory chain with a single development signer.
pub struct SimulatedChain {
    wallet: LocalWallet,
    chain_id: u64,
    state: Mutex<ChainState>,
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedChain {
    pub fn new() -> Self {
        let wallet = DEV_PRIVATE_KEY
            .parse::<LocalWallet>()
            .expect("development key is valid hex")
            .with_chain_id(DEV_CHAIN_ID);
        let chain = Self {
            wallet,
            chain_id: DEV_CHAIN_ID,
            state: Mutex::new(ChainState::default()),
        };
        chain.reset();
        chain
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wipe all contracts and balances, as if pointed at a fresh network.
    pub fn reset(&self) {
        let signer = self.wallet.address();
        let mut state = self.state();
        let address_nonce = state.address_nonce;
        *state = ChainState::default();
        // Keep addresses unique across resets so stale entries stay stale
        state.address_nonce = address_nonce;
        state.native.insert(signer, dev_native_balance());
    }

    /// Transactions confirmed so far (deployments included).
    pub fn transaction_count(&self) -> u64 {
        self.state().tx_count
    }

    /// `approve` transactions confirmed so far.
    pub fn approval_count(&self) -> u64 {
        self.state().approvals
    }

    pub fn native_balance(&self, owner: Address) -> U256 {
        self.state().native.get(&owner).copied().unwrap_or_default()
    }

    /// Overwrite an allowance without a transaction.
    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        if let Some(token) = self.state().tokens.get_mut(&token) {
            token.allowances.insert((owner, spender), amount);
        }
    }

    /// Make `decimals()` revert for `token`.
    pub fn hide_decimals(&self, token: Address) {
        self.state().unreadable_decimals.insert(token);
    }

    /// Move a pool's price without a swap.
    pub fn set_pool_sqrt_price(&self, pool: Address, sqrt_price_x96: U256) {
        if let Some(state) = self.state().pool_states.get_mut(&pool) {
            state.sqrt_price_x96 = sqrt_price_x96;
        }
    }

    /// Pin the block timestamp.
    pub fn set_timestamp(&self, timestamp: u64) {
        self.state().timestamp = Some(timestamp);
    }

    /// Remove the code at `address`, leaving a stale reference behind.
    pub fn destroy(&self, address: Address) {
        self.state().code.remove(&address);
    }
}

#[async_trait]
impl NetworkClient for SimulatedChain {
    fn signer(&self) -> Address {
        self.wallet.address()
    }

    async fn chain_id(&self) -> GatewayResult<u64> {
        Ok(self.chain_id)
    }

    async fn get_code(&self, address: Address) -> GatewayResult<Bytes> {
        Ok(self.state().code.get(&address).cloned().unwrap_or_default())
    }

    async fn sign_typed_data(&self, data: &TypedData) -> GatewayResult<Signature> {
        self.wallet
            .sign_typed_data(data)
            .await
            .map_err(|e| GatewayError::Signing(e.to_string()))
    }

    async fn deploy(&self, contract: Deployable) -> GatewayResult<Address> {
        self.state().deploy(contract)
    }
}

#[async_trait]
impl TokenClient for SimulatedChain {
    async fn name(&self, token: Address) -> GatewayResult<String> {
        Ok(self.state().token(token)?.name.clone())
    }

    async fn decimals(&self, token: Address) -> GatewayResult<u8> {
        let state = self.state();
        if state.unreadable_decimals.contains(&token) {
            return revert("decimals() reverted");
        }
        Ok(state.token(token)?.decimals)
    }

    async fn balance_of(&self, token: Address, owner: Address) -> GatewayResult<U256> {
        Ok(self.state().token(token)?.balance(owner))
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> GatewayResult<U256> {
        Ok(self.state().token(token)?.allowance(owner, spender))
    }

    async fn nonces(&self, token: Address, owner: Address) -> GatewayResult<U256> {
        Ok(self.state().token(token)?.nonce(owner))
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> GatewayResult<TxHash> {
        let owner = self.signer();
        let mut state = self.state();
        state.token_mut(token)?.allowances.insert((owner, spender), amount);
        state.approvals += 1;
        Ok(state.record_tx())
    }

    async fn transfer(&self, token: Address, to: Address, amount: U256) -> GatewayResult<TxHash> {
        let owner = self.signer();
        let mut state = self.state();
        state.token_mut(token)?.move_balance(owner, to, amount)?;
        Ok(state.record_tx())
    }

    async fn permit(&self, token: Address, call: &PermitCall) -> GatewayResult<TxHash> {
        let mut state = self.state();
        if U256::from(state.now()) > call.deadline {
            return revert("ERC20Permit: expired deadline");
        }

        let token_state = state.token(token)?;
        let domain = PermitDomain {
            name: token_state.name.clone(),
            chain_id: self.chain_id,
            verifying_contract: token,
        };
        let message = PermitMessage {
            owner: call.owner,
            spender: call.spender,
            value: call.value,
            nonce: token_state.nonce(call.owner),
            deadline: call.deadline,
        };

        let digest = permit_typed_data(&domain, &message)?
            .encode_eip712()
            .map_err(|e| GatewayError::Signing(e.to_string()))?;
        let recovered = call.signature().recover(H256::from(digest)).ok();
        if recovered != Some(call.owner) {
            return revert("ERC20Permit: invalid signature");
        }

        let token_state = state.token_mut(token)?;
        token_state.allowances.insert((call.owner, call.spender), call.value);
        token_state.nonces.insert(call.owner, message.nonce + 1);
        Ok(state.record_tx())
    }

    async fn deposit(&self, weth9: Address, amount: U256) -> GatewayResult<TxHash> {
        let owner = self.signer();
        let mut state = self.state();
        if !state.token(weth9)?.wrapped_native {
            return revert("not a wrapped native token");
        }

        let native = state.native.get(&owner).copied().unwrap_or_default();
        if native < amount {
            return revert("insufficient native balance");
        }
        state.native.insert(owner, native - amount);
        state.token_mut(weth9)?.credit(owner, amount);
        Ok(state.record_tx())
    }
}

#[async_trait]
impl AmmClient for SimulatedChain {
    async fn get_pool(&self, factory: Address, token_a: Address, token_b: Address, fee: u32) -> GatewayResult<Address> {
        Ok(self
            .state()
            .pool_for(factory, token_a, token_b, fee)
            .unwrap_or_else(Address::zero))
    }

    async fn create_and_initialize_pool_if_necessary(
        &self,
        position_manager: Address,
        token0: Address,
        token1: Address,
        fee: u32,
        sqrt_price_x96: U256,
    ) -> GatewayResult<TxHash> {
        let mut state = self.state();
        let factory = match state.position_managers.get(&position_manager) {
            Some(factory) => *factory,
            None => return revert("not a position manager"),
        };
        if token0 >= token1 {
            return revert("token0 must sort before token1");
        }
        if FeeTier::try_from(fee).is_err() {
            return revert("fee not enabled");
        }

        if state.pools.contains_key(&(factory, token0, token1, fee)) {
            return Ok(state.record_tx());
        }

        if sqrt_price_x96 < U256::from(MIN_SQRT_RATIO) || sqrt_price_x96.bits() > 160 {
            return revert("R");
        }

        let pool = state.fresh_address();
        state.pools.insert((factory, token0, token1, fee), pool);
        state.pool_states.insert(
            pool,
            PoolState {
                token0,
                fee,
                sqrt_price_x96,
                liquidity: 0,
            },
        );
        Ok(state.record_tx())
    }

    async fn simulate_mint(&self, position_manager: Address, request: &MintRequest) -> GatewayResult<MintOutcome> {
        let caller = self.signer();
        let mut scratch = (*self.state()).clone();
        scratch.mint(caller, position_manager, request)
    }

    async fn mint(&self, position_manager: Address, request: &MintRequest) -> GatewayResult<TxHash> {
        let caller = self.signer();
        let mut state = self.state();
        // Apply to a copy so a revert leaves no partial transfer behind
        let mut next = (*state).clone();
        next.mint(caller, position_manager, request)?;
        *state = next;
        Ok(state.record_tx())
    }

    async fn pool_liquidity(&self, pool: Address) -> GatewayResult<u128> {
        match self.state().pool_states.get(&pool) {
            Some(pool) => Ok(pool.liquidity),
            None => revert(format!("no pool at {:?}", pool)),
        }
    }

    async fn pool_sqrt_price(&self, pool: Address) -> GatewayResult<U256> {
        match self.state().pool_states.get(&pool) {
            Some(pool) => Ok(pool.sqrt_price_x96),
            None => revert(format!("no pool at {:?}", pool)),
        }
    }

    async fn exact_input_single(&self, router: Address, request: &SwapRequest) -> GatewayResult<TxHash> {
        let caller = self.signer();
        let mut state = self.state();
        let mut next = (*state).clone();
        next.swap(caller, router, request)?;
        *state = next;
        Ok(state.record_tx())
    }
}

#[async_trait]
impl LendingClient for SimulatedChain {
    async fn a_token(&self, pool: Address) -> GatewayResult<Address> {
        match self.state().lending.get(&pool) {
            Some(lending) => Ok(lending.a_token),
            None => revert(format!("no lending pool at {:?}", pool)),
        }
    }

    async fn supply(&self, pool: Address, asset: Address, amount: U256, on_behalf_of: Address) -> GatewayResult<TxHash> {
        let caller = self.signer();
        let mut state = self.state();
        let lending = match state.lending.get(&pool) {
            Some(lending) if lending.asset == asset => *lending,
            Some(_) => return revert("unsupported asset"),
            None => return revert(format!("no lending pool at {:?}", pool)),
        };

        let mut next = (*state).clone();
        next.pull(asset, caller, pool, pool, amount)?;
        next.token_mut(lending.a_token)?.credit(on_behalf_of, amount);
        *state = next;
        Ok(state.record_tx())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn deploy_token(chain: &SimulatedChain, symbol: &str, decimals: u8, supply: u64) -> Address {
        chain
            .deploy(Deployable::Token {
                name: format!("{} Token", symbol),
                symbol: symbol.to_string(),
                decimals,
                initial_supply: U256::from(supply),
                owner: chain.signer(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_deployed_contracts_have_code() {
        let chain = SimulatedChain::new();
        let token = deploy_token(&chain, "USDT", 6, 1_000).await;

        assert!(chain.has_code(token).await.unwrap());
        assert!(!chain.has_code(Address::repeat_byte(9)).await.unwrap());
        assert_eq!(chain.balance_of(token, chain.signer()).await.unwrap(), U256::from(1_000));
        assert_eq!(chain.transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_reset_leaves_old_addresses_stale() {
        let chain = SimulatedChain::new();
        let before = deploy_token(&chain, "TKA", 18, 1).await;
        chain.reset();
        let after = deploy_token(&chain, "TKA", 18, 1).await;

        assert_ne!(before, after);
        assert!(!chain.has_code(before).await.unwrap());
        assert!(chain.has_code(after).await.unwrap());
    }

    #[tokio::test]
    async fn test_transfer_requires_balance() {
        let chain = SimulatedChain::new();
        let token = deploy_token(&chain, "USDT", 6, 100).await;
        let to = Address::repeat_byte(7);

        chain.transfer(token, to, U256::from(60)).await.unwrap();
        assert_eq!(chain.balance_of(token, to).await.unwrap(), U256::from(60));

        let err = chain.transfer(token, to, U256::from(60)).await.unwrap_err();
        assert!(err.is_revert());
    }

    #[tokio::test]
    async fn test_deposit_wraps_native() {
        let chain = SimulatedChain::new();
        let weth = chain.deploy(Deployable::Weth9).await.unwrap();
        let amount = U256::exp10(18);

        chain.deposit(weth, amount).await.unwrap();
        assert_eq!(chain.balance_of(weth, chain.signer()).await.unwrap(), amount);
        assert_eq!(chain.native_balance(chain.signer()), dev_native_balance() - amount);

        let token = deploy_token(&chain, "USDT", 6, 1).await;
        assert!(chain.deposit(token, amount).await.is_err());
    }

    #[tokio::test]
    async fn test_pool_initialization_is_idempotent() {
        let chain = SimulatedChain::new();
        let factory = chain.deploy(Deployable::Factory).await.unwrap();
        let weth9 = chain.deploy(Deployable::Weth9).await.unwrap();
        let npm = chain
            .deploy(Deployable::PositionManager {
                factory,
                weth9,
                descriptor: Address::zero(),
            })
            .await
            .unwrap();
        let a = deploy_token(&chain, "A", 18, 1).await;
        let b = deploy_token(&chain, "B", 18, 1).await;
        let (t0, t1) = if a < b { (a, b) } else { (b, a) };
        let q96 = U256::one() << 96;

        chain
            .create_and_initialize_pool_if_necessary(npm, t0, t1, 3000, q96)
            .await
            .unwrap();
        chain
            .create_and_initialize_pool_if_necessary(npm, t0, t1, 3000, q96 * 2)
            .await
            .unwrap();

        let pool = chain.get_pool(factory, t1, t0, 3000).await.unwrap();
        assert!(!pool.is_zero());
        assert_eq!(chain.pool_sqrt_price(pool).await.unwrap(), q96);

        assert!(chain
            .create_and_initialize_pool_if_necessary(npm, t1, t0, 3000, q96)
            .await
            .is_err());
        assert!(chain.get_pool(factory, t0, t1, 500).await.unwrap().is_zero());
    }
}
