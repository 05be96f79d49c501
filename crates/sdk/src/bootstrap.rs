//! Pool bootstrapping
//!
//! Orders a pair canonically, initializes the pool at a target price and
//! seeds it with a full-range position owned by the signer.

use dex_testbed_math::{
    encode_sqrt_price, encode_sqrt_price_units, ensure_fits_sqrt_price, parse_units, pow10, FeeTier, PriceError,
};
use dex_testbed_types::{CanonicalPair, PoolKey, PoolRecord, TokenRef};
use ethers::types::{Address, U256};
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::{info, warn};

use crate::allowance::AllowanceManager;
use crate::config::{PriceBasis, TargetPrice};
use crate::gateway::{ChainGateway, MintRequest};
use crate::utils::{deadline_in, to_u256};
use crate::{GatewayError, SdkResult};

/// Mints must land within ten minutes of being built.
pub const MINT_DEADLINE_SECS: u64 = 600;

/// Contracts a bootstrap needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmmAddresses {
    pub factory: Address,
    pub position_manager: Address,
    /// Wrapped native token; sides equal to it are wrapped on demand
    pub weth9: Option<Address>,
}

/// Whole tokens supplied per side of a new position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityScale {
    pub token_a: u64,
    pub token_b: u64,
}

/// One pool to bootstrap, with sides in configured order.
#[derive(Debug, Clone)]
pub struct PoolSpec {
    pub token_a: TokenRef,
    pub token_b: TokenRef,
    pub fee: FeeTier,
    pub target: Option<TargetPrice>,
    pub scale: LiquidityScale,
}

/// Initial `sqrtPriceX96` for a canonical pair.
///
/// Without a target the price is 1:1 after decimal adjustment. A target
/// says `amount_a` of the first configured token is worth `amount_b` of the
/// second; it is re-oriented so the result is token1 per token0.
pub fn initial_sqrt_price(pair: &CanonicalPair, target: Option<&TargetPrice>) -> SdkResult<BigUint> {
    let dec0 = pair.token0.decimals;
    let dec1 = pair.token1.decimals;

    let sqrt_price = match target {
        None => encode_sqrt_price(&BigUint::from(1u8), dec1, &BigUint::from(1u8), dec0)?,
        Some(target) => {
            // Configured order: first token is token_a
            let (dec_a, dec_b) = if pair.flipped { (dec1, dec0) } else { (dec0, dec1) };
            let (raw_a, raw_b) = match target.basis {
                PriceBasis::Units => (parse_units(&target.amount_a, dec_a)?, parse_units(&target.amount_b, dec_b)?),
                PriceBasis::Raw => (parse_units(&target.amount_a, 0)?, parse_units(&target.amount_b, 0)?),
            };
            let (raw0, raw1) = if pair.flipped { (raw_b, raw_a) } else { (raw_a, raw_b) };
            encode_sqrt_price_units(&raw1, &raw0)?
        }
    };

    if sqrt_price.is_zero() {
        return Err(PriceError::InvalidAmount {
            amount: "0".to_string(),
            reason: "initial price must be positive".to_string(),
        }
        .into());
    }

    Ok(ensure_fits_sqrt_price(sqrt_price)?)
}

pub struct PoolBootstrapper<'a> {
    gateway: &'a dyn ChainGateway,
    allowances: AllowanceManager<'a>,
    amm: AmmAddresses,
}

impl<'a> PoolBootstrapper<'a> {
    pub fn new(gateway: &'a dyn ChainGateway, amm: AmmAddresses) -> Self {
        Self {
            gateway,
            allowances: AllowanceManager::new(gateway),
            amm,
        }
    }

    /// Create and initialize the pool if needed, then mint a full-range
    /// position. Running it again for the same pair mints another position.
    ///
    /// The returned record carries the pool's initial price: the target when
    /// this call created the pool, otherwise the price already `recorded` for
    /// the same address, falling back to the live price for a pool nothing
    /// recorded.
    pub async fn bootstrap(
        &self,
        spec: &PoolSpec,
        recorded: Option<&PoolRecord>,
    ) -> SdkResult<(PoolKey, PoolRecord)> {
        let pair = CanonicalPair::new(spec.token_a.clone(), spec.token_b.clone())?;
        let key = pair.pool_key(spec.fee.fee());
        let (token0, token1) = (&pair.token0, &pair.token1);

        let target_price = initial_sqrt_price(&pair, spec.target.as_ref())?;
        let target_price = to_u256(&target_price)?;

        let existing = self
            .gateway
            .get_pool(self.amm.factory, token0.address, token1.address, spec.fee.fee())
            .await?;

        info!(pool = %key, token0 = ?token0.address, token1 = ?token1.address, sqrt_price_x96 = %target_price, "Initializing pool");
        self.gateway
            .create_and_initialize_pool_if_necessary(
                self.amm.position_manager,
                token0.address,
                token1.address,
                spec.fee.fee(),
                target_price,
            )
            .await?;

        let pool = self
            .gateway
            .get_pool(self.amm.factory, token0.address, token1.address, spec.fee.fee())
            .await?;
        if pool.is_zero() {
            return Err(GatewayError::reverted(format!("Factory has no pool for {}", key)).into());
        }

        // An already-initialized pool keeps its price
        let sqrt_price_x96 = if existing.is_zero() {
            target_price
        } else {
            let current = self.gateway.pool_sqrt_price(pool).await?;
            if current != target_price {
                warn!(pool = %key, %current, target = %target_price, "Pool was already initialized at a different price");
            }
            match recorded {
                Some(entry) if entry.address == pool => entry.sqrt_price_x96,
                _ => current,
            }
        };

        let (scale0, scale1) = if pair.flipped {
            (spec.scale.token_b, spec.scale.token_a)
        } else {
            (spec.scale.token_a, spec.scale.token_b)
        };
        let amount0 = desired_amount(scale0, token0.decimals)?;
        let amount1 = desired_amount(scale1, token1.decimals)?;

        self.wrap_shortfall(token0, amount0).await?;
        self.wrap_shortfall(token1, amount1).await?;

        self.allowances.approve_max(token0.address, self.amm.position_manager).await?;
        self.allowances.approve_max(token1.address, self.amm.position_manager).await?;

        let (tick_lower, tick_upper) = spec.fee.full_range();
        let request = MintRequest {
            token0: token0.address,
            token1: token1.address,
            fee: spec.fee.fee(),
            tick_lower,
            tick_upper,
            amount0_desired: amount0,
            amount1_desired: amount1,
            amount0_min: U256::zero(),
            amount1_min: U256::zero(),
            recipient: self.gateway.signer(),
            deadline: deadline_in(MINT_DEADLINE_SECS),
        };

        let preview = self.gateway.simulate_mint(self.amm.position_manager, &request).await?;
        info!(pool = %key, token_id = %preview.token_id, "Minting full-range position");
        self.gateway.mint(self.amm.position_manager, &request).await?;

        let liquidity = self.gateway.pool_liquidity(pool).await?;
        info!(pool = %key, ?pool, liquidity, "Pool seeded");

        Ok((
            key,
            PoolRecord {
                address: pool,
                position_id: preview.token_id,
                sqrt_price_x96,
            },
        ))
    }

    /// Wrap exactly the missing amount when `token` is the wrapped native.
    async fn wrap_shortfall(&self, token: &TokenRef, required: U256) -> SdkResult<()> {
        if self.amm.weth9 != Some(token.address) {
            return Ok(());
        }

        let balance = self.gateway.balance_of(token.address, self.gateway.signer()).await?;
        if balance >= required {
            return Ok(());
        }

        let shortfall = required - balance;
        info!(symbol = %token.symbol, %shortfall, "Wrapping native currency");
        self.gateway.deposit(token.address, shortfall).await?;
        Ok(())
    }
}

fn desired_amount(scale: u64, decimals: u32) -> SdkResult<U256> {
    to_u256(&(BigUint::from(scale) * pow10(decimals)))
}
