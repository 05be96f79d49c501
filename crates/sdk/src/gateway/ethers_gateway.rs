use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::{Detokenize, Tokenize};
use ethers::contract::{ContractCall, ContractError, ContractFactory};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Bytes, Signature, TxHash, U256, U64};
use tracing::{debug, info};

use super::bindings::{
    ConcentratedPool, LendingPoolMock, PermitToken, PoolFactory, PositionManager, SwapRouter,
    WrappedNative,
};
use super::{
    AmmClient, Deployable, LendingClient, MintOutcome, MintRequest, NetworkClient, PermitCall,
    SwapRequest, TokenClient,
};
use crate::artifacts::{ArtifactSet, ContractArtifact};
use crate::{GatewayError, GatewayResult};

type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Gateway backed by a JSON-RPC endpoint and a local private key.
pub struct EthersGateway {
    client: Arc<Client>,
    artifacts: ArtifactSet,
}

impl EthersGateway {
    /// Connect and bind the signing key to the network's chain id.
    pub async fn connect(rpc_url: &str, private_key: &str, artifacts: ArtifactSet) -> GatewayResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| GatewayError::Transport(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?
            .as_u64();

        let wallet = private_key
            .parse::<LocalWallet>()
            .map_err(|e| GatewayError::Signing(format!("Invalid private key: {}", e)))?
            .with_chain_id(chain_id);

        let client = SignerMiddleware::new(provider, wallet);
        info!(chain_id, signer = ?client.address(), "Connected to network");

        Ok(Self {
            client: Arc::new(client),
            artifacts,
        })
    }

    async fn deploy_artifact<T>(&self, artifact: &ContractArtifact, args: T) -> GatewayResult<Address>
    where
        T: Tokenize + Send,
    {
        let factory = ContractFactory::new(artifact.abi.clone(), artifact.bytecode.clone(), self.client.clone());
        let contract = factory
            .deploy(args)
            .map_err(contract_error)?
            .send()
            .await
            .map_err(contract_error)?;
        Ok(contract.address())
    }

    fn token(&self, address: Address) -> PermitToken<Client> {
        PermitToken::new(address, self.client.clone())
    }

    fn position_manager(&self, address: Address) -> PositionManager<Client> {
        PositionManager::new(address, self.client.clone())
    }
}

/// Submit a call and wait for its receipt.
async fn confirm<D>(call: ContractCall<Client, D>) -> GatewayResult<TxHash>
where
    D: Detokenize + Send + Sync,
{
    let pending = call.send().await.map_err(contract_error)?;
    let tx_hash = pending.tx_hash();
    debug!(?tx_hash, "Transaction submitted");

    let receipt = pending
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?
        .ok_or(GatewayError::NotConfirmed(tx_hash))?;

    if receipt.status != Some(U64::one()) {
        return Err(GatewayError::Reverted(format!("Transaction {:?} reverted", tx_hash)));
    }
    Ok(tx_hash)
}

fn contract_error<M: Middleware>(err: ContractError<M>) -> GatewayError {
    if let Some(reason) = err.decode_revert::<String>() {
        return GatewayError::Reverted(reason);
    }
    if err.is_revert() {
        GatewayError::Reverted(err.to_string())
    } else {
        GatewayError::Transport(err.to_string())
    }
}

type MintTuple = (Address, Address, u32, i32, i32, U256, U256, U256, U256, Address, U256);

fn mint_params(request: &MintRequest) -> MintTuple {
    (
        request.token0,
        request.token1,
        request.fee,
        request.tick_lower,
        request.tick_upper,
        request.amount0_desired,
        request.amount1_desired,
        request.amount0_min,
        request.amount1_min,
        request.recipient,
        request.deadline,
    )
}

type SwapTuple = (Address, Address, u32, Address, U256, U256, U256, U256);

fn swap_params(request: &SwapRequest) -> SwapTuple {
    (
        request.token_in,
        request.token_out,
        request.fee,
        request.recipient,
        request.deadline,
        request.amount_in,
        request.amount_out_minimum,
        request.sqrt_price_limit_x96,
    )
}

#[async_trait]
impl NetworkClient for EthersGateway {
    fn signer(&self) -> Address {
        self.client.address()
    }

    async fn chain_id(&self) -> GatewayResult<u64> {
        Ok(self.client.signer().chain_id())
    }

    async fn get_code(&self, address: Address) -> GatewayResult<Bytes> {
        self.client
            .get_code(address, None)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn sign_typed_data(&self, data: &TypedData) -> GatewayResult<Signature> {
        self.client
            .signer()
            .sign_typed_data(data)
            .await
            .map_err(|e| GatewayError::Signing(e.to_string()))
    }

    async fn deploy(&self, contract: Deployable) -> GatewayResult<Address> {
        let label = contract.label().to_string();
        let artifacts = &self.artifacts;

        let address = match contract {
            Deployable::Weth9 => self.deploy_artifact(&artifacts.weth9, ()).await?,
            Deployable::Factory => self.deploy_artifact(&artifacts.factory, ()).await?,
            Deployable::PositionManager {
                factory,
                weth9,
                descriptor,
            } => {
                self.deploy_artifact(&artifacts.position_manager, (factory, weth9, descriptor))
                    .await?
            }
            Deployable::SwapRouter { factory, weth9 } => {
                self.deploy_artifact(&artifacts.swap_router, (factory, weth9)).await?
            }
            Deployable::Quoter { factory, weth9 } => {
                let quoter = artifacts
                    .quoter
                    .as_ref()
                    .ok_or_else(|| GatewayError::Artifact("No quoter artifact configured".to_string()))?;
                self.deploy_artifact(quoter, (factory, weth9)).await?
            }
            Deployable::Token {
                name,
                symbol,
                decimals,
                initial_supply,
                owner,
            } => {
                self.deploy_artifact(&artifacts.token, (name, symbol, decimals, initial_supply, owner))
                    .await?
            }
            Deployable::LendingPool { asset, decimals } => {
                self.deploy_artifact(&artifacts.lending_pool, (asset, decimals)).await?
            }
        };

        debug!(contract = %label, ?address, "Contract deployed");
        Ok(address)
    }
}

#[async_trait]
impl TokenClient for EthersGateway {
    async fn name(&self, token: Address) -> GatewayResult<String> {
        self.token(token).name().call().await.map_err(contract_error)
    }

    async fn decimals(&self, token: Address) -> GatewayResult<u8> {
        self.token(token).decimals().call().await.map_err(contract_error)
    }

    async fn balance_of(&self, token: Address, owner: Address) -> GatewayResult<U256> {
        self.token(token).balance_of(owner).call().await.map_err(contract_error)
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> GatewayResult<U256> {
        self.token(token)
            .allowance(owner, spender)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn nonces(&self, token: Address, owner: Address) -> GatewayResult<U256> {
        self.token(token).nonces(owner).call().await.map_err(contract_error)
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> GatewayResult<TxHash> {
        confirm(self.token(token).approve(spender, amount)).await
    }

    async fn transfer(&self, token: Address, to: Address, amount: U256) -> GatewayResult<TxHash> {
        confirm(self.token(token).transfer(to, amount)).await
    }

    async fn permit(&self, token: Address, call: &PermitCall) -> GatewayResult<TxHash> {
        confirm(self.token(token).permit(
            call.owner,
            call.spender,
            call.value,
            call.deadline,
            call.v,
            call.r,
            call.s,
        ))
        .await
    }

    async fn deposit(&self, weth9: Address, amount: U256) -> GatewayResult<TxHash> {
        let weth = WrappedNative::new(weth9, self.client.clone());
        confirm(weth.deposit().value(amount)).await
    }
}

#[async_trait]
impl AmmClient for EthersGateway {
    async fn get_pool(&self, factory: Address, token_a: Address, token_b: Address, fee: u32) -> GatewayResult<Address> {
        PoolFactory::new(factory, self.client.clone())
            .get_pool(token_a, token_b, fee)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn create_and_initialize_pool_if_necessary(
        &self,
        position_manager: Address,
        token0: Address,
        token1: Address,
        fee: u32,
        sqrt_price_x96: U256,
    ) -> GatewayResult<TxHash> {
        confirm(
            self.position_manager(position_manager)
                .create_and_initialize_pool_if_necessary(token0, token1, fee, sqrt_price_x96),
        )
        .await
    }

    async fn simulate_mint(&self, position_manager: Address, request: &MintRequest) -> GatewayResult<MintOutcome> {
        let (token_id, liquidity, amount0, amount1) = self
            .position_manager(position_manager)
            .mint(mint_params(request))
            .call()
            .await
            .map_err(contract_error)?;

        Ok(MintOutcome {
            token_id,
            liquidity,
            amount0,
            amount1,
        })
    }

    async fn mint(&self, position_manager: Address, request: &MintRequest) -> GatewayResult<TxHash> {
        confirm(self.position_manager(position_manager).mint(mint_params(request))).await
    }

    async fn pool_liquidity(&self, pool: Address) -> GatewayResult<u128> {
        ConcentratedPool::new(pool, self.client.clone())
            .liquidity()
            .call()
            .await
            .map_err(contract_error)
    }

    async fn pool_sqrt_price(&self, pool: Address) -> GatewayResult<U256> {
        let (sqrt_price_x96, ..) = ConcentratedPool::new(pool, self.client.clone())
            .pool_slot()
            .call()
            .await
            .map_err(contract_error)?;
        Ok(sqrt_price_x96)
    }

    async fn exact_input_single(&self, router: Address, request: &SwapRequest) -> GatewayResult<TxHash> {
        confirm(SwapRouter::new(router, self.client.clone()).exact_input_single(swap_params(request))).await
    }
}

#[async_trait]
impl LendingClient for EthersGateway {
    async fn a_token(&self, pool: Address) -> GatewayResult<Address> {
        LendingPoolMock::new(pool, self.client.clone())
            .receipt_token()
            .call()
            .await
            .map_err(contract_error)
    }

    async fn supply(&self, pool: Address, asset: Address, amount: U256, on_behalf_of: Address) -> GatewayResult<TxHash> {
        confirm(LendingPoolMock::new(pool, self.client.clone()).supply(asset, amount, on_behalf_of, 0)).await
    }
}
