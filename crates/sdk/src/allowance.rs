//! Spending rights over the signer's tokens
//!
//! Two ways to grant a spender access: an on-chain `approve` for the full
//! word, skipped while the current allowance is still above half of it, or
//! an EIP-2612 permit signed off-chain and submitted in one call.

use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, U256};
use serde_json::json;
use tracing::{debug, info};

use crate::gateway::{ChainGateway, PermitCall};
use crate::utils::{deadline_in, MAX_UINT256};
use crate::{GatewayError, GatewayResult, SdkResult};

/// Permit signatures are valid for an hour unless a deadline is given.
pub const DEFAULT_PERMIT_TTL_SECS: u64 = 3600;

/// EIP-712 domain version used by the permit tokens.
pub const PERMIT_VERSION: &str = "1";

/// Allowance above which `approve_max` does nothing.
pub fn approval_threshold() -> U256 {
    MAX_UINT256 >> 1
}

/// Domain of a token's permit signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitDomain {
    pub name: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

/// Signed payload of a permit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitMessage {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub nonce: U256,
    pub deadline: U256,
}

/// EIP-712 document for a permit, shared by signer and verifier.
pub fn permit_typed_data(domain: &PermitDomain, message: &PermitMessage) -> GatewayResult<TypedData> {
    let document = json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" }
            ],
            "Permit": [
                { "name": "owner", "type": "address" },
                { "name": "spender", "type": "address" },
                { "name": "value", "type": "uint256" },
                { "name": "nonce", "type": "uint256" },
                { "name": "deadline", "type": "uint256" }
            ]
        },
        "primaryType": "Permit",
        "domain": {
            "name": domain.name,
            "version": PERMIT_VERSION,
            "chainId": domain.chain_id,
            "verifyingContract": format!("{:?}", domain.verifying_contract)
        },
        "message": {
            "owner": format!("{:?}", message.owner),
            "spender": format!("{:?}", message.spender),
            "value": message.value.to_string(),
            "nonce": message.nonce.to_string(),
            "deadline": message.deadline.to_string()
        }
    });

    serde_json::from_value(document)
        .map_err(|e| GatewayError::Signing(format!("Failed to build permit document: {}", e)))
}

/// Grants spenders access to the signer's balances.
pub struct AllowanceManager<'a> {
    gateway: &'a dyn ChainGateway,
}

impl<'a> AllowanceManager<'a> {
    pub fn new(gateway: &'a dyn ChainGateway) -> Self {
        Self { gateway }
    }

    /// Approve `spender` for the full word unless the allowance is still
    /// above half of it. Returns whether a transaction was sent.
    pub async fn approve_max(&self, token: Address, spender: Address) -> SdkResult<bool> {
        let owner = self.gateway.signer();
        let current = self.gateway.allowance(token, owner, spender).await?;

        if current >= approval_threshold() {
            debug!(?token, ?spender, "Allowance already sufficient");
            return Ok(false);
        }

        info!(?token, ?spender, "Approving max allowance");
        self.gateway.approve(token, spender, MAX_UINT256).await?;
        Ok(true)
    }

    /// Sign and submit a permit for `value`.
    ///
    /// The nonce is read fresh from the token; `deadline` defaults to one
    /// hour from now.
    pub async fn permit(
        &self,
        token: Address,
        spender: Address,
        value: U256,
        deadline: Option<U256>,
    ) -> SdkResult<PermitCall> {
        let owner = self.gateway.signer();
        let deadline = deadline.unwrap_or_else(|| deadline_in(DEFAULT_PERMIT_TTL_SECS));

        let domain = PermitDomain {
            name: self.gateway.name(token).await?,
            chain_id: self.gateway.chain_id().await?,
            verifying_contract: token,
        };
        let message = PermitMessage {
            owner,
            spender,
            value,
            nonce: self.gateway.nonces(token, owner).await?,
            deadline,
        };

        let typed_data = permit_typed_data(&domain, &message)?;
        let signature = self.gateway.sign_typed_data(&typed_data).await?;
        let call = PermitCall::new(owner, spender, value, deadline, &signature);

        info!(?token, ?spender, %value, nonce = %message.nonce, "Submitting permit");
        self.gateway.permit(token, &call).await?;
        Ok(call)
    }

    /// Permit for the full word.
    pub async fn permit_max(&self, token: Address, spender: Address, deadline: Option<U256>) -> SdkResult<PermitCall> {
        self.permit(token, spender, MAX_UINT256, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::transaction::eip712::Eip712;

    fn domain() -> PermitDomain {
        PermitDomain {
            name: "Tether USD".into(),
            chain_id: 31337,
            verifying_contract: Address::repeat_byte(0x11),
        }
    }

    fn message(nonce: u64) -> PermitMessage {
        PermitMessage {
            owner: Address::repeat_byte(0xaa),
            spender: Address::repeat_byte(0xbb),
            value: MAX_UINT256,
            nonce: U256::from(nonce),
            deadline: U256::from(1_700_000_000u64),
        }
    }

    #[test]
    fn test_typed_data_is_built() {
        let typed = permit_typed_data(&domain(), &message(0)).unwrap();
        assert_eq!(typed.primary_type, "Permit");
        assert_eq!(typed.domain.version.as_deref(), Some(PERMIT_VERSION));
        assert_eq!(typed.domain.chain_id, Some(U256::from(31337)));
        assert!(typed.encode_eip712().is_ok());
    }

    #[test]
    fn test_digest_depends_on_nonce() {
        let first = permit_typed_data(&domain(), &message(0)).unwrap().encode_eip712().unwrap();
        let second = permit_typed_data(&domain(), &message(1)).unwrap().encode_eip712().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_threshold_is_half_the_word() {
        assert_eq!(approval_threshold() * 2 + 1, MAX_UINT256);
    }
}
