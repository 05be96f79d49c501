//! Sends every recorded token to a recipient.

use std::collections::HashSet;

use dex_testbed_math::scale_units;
use dex_testbed_types::parse_address;
use tracing::{info, warn};

use super::{StageContext, StageOutcome, StageTracker};
use crate::utils::{format_units, to_u256};
use crate::{ProvisionError, SdkResult};

pub(super) async fn run(ctx: &StageContext<'_>, tracker: &mut StageTracker) -> SdkResult<StageOutcome> {
    let input = ctx.options.fund_to.as_deref().unwrap_or_default();
    let recipient = parse_address(input.trim()).map_err(|_| ProvisionError::InvalidRecipient(input.to_string()))?;
    if recipient.is_zero() {
        return Err(ProvisionError::InvalidRecipient(input.to_string()));
    }

    let record = ctx.store.load(ctx.network);
    if record.tokens.is_empty() {
        return Err(ProvisionError::missing(ctx.stage.name(), "tokens"));
    }

    let signer = ctx.gateway.signer();
    let mut seen = HashSet::new();
    let mut skipped = 0usize;

    for (symbol, address) in &record.tokens {
        let Some(token) = ctx.live(&format!("tokens.{}", symbol), Some(*address)).await? else {
            skipped += 1;
            continue;
        };
        if !seen.insert(token) {
            continue;
        }

        let decimals = ctx.gateway.decimals(token).await?;
        let required = to_u256(&scale_units(ctx.config.funding.amount_per_token, u32::from(decimals)))?;
        let balance = ctx.gateway.balance_of(token, signer).await?;
        if balance < required {
            let shortfall = ProvisionError::InsufficientBalance {
                symbol: symbol.clone(),
                balance,
                required,
            };
            warn!(error = %shortfall, "Skipping token");
            skipped += 1;
            continue;
        }

        tracker.executing();
        info!(symbol = %symbol, amount = %format_units(required, decimals), ?recipient, "Funding");
        ctx.gateway.transfer(token, recipient, required).await?;
    }

    info!(?recipient, skipped, "Funding finished");
    Ok(StageOutcome::Completed)
}
