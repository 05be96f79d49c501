//! Configured test tokens plus the wrapped-native alias.

use dex_testbed_math::scale_units;
use tracing::{debug, info};

use super::{StageContext, StageOutcome, StageTracker};
use crate::gateway::Deployable;
use crate::utils::to_u256;
use crate::SdkResult;

pub(super) async fn run(ctx: &StageContext<'_>, tracker: &mut StageTracker) -> SdkResult<StageOutcome> {
    let mut session = ctx.store.session(ctx.network);
    let owner = ctx.gateway.signer();
    let mut changed = false;

    for token in &ctx.config.tokens {
        let field = format!("tokens.{}", token.symbol);
        if let Some(address) = ctx.live(&field, session.record.token(&token.symbol)).await? {
            debug!(symbol = %token.symbol, ?address, "Token already deployed");
            continue;
        }

        let initial_supply = to_u256(&scale_units(token.initial_supply, u32::from(token.decimals)))?;
        let address = ctx
            .deploy(
                tracker,
                Deployable::Token {
                    name: token.name.clone(),
                    symbol: token.symbol.clone(),
                    decimals: token.decimals,
                    initial_supply,
                    owner,
                },
            )
            .await?;

        session.record.tokens.insert(token.symbol.clone(), address);
        session.commit()?;
        changed = true;
    }

    if let Some(alias) = &ctx.config.native_alias {
        if let Some(weth9) = ctx.live("weth9", session.record.weth9).await? {
            if session.record.token(alias) != Some(weth9) {
                info!(symbol = %alias, ?weth9, "Aliasing wrapped native token");
                session.record.tokens.insert(alias.clone(), weth9);
                session.commit()?;
                changed = true;
            }
        }
    }

    Ok(if changed {
        StageOutcome::Completed
    } else {
        StageOutcome::AlreadyRecorded
    })
}
