//! AMM infrastructure: wrapped native, factory, position manager, router
//! and optionally a quoter.

use ethers::types::Address;
use tracing::info;

use super::{StageContext, StageOutcome, StageTracker};
use crate::gateway::Deployable;
use crate::SdkResult;

pub(super) async fn run(ctx: &StageContext<'_>, tracker: &mut StageTracker) -> SdkResult<StageOutcome> {
    let mut session = ctx.store.session(ctx.network);
    let mut deployed = 0usize;

    let (weth9, weth9_new) = match ctx.live("weth9", session.record.weth9).await? {
        Some(address) => (address, false),
        None => {
            let address = ctx.deploy(tracker, Deployable::Weth9).await?;
            session.record.weth9 = Some(address);
            session.commit()?;
            deployed += 1;
            (address, true)
        }
    };

    let (factory, factory_new) = match ctx.live("factory", session.record.factory).await? {
        Some(address) => (address, false),
        None => {
            let address = ctx.deploy(tracker, Deployable::Factory).await?;
            session.record.factory = Some(address);
            session.commit()?;
            deployed += 1;
            (address, true)
        }
    };

    // Periphery is bound to the core at construction
    let core_changed = weth9_new || factory_new;

    if reusable(ctx, "positionManager", session.record.position_manager, core_changed).await?.is_none() {
        let address = ctx
            .deploy(
                tracker,
                Deployable::PositionManager {
                    factory,
                    weth9,
                    descriptor: Address::zero(),
                },
            )
            .await?;
        session.record.position_manager = Some(address);
        session.commit()?;
        deployed += 1;
    }

    if reusable(ctx, "swapRouter", session.record.swap_router, core_changed).await?.is_none() {
        let address = ctx.deploy(tracker, Deployable::SwapRouter { factory, weth9 }).await?;
        session.record.swap_router = Some(address);
        session.commit()?;
        deployed += 1;
    }

    if ctx.config.artifacts.quoter.is_some()
        && reusable(ctx, "quoter", session.record.quoter, core_changed).await?.is_none()
    {
        let address = ctx.deploy(tracker, Deployable::Quoter { factory, weth9 }).await?;
        session.record.quoter = Some(address);
        session.commit()?;
        deployed += 1;
    }

    if deployed == 0 {
        return Ok(StageOutcome::AlreadyRecorded);
    }

    info!(deployed, ?weth9, ?factory, "Infrastructure ready");
    Ok(StageOutcome::Completed)
}

async fn reusable(
    ctx: &StageContext<'_>,
    field: &str,
    address: Option<Address>,
    core_changed: bool,
) -> SdkResult<Option<Address>> {
    if core_changed {
        return Ok(None);
    }
    ctx.live(field, address).await
}
