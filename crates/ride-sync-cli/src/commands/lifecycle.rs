//! Lifecycle procedure commands.

use super::Context;
use crate::output;
use anyhow::Result;
use ride_types::{RideId, UserId};
use tracing::info;

/// Mark a ride completed.
pub async fn complete(ctx: &Context, ride_id: &RideId) -> Result<()> {
    let token = ctx.require_token()?;
    ctx.store()?.complete_ride(ride_id, token).await?;
    info!(ride_id = %ride_id, "Ride completed");
    output::print_success(&format!("Ride {} completed", ride_id), ctx.format);
    Ok(())
}

/// Put a ride back into the open requests.
pub async fn return_to_requests(ctx: &Context, ride_id: &RideId) -> Result<()> {
    let token = ctx.require_token()?;
    ctx.store()?.return_ride_to_requests(ride_id, token).await?;
    info!(ride_id = %ride_id, "Ride returned to requests");
    output::print_success(
        &format!("Ride {} returned to requests", ride_id),
        ctx.format,
    );
    Ok(())
}

/// Cancel a ride.
pub async fn cancel(
    ctx: &Context,
    ride_id: &RideId,
    user_id: &UserId,
    reason: Option<&str>,
) -> Result<()> {
    let token = ctx.require_token()?;
    ctx.store()?
        .cancel_ride(ride_id, user_id, reason, token)
        .await?;
    info!(ride_id = %ride_id, cancelled_by = %user_id, "Ride cancelled");
    output::print_success(&format!("Ride {} cancelled", ride_id), ctx.format);
    Ok(())
}
