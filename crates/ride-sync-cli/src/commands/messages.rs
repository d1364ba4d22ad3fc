//! Message commands.

use super::Context;
use crate::output;
use anyhow::Result;
use ride_store::NewMessage;
use ride_types::{RideId, UserId};

/// List a ride's messages, oldest first.
pub async fn list_messages(ctx: &Context, ride_id: &RideId) -> Result<()> {
    let messages = ctx.store()?.fetch_messages(ride_id, ctx.bearer()).await?;
    output::print_messages(&messages, ctx.format);
    Ok(())
}

/// Send a message to the other party of a ride.
pub async fn send_message(
    ctx: &Context,
    ride_id: RideId,
    sender_id: UserId,
    recipient_id: UserId,
    content: String,
) -> Result<()> {
    if content.trim().is_empty() {
        anyhow::bail!("Message content must not be empty");
    }
    let token = ctx.require_token()?;
    let message = NewMessage {
        ride_id,
        sender_id,
        recipient_id,
        content,
    };
    let stored = ctx.store()?.send_message(&message, token).await?;
    output::print_success(&format!("Message {} sent", stored.id), ctx.format);
    Ok(())
}
