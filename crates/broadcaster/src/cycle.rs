//! One dispatch cycle over the campaigns currently in the `sending` state.

use std::collections::BTreeSet;

use engine::{Engine, EngineError, Promotion};
use uuid::Uuid;

use crate::{
    classify::Fault,
    courier::{Courier, DeliveryOutcome},
    throttle::SendGate,
};

/// Sweep every `sending` campaign once.
///
/// Campaigns are processed in repository order, one at a time. Each is
/// claimed before its pass and released after it, so a second broadcaster
/// instance skips campaigns this one is working on. A failure anywhere is
/// confined to the campaign it hit.
pub(crate) async fn run<C: Courier>(
    engine: &Engine,
    courier: &C,
    gate: &mut SendGate,
    instance: &str,
    lease: chrono::Duration,
) {
    let promotions = match engine.sending_promotions().await {
        Ok(promotions) => promotions,
        Err(err) => {
            tracing::error!("failed to fetch sending promotions: {err}");
            return;
        }
    };

    for promotion in promotions {
        match engine.claim_promotion(promotion.id, instance, lease).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    promotion = %promotion.id,
                    "claimed by another instance, skipping"
                );
                continue;
            }
            Err(err) => {
                tracing::error!(promotion = %promotion.id, "failed to claim promotion: {err}");
                continue;
            }
        }

        if let Err(err) = broadcast(engine, courier, gate, &promotion).await {
            tracing::error!(promotion = %promotion.id, "broadcast aborted: {err}");
        }

        if let Err(err) = engine.release_promotion(promotion.id, instance).await {
            tracing::warn!(promotion = %promotion.id, "failed to release claim: {err}");
        }
    }
}

/// Deliver one campaign to every eligible channel it has not reached yet,
/// then finalize it if the eligible set is fully covered.
///
/// Progress lives in a pass-local accumulator seeded from the persisted row
/// and is written back whole after each confirmed send; the row is never
/// incremented in place.
async fn broadcast<C: Courier>(
    engine: &Engine,
    courier: &C,
    gate: &mut SendGate,
    promotion: &Promotion,
) -> Result<(), EngineError> {
    let channels = engine.eligible_channels().await?;
    if channels.is_empty() {
        tracing::debug!(promotion = %promotion.id, "no eligible channels");
        return Ok(());
    }

    let mut processed: BTreeSet<Uuid> = promotion.processed_channels.clone();
    let mut total_reach = promotion.total_reach;

    for channel in &channels {
        if processed.contains(&channel.id) {
            continue;
        }

        gate.wait().await;
        match courier.deliver(promotion, channel).await {
            DeliveryOutcome::Delivered { reach_added } => {
                processed.insert(channel.id);
                total_reach += reach_added;
                engine
                    .record_progress(promotion.id, &processed, total_reach, processed.len() as i32)
                    .await?;
                tracing::info!(
                    promotion = %promotion.id,
                    chat = channel.chat_id,
                    reach = reach_added,
                    "delivered"
                );
            }
            DeliveryOutcome::Failed {
                fault: Fault::Unreachable,
                message,
            } => {
                tracing::warn!(
                    promotion = %promotion.id,
                    chat = channel.chat_id,
                    "channel unreachable, retiring it: {message}"
                );
                engine.disable_channel(channel.id).await?;
            }
            DeliveryOutcome::Failed {
                fault: Fault::Transient,
                message,
            } => {
                tracing::warn!(
                    promotion = %promotion.id,
                    chat = channel.chat_id,
                    "delivery failed, retrying next cycle: {message}"
                );
            }
        }
    }

    // Completion is judged against a fresh snapshot: a channel that opted in
    // while the pass was running keeps the campaign in `sending`, and it gets
    // delivered next cycle. An empty snapshot never finalizes.
    let eligible = engine.eligible_channels().await?;
    if !eligible.is_empty()
        && eligible
            .iter()
            .all(|channel| processed.contains(&channel.id))
    {
        engine.mark_sent(promotion.id).await?;
        tracing::info!(
            promotion = %promotion.id,
            channels = processed.len(),
            reach = total_reach,
            "promotion fully delivered"
        );
    }

    Ok(())
}
