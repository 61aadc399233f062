use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use broadcaster::{Broadcaster, Courier, DeliveryOutcome, Fault};
use engine::{Channel, Engine, Promotion, PromotionStatus};
use migration::MigratorTrait;
use sea_orm::Database;
use uuid::Uuid;

/// Two store handles over the same in-memory database: one moves into the
/// broadcaster, the other stays out for assertions.
async fn engine_pair() -> (Engine, Engine) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let view = Engine::builder().database(db).build().await.unwrap();
    (engine, view)
}

/// Courier that answers from a per-chat script and records every send.
/// Chats without a script always deliver.
#[derive(Clone, Default)]
struct ScriptedCourier {
    inner: Arc<ScriptedInner>,
}

#[derive(Default)]
struct ScriptedInner {
    scripts: Mutex<HashMap<i64, VecDeque<DeliveryOutcome>>>,
    delivered: Mutex<Vec<i64>>,
}

impl ScriptedCourier {
    fn script(&self, chat_id: i64, outcome: DeliveryOutcome) {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .entry(chat_id)
            .or_default()
            .push_back(outcome);
    }

    fn delivered(&self) -> Vec<i64> {
        self.inner.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Courier for ScriptedCourier {
    async fn deliver(&self, _promotion: &Promotion, channel: &Channel) -> DeliveryOutcome {
        let scripted = self
            .inner
            .scripts
            .lock()
            .unwrap()
            .get_mut(&channel.chat_id)
            .and_then(VecDeque::pop_front);
        let outcome = scripted.unwrap_or(DeliveryOutcome::Delivered {
            reach_added: i64::from(channel.member_count),
        });
        if let DeliveryOutcome::Delivered { .. } = outcome {
            self.inner.delivered.lock().unwrap().push(channel.chat_id);
        }
        outcome
    }
}

fn broadcaster_for(engine: Engine, courier: ScriptedCourier) -> Broadcaster<ScriptedCourier> {
    Broadcaster::builder()
        .engine(engine)
        .courier(courier)
        .send_gap(Duration::ZERO)
        .instance("test-instance")
        .build()
        .unwrap()
}

async fn opted_in_channel(engine: &Engine, chat_id: i64, members: i32) -> Uuid {
    let id = engine
        .register_channel(chat_id, &format!("Channel {chat_id}"), None, members)
        .await
        .unwrap();
    engine.set_channel_revenue(id, true).await.unwrap();
    id
}

async fn sending_promotion(engine: &Engine) -> Uuid {
    let id = engine
        .create_promotion("Weekly digest", "Fresh bots in the catalog.", None, None, None)
        .await
        .unwrap();
    engine.launch_promotion(id).await.unwrap();
    id
}

#[tokio::test]
async fn full_delivery_marks_promotion_sent() {
    let (engine, view) = engine_pair().await;
    opted_in_channel(&engine, 100, 50).await;
    opted_in_channel(&engine, 200, 70).await;
    opted_in_channel(&engine, 300, 30).await;
    let promotion_id = sending_promotion(&engine).await;

    let courier = ScriptedCourier::default();
    let broadcaster = broadcaster_for(engine, courier.clone());
    broadcaster.run_cycle().await;

    let promotion = view.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.status, PromotionStatus::Sent);
    assert!(promotion.sent_at.is_some());
    assert_eq!(promotion.channel_count, 3);
    assert_eq!(promotion.processed_channels.len(), 3);
    assert_eq!(promotion.total_reach, 150);

    let mut delivered = courier.delivered();
    delivered.sort_unstable();
    assert_eq!(delivered, vec![100, 200, 300]);
}

#[tokio::test]
async fn unreachable_channel_is_retired_and_excluded() {
    let (engine, view) = engine_pair().await;
    let dead = opted_in_channel(&engine, 100, 50).await;
    let alive = opted_in_channel(&engine, 200, 70).await;
    let promotion_id = sending_promotion(&engine).await;

    let courier = ScriptedCourier::default();
    courier.script(
        100,
        DeliveryOutcome::Failed {
            fault: Fault::Unreachable,
            message: "Forbidden: bot was kicked from the channel chat".to_string(),
        },
    );
    let broadcaster = broadcaster_for(engine, courier.clone());
    broadcaster.run_cycle().await;

    // Coverage is computed against the shrunk eligible set.
    let promotion = view.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.status, PromotionStatus::Sent);
    assert_eq!(promotion.channel_count, 1);
    assert!(promotion.processed_channels.contains(&alive));
    assert!(!promotion.processed_channels.contains(&dead));
    assert_eq!(promotion.total_reach, 70);

    let retired = view.channel(dead).await.unwrap();
    assert!(!retired.revenue_enabled);
    let eligible = view.eligible_channels().await.unwrap();
    assert!(eligible.iter().all(|channel| channel.id != dead));
}

#[tokio::test]
async fn transient_failure_is_retried_next_cycle() {
    let (engine, view) = engine_pair().await;
    let flaky = opted_in_channel(&engine, 100, 50).await;
    opted_in_channel(&engine, 200, 70).await;
    let promotion_id = sending_promotion(&engine).await;

    let courier = ScriptedCourier::default();
    courier.script(
        100,
        DeliveryOutcome::Failed {
            fault: Fault::Transient,
            message: "Gateway Timeout".to_string(),
        },
    );
    let broadcaster = broadcaster_for(engine, courier.clone());

    broadcaster.run_cycle().await;
    let promotion = view.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.status, PromotionStatus::Sending);
    assert_eq!(promotion.channel_count, 1);
    assert_eq!(promotion.total_reach, 70);
    // Still eligible: transient failures do not retire the channel.
    let eligible = view.eligible_channels().await.unwrap();
    assert!(eligible.iter().any(|channel| channel.id == flaky));

    broadcaster.run_cycle().await;
    let promotion = view.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.status, PromotionStatus::Sent);
    assert_eq!(promotion.channel_count, 2);
    assert_eq!(promotion.total_reach, 120);
    // The channel covered in the first cycle was not sent to again.
    assert_eq!(courier.delivered(), vec![200, 100]);
}

#[tokio::test]
async fn zero_eligible_channels_is_a_noop() {
    let (engine, view) = engine_pair().await;
    let promotion_id = sending_promotion(&engine).await;

    let courier = ScriptedCourier::default();
    let broadcaster = broadcaster_for(engine, courier.clone());
    broadcaster.run_cycle().await;

    let promotion = view.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.status, PromotionStatus::Sending);
    assert_eq!(promotion.channel_count, 0);
    assert_eq!(promotion.total_reach, 0);
    assert!(courier.delivered().is_empty());
}

#[tokio::test]
async fn pending_promotions_are_not_broadcast() {
    let (engine, view) = engine_pair().await;
    opted_in_channel(&engine, 100, 50).await;
    let promotion_id = engine
        .create_promotion("Draft", "Not launched yet.", None, None, None)
        .await
        .unwrap();

    let courier = ScriptedCourier::default();
    let broadcaster = broadcaster_for(engine, courier.clone());
    broadcaster.run_cycle().await;

    let promotion = view.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.status, PromotionStatus::Pending);
    assert!(courier.delivered().is_empty());
}

#[tokio::test]
async fn campaign_claimed_by_another_instance_is_skipped() {
    let (engine, view) = engine_pair().await;
    opted_in_channel(&engine, 100, 50).await;
    let promotion_id = sending_promotion(&engine).await;
    let claimed = view
        .claim_promotion(promotion_id, "other-instance", chrono::Duration::minutes(10))
        .await
        .unwrap();
    assert!(claimed);

    let courier = ScriptedCourier::default();
    let broadcaster = broadcaster_for(engine, courier.clone());
    broadcaster.run_cycle().await;

    let promotion = view.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.status, PromotionStatus::Sending);
    assert!(courier.delivered().is_empty());
}

#[tokio::test]
async fn late_opt_in_does_not_reopen_a_finished_campaign() {
    let (engine, view) = engine_pair().await;
    opted_in_channel(&engine, 100, 50).await;
    let promotion_id = sending_promotion(&engine).await;

    let courier = ScriptedCourier::default();
    let broadcaster = broadcaster_for(engine, courier.clone());
    broadcaster.run_cycle().await;

    let promotion = view.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.status, PromotionStatus::Sent);

    opted_in_channel(&view, 200, 70).await;
    broadcaster.run_cycle().await;

    let promotion = view.promotion(promotion_id).await.unwrap();
    assert_eq!(promotion.status, PromotionStatus::Sent);
    assert_eq!(promotion.channel_count, 1);
    assert_eq!(courier.delivered(), vec![100]);
}
