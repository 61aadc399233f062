//! Promotion broadcast engine.
//!
//! A periodic sweep over the campaigns in the `sending` state: each cycle
//! claims a campaign, delivers it to every eligible channel it has not
//! reached yet, records progress after each confirmed send, and finalizes the
//! campaign once the eligible set is fully covered. Failures never escape a
//! cycle; the next tick always proceeds.

use std::time::Duration;

use engine::Engine;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

pub use courier::{Courier, DeliveryOutcome, TelegramCourier};
pub use classify::{Fault, classify};

mod classify;
mod courier;
mod cycle;
mod throttle;

const DEFAULT_PERIOD: Duration = Duration::from_secs(30);
const DEFAULT_SEND_GAP: Duration = Duration::from_millis(500);
/// How long a campaign claim is honored before another instance may take it
/// over. Far above any plausible cycle duration.
const CLAIM_LEASE_MINUTES: i64 = 10;

pub struct Broadcaster<C> {
    engine: Engine,
    courier: C,
    period: Duration,
    send_gap: Duration,
    instance: String,
}

impl<C: Courier> Broadcaster<C> {
    pub fn builder() -> BroadcasterBuilder<C> {
        BroadcasterBuilder::default()
    }

    /// Tick forever on the configured period.
    ///
    /// The loop body is strictly serial, and a tick that lands while a cycle
    /// is still executing is skipped, not queued: there is never more than one
    /// cycle in flight.
    pub async fn run(self) {
        tracing::info!(
            period = ?self.period,
            instance = %self.instance,
            "Starting promotion broadcaster..."
        );

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// Execute one dispatch cycle. Never fails: every error is logged and
    /// confined to the campaign it hit.
    pub async fn run_cycle(&self) {
        let mut gate = throttle::SendGate::new(self.send_gap);
        let lease = chrono::Duration::minutes(CLAIM_LEASE_MINUTES);
        cycle::run(&self.engine, &self.courier, &mut gate, &self.instance, lease).await;
    }
}

/// The builder for `Broadcaster`
pub struct BroadcasterBuilder<C> {
    engine: Option<Engine>,
    courier: Option<C>,
    period: Duration,
    send_gap: Duration,
    instance: Option<String>,
}

impl<C> Default for BroadcasterBuilder<C> {
    fn default() -> Self {
        Self {
            engine: None,
            courier: None,
            period: DEFAULT_PERIOD,
            send_gap: DEFAULT_SEND_GAP,
            instance: None,
        }
    }
}

impl<C: Courier> BroadcasterBuilder<C> {
    /// Pass the required store accessor.
    pub fn engine(mut self, engine: Engine) -> BroadcasterBuilder<C> {
        self.engine = Some(engine);
        self
    }

    /// Pass the required delivery courier.
    pub fn courier(mut self, courier: C) -> BroadcasterBuilder<C> {
        self.courier = Some(courier);
        self
    }

    /// Time between dispatch cycles.
    pub fn period(mut self, period: Duration) -> BroadcasterBuilder<C> {
        self.period = period;
        self
    }

    /// Minimum spacing between consecutive sends within a cycle.
    pub fn send_gap(mut self, send_gap: Duration) -> BroadcasterBuilder<C> {
        self.send_gap = send_gap;
        self
    }

    /// Name this instance signs campaign claims with.
    pub fn instance(mut self, instance: &str) -> BroadcasterBuilder<C> {
        self.instance = Some(instance.to_string());
        self
    }

    /// Construct `Broadcaster`
    pub fn build(self) -> Result<Broadcaster<C>, String> {
        let engine = self.engine.ok_or("broadcaster requires an engine")?;
        let courier = self.courier.ok_or("broadcaster requires a courier")?;
        let instance = self
            .instance
            .unwrap_or_else(|| format!("broadcaster-{}", Uuid::new_v4()));

        Ok(Broadcaster {
            engine,
            courier,
            period: self.period,
            send_gap: self.send_gap,
            instance,
        })
    }
}
