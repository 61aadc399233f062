//! Spacing between outbound sends.

use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum gap between consecutive sends so the broadcaster stays
/// under Telegram's flood-control thresholds. Suspends, never drops: every
/// caller eventually proceeds.
pub(crate) struct SendGate {
    gap: Duration,
    last_send: Option<Instant>,
}

impl SendGate {
    pub(crate) fn new(gap: Duration) -> Self {
        Self {
            gap,
            last_send: None,
        }
    }

    /// Wait until at least `gap` has passed since the previous send.
    pub(crate) async fn wait(&mut self) {
        if let Some(last) = self.last_send {
            tokio::time::sleep_until(last + self.gap).await;
        }
        self.last_send = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_send_is_not_delayed() {
        let mut gate = SendGate::new(Duration::from_millis(500));
        let begin = Instant::now();
        gate.wait().await;
        assert_eq!(begin.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_sends_are_spaced() {
        let mut gate = SendGate::new(Duration::from_millis(500));
        let begin = Instant::now();
        gate.wait().await;
        gate.wait().await;
        gate.wait().await;
        assert!(begin.elapsed() >= Duration::from_millis(1000));
    }
}
