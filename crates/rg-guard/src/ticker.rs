//! Once-per-second countdown refresh for a [`CommentRateLimiter`].

use std::time::Duration;

use rg_core::CooldownState;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::limiter::CommentRateLimiter;

/// Background task that republishes the limiter state every period while a
/// cooldown is running. It exits on its own once both countdowns hit zero
/// and is aborted when dropped.
pub struct CountdownTicker {
    rx: watch::Receiver<CooldownState>,
    handle: JoinHandle<()>,
}

impl CountdownTicker {
    pub fn spawn(limiter: CommentRateLimiter) -> Self {
        Self::with_period(limiter, Duration::from_secs(1))
    }

    pub fn with_period(limiter: CommentRateLimiter, period: Duration) -> Self {
        let initial = limiter.state();
        let (tx, rx) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            if !initial.is_cooling_down() {
                return;
            }
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                let state = limiter.state();
                let done = !state.is_cooling_down();
                if tx.send(state).is_err() {
                    break;
                }
                if done {
                    tracing::debug!(review = %limiter.context().review(), "cooldowns expired, ticker stopping");
                    break;
                }
            }
        });

        Self { rx, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<CooldownState> {
        self.rx.clone()
    }

    /// Latest published state.
    pub fn current(&self) -> CooldownState {
        *self.rx.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
