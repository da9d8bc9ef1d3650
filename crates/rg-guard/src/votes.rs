//! # Vote Cooldown Tracker
//!
//! Gates the like/dislike toggle for one (review, client). Creating or
//! flipping a vote starts a 4h cooldown; retracting a vote with the same
//! button is always allowed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rg_core::{AppError, Result, ReviewStore, VoteOutcome, VoteRecord};

use crate::context::{RateLimiterContext, RecordKind};

pub struct VoteCooldownTracker {
    ctx: RateLimiterContext,
    store: Arc<dyn ReviewStore>,
    in_flight: AtomicBool,
}

/// Releases the in-flight flag however `cast_vote` exits.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl VoteCooldownTracker {
    pub fn new(ctx: RateLimiterContext, store: Arc<dyn ReviewStore>) -> Self {
        Self {
            ctx,
            store,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &RateLimiterContext {
        &self.ctx
    }

    /// The client's current vote on this review, `None` if it never voted.
    pub async fn get_user_vote(&self) -> Result<Option<bool>> {
        Ok(self.existing_vote().await?.map(|v| v.is_like))
    }

    pub fn can_vote(&self) -> bool {
        self.can_vote_at(self.ctx.now())
    }

    pub fn can_vote_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_ms_at(now) == 0
    }

    /// Whole minutes left, rounded up; 0 once the cooldown has expired.
    pub fn remaining_cooldown_minutes(&self) -> u64 {
        let ms = self.remaining_ms_at(self.ctx.now());
        ms.div_ceil(60_000)
    }

    fn remaining_ms_at(&self, now: DateTime<Utc>) -> u64 {
        let Some(at) = self.ctx.read_marker(RecordKind::VoteMarker) else {
            return 0;
        };
        let elapsed = (now - at).max(Duration::zero());
        let remaining = self.ctx.limits().vote_cooldown() - elapsed;
        u64::try_from(remaining.num_milliseconds()).unwrap_or(0)
    }

    /// Toggles the client's vote.
    ///
    /// - no vote yet: create it and start the cooldown;
    /// - same polarity: delete it (retraction);
    /// - opposite polarity: flip it and restart the cooldown.
    ///
    /// Create and flip are refused while the cooldown runs. The marker only
    /// moves after the store acknowledged the mutation.
    pub async fn cast_vote(&self, is_like: bool) -> Result<VoteOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AppError::VoteInFlight);
        }
        let _guard = InFlight(&self.in_flight);

        let existing = self.existing_vote().await?;

        match existing {
            Some(vote) if vote.is_like == is_like => self.retract(vote).await,
            other => {
                if !self.can_vote() {
                    let remaining = self.remaining_cooldown_minutes();
                    tracing::debug!(
                        review = %self.ctx.review(),
                        remaining_minutes = remaining,
                        "vote refused during cooldown"
                    );
                    return Err(AppError::vote_cooldown(remaining));
                }
                match other {
                    None => self.create(is_like).await,
                    Some(vote) => self.flip(vote, is_like).await,
                }
            }
        }
    }

    async fn existing_vote(&self) -> Result<Option<VoteRecord>> {
        self.store
            .get_vote(self.ctx.review(), self.ctx.client())
            .await
            .map_err(|e| self.store_error("reading vote", e))
    }

    async fn create(&self, is_like: bool) -> Result<VoteOutcome> {
        self.store
            .create_vote(self.ctx.review(), self.ctx.client(), is_like)
            .await
            .map_err(|e| self.store_error("creating vote", e))?;
        self.start_cooldown();
        tracing::info!(review = %self.ctx.review(), is_like, "vote recorded");
        Ok(VoteOutcome::Recorded { is_like })
    }

    async fn flip(&self, vote: VoteRecord, is_like: bool) -> Result<VoteOutcome> {
        self.store
            .update_vote(vote.id, is_like)
            .await
            .map_err(|e| self.store_error("updating vote", e))?;
        self.start_cooldown();
        tracing::info!(review = %self.ctx.review(), is_like, "vote updated");
        Ok(VoteOutcome::Updated { is_like })
    }

    async fn retract(&self, vote: VoteRecord) -> Result<VoteOutcome> {
        self.store
            .delete_vote(vote.id)
            .await
            .map_err(|e| self.store_error("deleting vote", e))?;
        if self.ctx.limits().retraction_clears_vote_cooldown {
            if let Err(e) = self.ctx.clear_marker(RecordKind::VoteMarker) {
                tracing::warn!(review = %self.ctx.review(), "vote removed but cooldown not cleared: {}", e);
            }
        }
        tracing::info!(review = %self.ctx.review(), "vote removed");
        Ok(VoteOutcome::Removed)
    }

    /// Runs after the store acknowledged the vote, so a failed local write
    /// is logged rather than returned.
    fn start_cooldown(&self) {
        if let Err(e) = self.ctx.write_marker(RecordKind::VoteMarker, self.ctx.now()) {
            tracing::warn!(review = %self.ctx.review(), "vote stored but cooldown not recorded: {}", e);
        }
    }

    fn store_error(&self, action: &str, e: anyhow::Error) -> AppError {
        tracing::error!(review = %self.ctx.review(), "{} failed: {:#}", action, e);
        AppError::Store(format!("{}: {}", action, e))
    }
}
