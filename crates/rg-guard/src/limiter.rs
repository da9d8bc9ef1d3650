//! # Comment Rate Limiter
//!
//! Two policies per (review, client):
//! - a fixed-point cooldown per kind (30 min for comments, 5 min for replies),
//!   measured from a single overwritten marker;
//! - a rolling 24h quota recomputed from the stored history.
//!
//! The limiter is advisory state. Callers gate the store call with
//! [`CommentRateLimiter::check`] and report success with
//! [`CommentRateLimiter::record_comment`] only after the store confirmed it.

use chrono::{DateTime, Duration, Utc};
use rg_core::{AppError, CommentKind, CommentRecord, CooldownState, Result};

use crate::context::{RateLimiterContext, RecordKind};

#[derive(Debug, Clone)]
pub struct CommentRateLimiter {
    ctx: RateLimiterContext,
}

impl CommentRateLimiter {
    pub fn new(ctx: RateLimiterContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RateLimiterContext {
        &self.ctx
    }

    /// History entries still inside the rolling window at `now`.
    ///
    /// Corrupted history reads as empty so a storage glitch never locks a
    /// client out.
    pub fn history(&self, now: DateTime<Utc>) -> Vec<CommentRecord> {
        let Some(raw) = self.ctx.read_raw(RecordKind::CommentHistory) else {
            return Vec::new();
        };
        let records: Vec<CommentRecord> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    key = %self.ctx.storage_key(RecordKind::CommentHistory),
                    "ignoring malformed comment history: {}",
                    e
                );
                return Vec::new();
            }
        };

        let cutoff = now
            .checked_sub_signed(self.ctx.limits().daily_window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        records.into_iter().filter(|r| r.timestamp > cutoff).collect()
    }

    /// Pure computation of the permission snapshot at `now`.
    pub fn compute_state(&self, now: DateTime<Utc>) -> CooldownState {
        let limits = self.ctx.limits();
        let count = self.history(now).len();
        let limit = limits.daily_comment_limit as usize;

        let daily_limit_reached = count >= limit;
        let remaining_daily_comments = limit.saturating_sub(count) as u32;

        let main_comment_remaining_ms = remaining_ms(
            self.ctx.read_marker(RecordKind::MainCommentMarker),
            limits.main_comment_cooldown(),
            now,
        );
        let reply_remaining_ms = remaining_ms(
            self.ctx.read_marker(RecordKind::ReplyMarker),
            limits.reply_cooldown(),
            now,
        );

        CooldownState {
            can_comment: !daily_limit_reached && main_comment_remaining_ms == 0,
            can_reply: !daily_limit_reached && reply_remaining_ms == 0,
            main_comment_remaining_ms,
            reply_remaining_ms,
            remaining_daily_comments,
            daily_limit_reached,
        }
    }

    /// Snapshot at the context clock's current time.
    pub fn state(&self) -> CooldownState {
        self.compute_state(self.ctx.now())
    }

    /// Gate to run before contacting the store.
    pub fn check(&self, kind: CommentKind) -> Result<CooldownState> {
        let state = self.state();
        if state.daily_limit_reached {
            return Err(AppError::DailyLimitReached {
                limit: self.ctx.limits().daily_comment_limit,
            });
        }
        if !state.allows(kind) {
            let remaining_ms = state.remaining_ms(kind);
            return Err(AppError::CommentCooldown {
                kind,
                remaining_ms,
                wait: format_remaining(remaining_ms as i64),
            });
        }
        Ok(state)
    }

    /// Commits a confirmed submission: overwrites the kind's marker, appends
    /// to history, and returns the recomputed state.
    ///
    /// The marker goes first. If the history write then fails the client is
    /// left cooling down with its quota untouched, never the reverse.
    pub fn record_comment(&self, kind: CommentKind) -> Result<CooldownState> {
        let now = self.ctx.now();

        let marker = match kind {
            CommentKind::Main => RecordKind::MainCommentMarker,
            CommentKind::Reply => RecordKind::ReplyMarker,
        };
        self.ctx.write_marker(marker, now)?;

        let mut history = self.history(now);
        history.push(CommentRecord {
            timestamp: now,
            is_reply: kind.is_reply(),
        });
        let encoded = serde_json::to_string(&history)
            .map_err(|e| AppError::Storage(format!("encoding comment history: {}", e)))?;
        self.ctx.write_raw(RecordKind::CommentHistory, &encoded)?;

        let state = self.compute_state(now);
        tracing::info!(
            review = %self.ctx.review(),
            %kind,
            remaining_daily = state.remaining_daily_comments,
            "comment recorded"
        );
        Ok(state)
    }

    pub fn main_comment_time_remaining(&self) -> String {
        format_remaining(self.state().main_comment_remaining_ms as i64)
    }

    pub fn reply_time_remaining(&self) -> String {
        format_remaining(self.state().reply_remaining_ms as i64)
    }
}

/// `window - elapsed`, clamped to `[0, window]`. A marker in the future
/// counts as just written.
fn remaining_ms(marker: Option<DateTime<Utc>>, window: Duration, now: DateTime<Utc>) -> u64 {
    let Some(at) = marker else {
        return 0;
    };
    let elapsed = (now - at).max(Duration::zero());
    let remaining = window - elapsed;
    u64::try_from(remaining.num_milliseconds()).unwrap_or(0)
}

/// Renders a countdown: `"12m 5s"`, `"45s"`, or `""` when nothing remains.
/// Partial seconds round up so the display never shows `0s` early.
pub fn format_remaining(ms: i64) -> String {
    if ms <= 0 {
        return String::new();
    }
    let total_secs = (ms - 1) / 1000 + 1;
    let minutes = total_secs / 60;
    let secs = total_secs % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rg_core::Clock;
    use rg_core::testing::{ManualClock, RefusingKvStore};
    use rg_core::{ClientId, KeyValueStore, Limits, ReviewId};
    use rg_kv_memory::MemoryKvStore;

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<MemoryKvStore>,
        limiter: CommentRateLimiter,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::at_epoch());
        let store = Arc::new(MemoryKvStore::new());
        let ctx = RateLimiterContext::new(
            ReviewId::new("celeste"),
            ClientId::new("client_a"),
            store.clone(),
            clock.clone(),
            Limits::default(),
        );
        Fixture {
            clock,
            store,
            limiter: CommentRateLimiter::new(ctx),
        }
    }

    #[test]
    fn test_fresh_client_can_do_everything() {
        let f = fixture();
        let state = f.limiter.state();
        assert!(state.can_comment && state.can_reply);
        assert_eq!(state.remaining_daily_comments, 10);
        assert!(!state.daily_limit_reached);
        assert!(!state.is_cooling_down());
    }

    #[test]
    fn test_main_comment_starts_thirty_minute_cooldown() {
        let f = fixture();
        let state = f.limiter.record_comment(CommentKind::Main).unwrap();

        assert!(!state.can_comment);
        assert!(state.can_reply);
        assert_eq!(state.main_comment_remaining_ms, 30 * 60 * 1000);
        assert_eq!(state.reply_remaining_ms, 0);
        assert_eq!(state.remaining_daily_comments, 9);
        assert_eq!(f.limiter.main_comment_time_remaining(), "30m 0s");
        assert_eq!(f.limiter.reply_time_remaining(), "");

        f.clock.advance(Duration::minutes(29) + Duration::seconds(30));
        assert_eq!(f.limiter.main_comment_time_remaining(), "30s");
        assert!(!f.limiter.state().can_comment);

        f.clock.advance(Duration::seconds(30));
        assert!(f.limiter.state().can_comment);
    }

    #[test]
    fn test_reply_cooldown_is_independent() {
        let f = fixture();
        f.limiter.record_comment(CommentKind::Reply).unwrap();
        let state = f.limiter.state();
        assert!(state.can_comment);
        assert!(!state.can_reply);
        assert_eq!(state.reply_remaining_ms, 5 * 60 * 1000);

        f.clock.advance(Duration::minutes(5));
        assert!(f.limiter.state().can_reply);
    }

    #[test]
    fn test_daily_limit_overrides_cooldowns() {
        let f = fixture();
        for i in 0..10 {
            let kind = if i % 2 == 0 { CommentKind::Main } else { CommentKind::Reply };
            f.limiter.record_comment(kind).unwrap();
            f.clock.advance(Duration::minutes(31));
        }

        let state = f.limiter.state();
        assert!(state.daily_limit_reached);
        assert_eq!(state.remaining_daily_comments, 0);
        assert!(!state.can_comment && !state.can_reply);
        assert_eq!(state.main_comment_remaining_ms, 0);
        assert!(matches!(
            f.limiter.check(CommentKind::Reply),
            Err(AppError::DailyLimitReached { limit: 10 })
        ));
    }

    #[test]
    fn test_old_records_leave_the_rolling_window() {
        let f = fixture();
        f.limiter.record_comment(CommentKind::Main).unwrap();
        f.clock.advance(Duration::hours(23));
        f.limiter.record_comment(CommentKind::Reply).unwrap();
        assert_eq!(f.limiter.state().remaining_daily_comments, 8);

        f.clock.advance(Duration::hours(1));
        // The first record is now exactly 24h old and no longer counts.
        assert_eq!(f.limiter.state().remaining_daily_comments, 9);
    }

    #[test]
    fn test_corrupted_history_fails_open() {
        let f = fixture();
        f.store.set("comment_history_celeste_client_a", "[{oops").unwrap();
        let state = f.limiter.state();
        assert_eq!(state.remaining_daily_comments, 10);
        assert!(state.can_comment);

        // The next record starts a fresh list.
        f.limiter.record_comment(CommentKind::Reply).unwrap();
        assert_eq!(f.limiter.state().remaining_daily_comments, 9);
    }

    #[test]
    fn test_history_is_persisted_as_json() {
        let f = fixture();
        f.limiter.record_comment(CommentKind::Reply).unwrap();
        let raw = f.store.get("comment_history_celeste_client_a").unwrap();
        let ms = f.clock.now().timestamp_millis();
        assert_eq!(raw, format!(r#"[{{"timestamp":{},"isReply":true}}]"#, ms));
        assert_eq!(
            f.store.get("comment_reply_celeste_client_a"),
            Some(ms.to_string())
        );
    }

    #[test]
    fn test_check_reports_remaining_wait() {
        let f = fixture();
        f.limiter.record_comment(CommentKind::Main).unwrap();
        f.clock.advance(Duration::minutes(10));

        match f.limiter.check(CommentKind::Main) {
            Err(AppError::CommentCooldown { kind, remaining_ms, wait }) => {
                assert_eq!(kind, CommentKind::Main);
                assert_eq!(remaining_ms, 20 * 60 * 1000);
                assert_eq!(wait, "20m 0s");
            }
            other => panic!("expected cooldown, got {:?}", other),
        }
        assert!(f.limiter.check(CommentKind::Reply).is_ok());
    }

    #[test]
    fn test_future_marker_is_clamped_to_window() {
        let f = fixture();
        let future = f.clock.now() + Duration::hours(2);
        f.store
            .set("comment_main_celeste_client_a", &future.timestamp_millis().to_string())
            .unwrap();
        assert_eq!(f.limiter.state().main_comment_remaining_ms, 30 * 60 * 1000);
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "");
        assert_eq!(format_remaining(-5), "");
        assert_eq!(format_remaining(1), "1s");
        assert_eq!(format_remaining(59_000), "59s");
        assert_eq!(format_remaining(59_001), "1m 0s");
        assert_eq!(format_remaining(60_000), "1m 0s");
        assert_eq!(format_remaining(5 * 60_000 + 30_000), "5m 30s");
        assert_eq!(format_remaining(30 * 60_000), "30m 0s");
    }

    #[test]
    fn test_format_remaining_at_i64_max() {
        let secs = i64::MAX / 1000 + 1;
        assert_eq!(
            format_remaining(i64::MAX),
            format!("{}m {}s", secs / 60, secs % 60)
        );
    }

    #[test]
    fn test_refused_marker_write_leaves_quota_untouched() {
        let clock = Arc::new(ManualClock::at_epoch());
        let store = Arc::new(RefusingKvStore::new("comment_main_"));
        let limiter = CommentRateLimiter::new(RateLimiterContext::new(
            ReviewId::new("celeste"),
            ClientId::new("client_a"),
            store.clone(),
            clock,
            Limits::default(),
        ));

        let err = limiter.record_comment(CommentKind::Main).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(store.get("comment_history_celeste_client_a").is_none());
        assert_eq!(limiter.state().remaining_daily_comments, 10);

        // Replies use a different key and still record normally.
        let state = limiter.record_comment(CommentKind::Reply).unwrap();
        assert_eq!(state.remaining_daily_comments, 9);
    }
}
