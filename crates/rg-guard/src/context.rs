//! # RateLimiterContext
//!
//! Everything a limiter needs for one (review, client) pair, built by the
//! caller and handed in explicitly. There is no ambient global state.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rg_core::{AppError, ClientId, Clock, KeyValueStore, Limits, Result, ReviewId};

/// The kinds of record kept in durable client storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    CommentHistory,
    MainCommentMarker,
    ReplyMarker,
    VoteMarker,
}

impl RecordKind {
    fn prefix(self) -> &'static str {
        match self {
            RecordKind::CommentHistory => "comment_history",
            RecordKind::MainCommentMarker => "comment_main",
            RecordKind::ReplyMarker => "comment_reply",
            RecordKind::VoteMarker => "vote_cooldown",
        }
    }
}

#[derive(Clone)]
pub struct RateLimiterContext {
    review: ReviewId,
    client: ClientId,
    durable: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    limits: Limits,
}

impl fmt::Debug for RateLimiterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiterContext")
            .field("review", &self.review)
            .field("client", &self.client)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl RateLimiterContext {
    pub fn new(
        review: ReviewId,
        client: ClientId,
        durable: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        limits: Limits,
    ) -> Self {
        Self {
            review,
            client,
            durable,
            clock,
            limits,
        }
    }

    pub fn review(&self) -> &ReviewId {
        &self.review
    }

    pub fn client(&self) -> &ClientId {
        &self.client
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// `{kind}_{review}_{client}`, e.g. `comment_main_elden-ring_client_ab12...`.
    pub fn storage_key(&self, kind: RecordKind) -> String {
        format!("{}_{}_{}", kind.prefix(), self.review, self.client)
    }

    pub(crate) fn read_raw(&self, kind: RecordKind) -> Option<String> {
        self.durable.get(&self.storage_key(kind))
    }

    pub(crate) fn write_raw(&self, kind: RecordKind, value: &str) -> Result<()> {
        self.durable
            .set(&self.storage_key(kind), value)
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Reads an epoch-millisecond marker. Anything unparsable counts as absent.
    pub fn read_marker(&self, kind: RecordKind) -> Option<DateTime<Utc>> {
        let raw = self.read_raw(kind)?;
        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        if parsed.is_none() {
            tracing::warn!(key = %self.storage_key(kind), "ignoring malformed cooldown marker");
        }
        parsed
    }

    pub fn write_marker(&self, kind: RecordKind, at: DateTime<Utc>) -> Result<()> {
        self.write_raw(kind, &at.timestamp_millis().to_string())
    }

    pub fn clear_marker(&self, kind: RecordKind) -> Result<()> {
        self.durable
            .remove(&self.storage_key(kind))
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_core::testing::ManualClock;
    use rg_kv_memory::MemoryKvStore;

    fn ctx(store: Arc<MemoryKvStore>) -> RateLimiterContext {
        RateLimiterContext::new(
            ReviewId::new("hades-2"),
            ClientId::new("client_42"),
            store,
            Arc::new(ManualClock::at_epoch()),
            Limits::default(),
        )
    }

    #[test]
    fn test_keys_are_namespaced() {
        let ctx = ctx(Arc::new(MemoryKvStore::new()));
        assert_eq!(
            ctx.storage_key(RecordKind::CommentHistory),
            "comment_history_hades-2_client_42"
        );
        assert_eq!(ctx.storage_key(RecordKind::MainCommentMarker), "comment_main_hades-2_client_42");
        assert_eq!(ctx.storage_key(RecordKind::ReplyMarker), "comment_reply_hades-2_client_42");
        assert_eq!(ctx.storage_key(RecordKind::VoteMarker), "vote_cooldown_hades-2_client_42");
    }

    #[test]
    fn test_marker_round_trip_and_clear() {
        let store = Arc::new(MemoryKvStore::new());
        let ctx = ctx(store.clone());
        let at = ctx.now();

        ctx.write_marker(RecordKind::VoteMarker, at).unwrap();
        assert_eq!(
            store.get("vote_cooldown_hades-2_client_42"),
            Some(at.timestamp_millis().to_string())
        );
        assert_eq!(ctx.read_marker(RecordKind::VoteMarker), Some(at));

        ctx.clear_marker(RecordKind::VoteMarker).unwrap();
        assert!(ctx.read_marker(RecordKind::VoteMarker).is_none());
    }

    #[test]
    fn test_malformed_marker_reads_as_absent() {
        let store = Arc::new(MemoryKvStore::new());
        let ctx = ctx(store.clone());
        store.set("comment_main_hades-2_client_42", "yesterday").unwrap();
        assert!(ctx.read_marker(RecordKind::MainCommentMarker).is_none());
    }
}
