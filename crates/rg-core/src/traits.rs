//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be wired into the guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ClientId, Comment, NewComment, ReviewId, ReviewStats, VoteRecord};

/// Client-local key-value storage.
///
/// The same contract backs both scopes: durable storage (survives restarts,
/// holds comment history and cooldown markers) and session storage (cleared
/// when the session ends, holds the client identity).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Request/response contract for the hosted review/comment/vote store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReviewStore: Send + Sync {
    // Comment Operations
    async fn insert_comment(&self, comment: NewComment) -> anyhow::Result<Comment>;
    /// Oldest first.
    async fn list_comments(&self, review: &ReviewId) -> anyhow::Result<Vec<Comment>>;

    // Vote Operations
    async fn get_vote(&self, review: &ReviewId, client: &ClientId) -> anyhow::Result<Option<VoteRecord>>;
    async fn create_vote(&self, review: &ReviewId, client: &ClientId, is_like: bool) -> anyhow::Result<VoteRecord>;
    async fn update_vote(&self, vote_id: Uuid, is_like: bool) -> anyhow::Result<()>;
    async fn delete_vote(&self, vote_id: Uuid) -> anyhow::Result<()>;

    // Stats Operations
    async fn get_stats(&self, review: &ReviewId) -> anyhow::Result<ReviewStats>;
    /// Stats for every known review.
    async fn list_stats(&self) -> anyhow::Result<Vec<ReviewStats>>;
    async fn record_page_view(&self, review: &ReviewId, client: &ClientId) -> anyhow::Result<()>;
}

/// Source of "now" for every time-based decision.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
