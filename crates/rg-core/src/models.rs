//! # Domain Models
//!
//! These structs represent the entities the anti-abuse layer reasons about.
//! Store-owned rows (`Comment`, `VoteRecord`) are validated at the port
//! boundary; everything else is local to one client.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pseudo-random identifier scoping one browser session's records.
/// Not a verified user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a review (the URL slug, e.g. "elden-ring").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(String);

impl ReviewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Top-level comment or reply. Each kind has its own cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Main,
    Reply,
}

impl CommentKind {
    pub fn from_is_reply(is_reply: bool) -> Self {
        if is_reply {
            CommentKind::Reply
        } else {
            CommentKind::Main
        }
    }

    pub fn is_reply(self) -> bool {
        matches!(self, CommentKind::Reply)
    }
}

impl fmt::Display for CommentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentKind::Main => f.write_str("comment"),
            CommentKind::Reply => f.write_str("reply"),
        }
    }
}

/// One successful submission, as persisted in the per-review history list.
///
/// The JSON shape is `{"timestamp": <epoch ms>, "isReply": bool}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isReply")]
    pub is_reply: bool,
}

/// Derived permission snapshot. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CooldownState {
    pub can_comment: bool,
    pub can_reply: bool,
    pub main_comment_remaining_ms: u64,
    pub reply_remaining_ms: u64,
    pub remaining_daily_comments: u32,
    pub daily_limit_reached: bool,
}

impl CooldownState {
    /// True while either countdown still has time left.
    pub fn is_cooling_down(&self) -> bool {
        self.main_comment_remaining_ms > 0 || self.reply_remaining_ms > 0
    }

    pub fn allows(&self, kind: CommentKind) -> bool {
        match kind {
            CommentKind::Main => self.can_comment,
            CommentKind::Reply => self.can_reply,
        }
    }

    pub fn remaining_ms(&self, kind: CommentKind) -> u64 {
        match kind {
            CommentKind::Main => self.main_comment_remaining_ms,
            CommentKind::Reply => self.reply_remaining_ms,
        }
    }
}

/// A like/dislike row owned by the external store.
/// Unique per (review_id, client_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: Uuid,
    pub review_id: ReviewId,
    pub client_id: ClientId,
    pub is_like: bool,
}

/// What a successful `cast_vote` did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoteOutcome {
    /// No prior vote existed; a new row was created.
    Recorded { is_like: bool },
    /// The opposite button was pressed; the row's polarity flipped.
    Updated { is_like: bool },
    /// The same button was pressed again; the row was deleted.
    Removed,
}

impl VoteOutcome {
    /// The client's vote after the mutation.
    pub fn current_vote(&self) -> Option<bool> {
        match self {
            VoteOutcome::Recorded { is_like } | VoteOutcome::Updated { is_like } => Some(*is_like),
            VoteOutcome::Removed => None,
        }
    }
}

/// Why the content filter turned a submission down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    Empty,
    TooShort { min: usize },
    TooLong { max: usize },
    InappropriateLanguage,
    ExcessiveRepetition,
    Shouting,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Empty => f.write_str("must not be empty"),
            RejectReason::TooShort { min } => {
                write!(f, "too short: at least {} characters required", min)
            }
            RejectReason::TooLong { max } => {
                write!(f, "too long: at most {} characters allowed", max)
            }
            RejectReason::InappropriateLanguage => {
                f.write_str("contains inappropriate language, please keep a respectful tone")
            }
            RejectReason::ExcessiveRepetition => {
                f.write_str("please avoid excessive repetition of characters")
            }
            RejectReason::Shouting => f.write_str("please avoid shouting in all caps"),
        }
    }
}

/// Transient result of a content-filter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterVerdict {
    pub is_valid: bool,
    pub reason: Option<RejectReason>,
}

impl FilterVerdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: RejectReason) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
        }
    }

    /// Converts a rejection into `AppError::Validation`.
    pub fn into_result(self) -> crate::Result<()> {
        match self.reason {
            Some(reason) if !self.is_valid => Err(crate::AppError::Validation(reason)),
            _ => Ok(()),
        }
    }
}

/// A comment row as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub review_id: ReviewId,
    pub author_name: String,
    pub content: String,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    /// `None` for top-level comments.
    pub parent_comment_id: Option<Uuid>,
}

/// Insert payload for `ReviewStore::insert_comment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub review_id: ReviewId,
    pub author_name: String,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
}

impl NewComment {
    pub fn kind(&self) -> CommentKind {
        CommentKind::from_is_reply(self.parent_comment_id.is_some())
    }
}

/// A comment with its replies nested beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadedComment {
    pub comment: Comment,
    pub replies: Vec<ThreadedComment>,
}

/// Aggregate counters for one review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub likes: u64,
    pub dislikes: u64,
    pub comments: u64,
    pub views: u64,
}

/// Site-wide totals across every review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GlobalStats {
    pub total_reviews: u64,
    pub total_likes: u64,
    pub total_views: u64,
    pub total_comments: u64,
}
