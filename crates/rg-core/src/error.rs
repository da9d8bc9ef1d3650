//! # AppError
//!
//! Centralized error handling for the review-guard ecosystem.
//! Maps filter, cooldown and collaborator failures to actionable error types.

use thiserror::Error;

use crate::models::{CommentKind, RejectReason};

/// The primary error type for all review-guard operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Review, Vote)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Content filter rejection (e.g., banned language, shouting)
    #[error("validation error: {0}")]
    Validation(RejectReason),

    /// The per-kind comment cooldown has not elapsed yet
    #[error("{kind} cooldown active, try again in {wait}")]
    CommentCooldown {
        kind: CommentKind,
        remaining_ms: u64,
        wait: String,
    },

    /// Rolling 24h quota exhausted for this review
    #[error("daily limit of {limit} comments reached for this review")]
    DailyLimitReached { limit: u32 },

    /// A vote was created or changed too recently
    #[error("vote cooldown active, you can change your vote in {hours}h {minutes}min")]
    VoteCooldown {
        remaining_minutes: u64,
        hours: u64,
        minutes: u64,
    },

    /// A previous vote mutation for this client is still pending
    #[error("a vote is already being submitted")]
    VoteInFlight,

    /// The external review store failed (e.g., network or backend error)
    #[error("store request failed: {0}")]
    Store(String),

    /// Client-local key-value storage failed to persist a write
    #[error("client storage error: {0}")]
    Storage(String),

    /// Invalid settings or filter pattern
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn vote_cooldown(remaining_minutes: u64) -> Self {
        AppError::VoteCooldown {
            remaining_minutes,
            hours: remaining_minutes / 60,
            minutes: remaining_minutes % 60,
        }
    }

    /// Store failures may succeed on retry; rejections never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(_))
    }
}

/// A specialized Result type for review-guard logic.
pub type Result<T> = std::result::Result<T, AppError>;
