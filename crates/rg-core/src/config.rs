//! # Limits
//!
//! Tunable windows and quotas for the comment limiter and vote tracker.
//! Deserializable so the binary can override any field from settings.

use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Minimum gap between two top-level comments on one review
    pub main_comment_cooldown_secs: u64,
    /// Minimum gap between two replies on one review
    pub reply_cooldown_secs: u64,
    /// Max comments + replies per review inside the rolling window
    pub daily_comment_limit: u32,
    /// Length of the rolling quota window
    pub daily_window_secs: u64,
    /// Minimum gap before a created/changed vote may be changed again
    pub vote_cooldown_secs: u64,
    /// Whether retracting a vote clears the vote cooldown marker
    pub retraction_clears_vote_cooldown: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            main_comment_cooldown_secs: 30 * 60,
            reply_cooldown_secs: 5 * 60,
            daily_comment_limit: 10,
            daily_window_secs: 24 * 60 * 60,
            vote_cooldown_secs: 4 * 60 * 60,
            retraction_clears_vote_cooldown: true,
        }
    }
}

impl Limits {
    pub fn main_comment_cooldown(&self) -> Duration {
        secs(self.main_comment_cooldown_secs)
    }

    pub fn reply_cooldown(&self) -> Duration {
        secs(self.reply_cooldown_secs)
    }

    pub fn daily_window(&self) -> Duration {
        secs(self.daily_window_secs)
    }

    pub fn vote_cooldown(&self) -> Duration {
        secs(self.vote_cooldown_secs)
    }
}

fn secs(value: u64) -> Duration {
    let value = i64::try_from(value).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    Duration::seconds(value)
}
