use serde::{Deserialize, Serialize};

/// Structural thresholds applied after the word lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// Comment bodies shorter than this (after trimming) are rejected
    pub min_comment_chars: usize,
    /// Comment bodies longer than this are rejected
    pub max_comment_chars: usize,
    pub min_name_chars: usize,
    pub max_name_chars: usize,
    /// A run of this many identical characters counts as spam
    pub max_repeated_run: usize,
    /// Tokens shorter than this never count as shouting
    pub shout_min_token_chars: usize,
    /// Reject when the shouted share of tokens is strictly above this
    pub shout_ratio: f64,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            min_comment_chars: 3,
            max_comment_chars: 1000,
            min_name_chars: 2,
            max_name_chars: 50,
            max_repeated_run: 10,
            shout_min_token_chars: 3,
            shout_ratio: 0.7,
        }
    }
}
