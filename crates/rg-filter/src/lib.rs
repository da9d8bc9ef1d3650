//! # rg-filter
//!
//! Client-side content moderation for comment bodies and author names.
//! Word lists and obfuscation patterns are data; see [`ContentFilterBuilder`]
//! to replace or extend them.

mod filter;
pub mod lists;
mod patterns;
mod rules;
mod sanitize;

pub use filter::{ContentFilter, ContentFilterBuilder};
pub use patterns::PatternSet;
pub use rules::FilterRules;
pub use sanitize::sanitize_content;

use once_cell::sync::Lazy;
use rg_core::FilterVerdict;

static DEFAULT_FILTER: Lazy<ContentFilter> = Lazy::new(ContentFilter::default);

/// Validates a comment body against the built-in lists and rules.
pub fn validate_comment_content(text: &str) -> FilterVerdict {
    DEFAULT_FILTER.validate_comment_content(text)
}

/// Validates an author display name against the built-in lists and rules.
pub fn validate_author_name(name: &str) -> FilterVerdict {
    DEFAULT_FILTER.validate_author_name(name)
}
