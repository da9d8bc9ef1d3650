//! # rg-guard
//!
//! Client-side anti-abuse for one review page: who the client is, whether it
//! may comment, reply or vote right now, and the live counters it sees.
//!
//! Every piece takes its collaborators explicitly through a
//! [`RateLimiterContext`]; nothing here keeps global state or owns a timer
//! unless asked to ([`CountdownTicker`], [`StatsWatcher`]).

pub mod comments;
pub mod context;
pub mod identity;
pub mod limiter;
pub mod stats;
pub mod ticker;
pub mod votes;

pub use comments::{thread_comments, CommentService, SubmittedComment};
pub use context::{RateLimiterContext, RecordKind};
pub use identity::{get_or_create_client_id, CLIENT_ID_KEY};
pub use limiter::{format_remaining, CommentRateLimiter};
pub use stats::{global_stats, record_page_view, StatsWatcher, DEFAULT_POLL_INTERVAL};
pub use ticker::CountdownTicker;
pub use votes::VoteCooldownTracker;
