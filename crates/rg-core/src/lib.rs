//! review-guard/crates/rg-core/src/lib.rs
//!
//! The central domain types and collaborator interfaces for review-guard.

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exporting for easier access in other crates
pub use config::*;
pub use error::*;
pub use models::*;
pub use traits::*;
