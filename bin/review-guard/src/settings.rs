//! Runtime settings: `review-guard.toml` (optional) overlaid with
//! `REVIEW_GUARD__*` environment variables, e.g.
//! `REVIEW_GUARD__LIMITS__DAILY_COMMENT_LIMIT=5`.

use std::path::PathBuf;

use config::{Config, Environment, File};
use rg_core::{AppError, Limits, Result};
use rg_filter::FilterRules;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSeed {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    /// Durable client storage (comment history, cooldown markers).
    pub client_storage_path: PathBuf,
    pub stats_poll_secs: u64,
    pub log_json: bool,
    pub reviews: Vec<ReviewSeed>,
    pub limits: Limits,
    pub filter: FilterRules,
    pub extra_banned_terms: Vec<String>,
    pub extra_patterns: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:review-guard.db".into(),
            client_storage_path: PathBuf::from("./data/client-storage.json"),
            stats_poll_secs: 30,
            log_json: false,
            reviews: vec![
                ReviewSeed {
                    slug: "elden-ring".into(),
                    title: "Elden Ring".into(),
                },
                ReviewSeed {
                    slug: "hollow-knight".into(),
                    title: "Hollow Knight".into(),
                },
            ],
            limits: Limits::default(),
            filter: FilterRules::default(),
            extra_banned_terms: Vec::new(),
            extra_patterns: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(File::with_name("review-guard").required(false))
            .add_source(
                Environment::with_prefix("REVIEW_GUARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AppError::Config(e.to_string()))
    }
}
