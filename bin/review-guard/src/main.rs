//! # Review-Guard Binary
//!
//! Wires the plugins to the guard for a single local client, keeps the
//! stats of every configured review fresh, and accepts commands on stdin
//! until Ctrl-C.

mod console;
mod settings;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rg_core::{Clock, KeyValueStore, ReviewId, ReviewStore, SystemClock};
use rg_db_sqlite::SqliteReviewStore;
use rg_filter::ContentFilter;
use rg_guard::{
    get_or_create_client_id, global_stats, record_page_view, CommentRateLimiter, CommentService,
    RateLimiterContext, StatsWatcher, VoteCooldownTracker,
};
use rg_kv_file::FileKvStore;
use rg_kv_memory::MemoryKvStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use console::{Command, Console, ReviewPage};
use settings::Settings;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::load()?;
    init_tracing(settings.log_json);

    // 1. Review store
    let sqlite = SqliteReviewStore::connect(&settings.database_url)
        .await
        .with_context(|| format!("opening {}", settings.database_url))?;
    for seed in &settings.reviews {
        if sqlite.ensure_review(&ReviewId::new(&seed.slug), &seed.title).await? {
            tracing::info!(review = %seed.slug, "seeded review");
        }
    }
    let store: Arc<dyn ReviewStore> = Arc::new(sqlite);

    // 2. Client storage and identity
    let durable: Arc<dyn KeyValueStore> = Arc::new(FileKvStore::open(&settings.client_storage_path)?);
    let session = MemoryKvStore::new();
    let client = get_or_create_client_id(&session);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 3. Content filter
    let filter = Arc::new(
        ContentFilter::builder()
            .rules(settings.filter.clone())
            .extra_terms(settings.extra_banned_terms.iter())
            .extra_patterns(settings.extra_patterns.iter())
            .build()?,
    );

    // 4. One page per review
    let poll = Duration::from_secs(settings.stats_poll_secs.max(1));
    let mut pages = HashMap::new();
    let mut watchers = Vec::new();
    for seed in &settings.reviews {
        let review = ReviewId::new(&seed.slug);
        if let Err(e) = record_page_view(store.as_ref(), &review, &client).await {
            tracing::warn!(%review, "{}", e);
        }

        let ctx = RateLimiterContext::new(
            review.clone(),
            client.clone(),
            durable.clone(),
            clock.clone(),
            settings.limits.clone(),
        );
        let limiter = CommentRateLimiter::new(ctx.clone());
        let state = limiter.state();
        tracing::info!(
            %review,
            can_comment = state.can_comment,
            can_reply = state.can_reply,
            remaining_daily = state.remaining_daily_comments,
            "comment state"
        );

        pages.insert(
            review.clone(),
            ReviewPage {
                comments: CommentService::new(filter.clone(), limiter, store.clone()),
                votes: VoteCooldownTracker::new(ctx, store.clone()),
            },
        );
        watchers.push(StatsWatcher::spawn(store.clone(), review, poll));
    }

    for watcher in &watchers {
        let mut rx = watcher.subscribe();
        let review = watcher.review().clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let stats = *rx.borrow_and_update();
                tracing::info!(
                    %review,
                    likes = stats.likes,
                    dislikes = stats.dislikes,
                    comments = stats.comments,
                    views = stats.views,
                    "stats"
                );
            }
        });
    }

    let totals = global_stats(store.as_ref()).await?;
    tracing::info!(client = %client, ?totals, "review-guard ready");

    let console = Console {
        store: store.clone(),
        pages,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = Command::parse(&line) else {
                    tracing::warn!("unrecognized command: {}", line.trim());
                    continue;
                };
                let refresh = match &command {
                    Command::Comment { review, .. } | Command::Vote { review, .. } => Some(review.clone()),
                    _ => None,
                };
                match console.execute(command).await {
                    Ok(out) => println!("{}", out.trim_end()),
                    Err(e) => println!("rejected: {}", e),
                }
                if let Some(review) = refresh {
                    if let Some(w) = watchers.iter().find(|w| *w.review() == review) {
                        w.refresh();
                    }
                }
            }
        }
    }

    tracing::info!("shutting down");
    drop(watchers);
    Ok(())
}
