//! # Stats Adapter
//!
//! Polls aggregate counters for a review and republishes them on a `watch`
//! channel, plus a couple of one-shot read helpers.

use std::sync::Arc;
use std::time::Duration;

use rg_core::{AppError, ClientId, GlobalStats, Result, ReviewId, ReviewStats, ReviewStore};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct StatsWatcher {
    review: ReviewId,
    rx: watch::Receiver<ReviewStats>,
    refresh: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl StatsWatcher {
    /// Fetches right away, then once per `interval` and whenever
    /// [`refresh`](Self::refresh) is called. A failed fetch keeps the last
    /// published value.
    pub fn spawn(store: Arc<dyn ReviewStore>, review: ReviewId, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(ReviewStats::default());
        let refresh = Arc::new(Notify::new());

        let notify = refresh.clone();
        let task_review = review.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = notify.notified() => ticker.reset(),
                }

                match store.get_stats(&task_review).await {
                    Ok(stats) => {
                        tracing::debug!(review = %task_review, ?stats, "stats refreshed");
                        tx.send_replace(stats);
                    }
                    Err(e) => {
                        tracing::warn!(review = %task_review, "stats refresh failed, keeping last value: {:#}", e);
                    }
                }
            }
        });

        Self {
            review,
            rx,
            refresh,
            handle,
        }
    }

    pub fn review(&self) -> &ReviewId {
        &self.review
    }

    pub fn subscribe(&self) -> watch::Receiver<ReviewStats> {
        self.rx.clone()
    }

    pub fn current(&self) -> ReviewStats {
        *self.rx.borrow()
    }

    /// Asks for an out-of-band fetch, e.g. right after a vote or comment.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }
}

impl Drop for StatsWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Site-wide totals across every review the store knows.
pub async fn global_stats(store: &dyn ReviewStore) -> Result<GlobalStats> {
    let all = store
        .list_stats()
        .await
        .map_err(|e| AppError::Store(format!("listing stats: {}", e)))?;

    Ok(all.iter().fold(
        GlobalStats {
            total_reviews: all.len() as u64,
            ..GlobalStats::default()
        },
        |mut acc, s| {
            acc.total_likes += s.likes;
            acc.total_views += s.views;
            acc.total_comments += s.comments;
            acc
        },
    ))
}

pub async fn record_page_view(
    store: &dyn ReviewStore,
    review: &ReviewId,
    client: &ClientId,
) -> Result<()> {
    store.record_page_view(review, client).await.map_err(|e| {
        tracing::warn!(%review, "page view not recorded: {:#}", e);
        AppError::Store(format!("recording page view: {}", e))
    })
}
