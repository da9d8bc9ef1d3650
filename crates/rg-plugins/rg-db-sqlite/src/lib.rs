//! # rg-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rg-core` domain models.
//!
//! Reviews are keyed by slug. Counters are not stored; `get_stats` counts
//! the rows of `review_likes`, `comments` and `page_views` on every call.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rg_core::error::AppError;
use rg_core::models::{ClientId, Comment, NewComment, ReviewId, ReviewStats, VoteRecord};
use rg_core::traits::ReviewStore;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS reviews (
        slug TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        review_id TEXT NOT NULL REFERENCES reviews(slug) ON DELETE CASCADE,
        author_name TEXT NOT NULL,
        content TEXT NOT NULL,
        likes_count INTEGER NOT NULL DEFAULT 0,
        created_at_ms INTEGER NOT NULL,
        parent_comment_id TEXT REFERENCES comments(id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS idx_comments_review ON comments (review_id, created_at_ms)",
    "CREATE TABLE IF NOT EXISTS review_likes (
        id TEXT PRIMARY KEY,
        review_id TEXT NOT NULL REFERENCES reviews(slug) ON DELETE CASCADE,
        user_session TEXT NOT NULL,
        is_like BOOLEAN NOT NULL,
        created_at_ms INTEGER NOT NULL,
        UNIQUE (review_id, user_session)
    )",
    "CREATE TABLE IF NOT EXISTS page_views (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        review_id TEXT NOT NULL REFERENCES reviews(slug) ON DELETE CASCADE,
        user_session TEXT NOT NULL,
        viewed_at_ms INTEGER NOT NULL
    )",
];

const STATS_SELECT: &str = "SELECT r.slug,
    (SELECT COUNT(*) FROM review_likes l WHERE l.review_id = r.slug AND l.is_like = 1) AS likes,
    (SELECT COUNT(*) FROM review_likes l WHERE l.review_id = r.slug AND l.is_like = 0) AS dislikes,
    (SELECT COUNT(*) FROM comments c WHERE c.review_id = r.slug) AS comments,
    (SELECT COUNT(*) FROM page_views v WHERE v.review_id = r.slug) AS views
    FROM reviews r";

pub struct SqliteReviewStore {
    pool: SqlitePool,
}

// Helpers for UUID / timestamp conversion
fn parse_uuid(raw: &str) -> anyhow::Result<Uuid> {
    Ok(Uuid::parse_str(raw)?)
}

fn from_millis(ms: i64) -> anyhow::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {}", ms))
}

fn count(row: &SqliteRow, column: &str) -> anyhow::Result<u64> {
    Ok(u64::try_from(row.try_get::<i64, _>(column)?)?)
}

fn row_to_comment(row: SqliteRow) -> anyhow::Result<Comment> {
    let parent: Option<String> = row.try_get("parent_comment_id")?;
    Ok(Comment {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        review_id: ReviewId::new(row.try_get::<String, _>("review_id")?),
        author_name: row.try_get("author_name")?,
        content: row.try_get("content")?,
        likes_count: row.try_get("likes_count")?,
        created_at: from_millis(row.try_get("created_at_ms")?)?,
        parent_comment_id: parent.as_deref().map(parse_uuid).transpose()?,
    })
}

fn row_to_stats(row: &SqliteRow) -> anyhow::Result<ReviewStats> {
    Ok(ReviewStats {
        likes: count(row, "likes")?,
        dislikes: count(row, "dislikes")?,
        comments: count(row, "comments")?,
        views: count(row, "views")?,
    })
}

impl SqliteReviewStore {
    /// Opens (or creates) the database at `url` and applies the schema.
    /// `sqlite::memory:` gives a private in-process database.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every in-memory connection is its own database, so keep exactly one
        // alive for the lifetime of the pool.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(url, "sqlite review store ready");
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Registers a review if it is not known yet. Returns `true` if it was
    /// inserted.
    pub async fn ensure_review(&self, review: &ReviewId, title: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO reviews (slug, title, created_at_ms) VALUES (?, ?, ?) ON CONFLICT (slug) DO NOTHING",
        )
        .bind(review.as_str())
        .bind(title)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn require_review(&self, review: &ReviewId) -> anyhow::Result<()> {
        let exists = sqlx::query("SELECT 1 FROM reviews WHERE slug = ?")
            .bind(review.as_str())
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if !exists {
            return Err(AppError::NotFound("Review".into(), review.to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for SqliteReviewStore {
    async fn insert_comment(&self, comment: NewComment) -> anyhow::Result<Comment> {
        self.require_review(&comment.review_id).await?;

        let stored = Comment {
            id: Uuid::new_v4(),
            review_id: comment.review_id,
            author_name: comment.author_name,
            content: comment.content,
            likes_count: 0,
            created_at: Utc::now(),
            parent_comment_id: comment.parent_comment_id,
        };

        sqlx::query(
            "INSERT INTO comments (id, review_id, author_name, content, likes_count, created_at_ms, parent_comment_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(stored.id.to_string())
        .bind(stored.review_id.as_str())
        .bind(&stored.author_name)
        .bind(&stored.content)
        .bind(stored.likes_count)
        .bind(stored.created_at.timestamp_millis())
        .bind(stored.parent_comment_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn list_comments(&self, review: &ReviewId) -> anyhow::Result<Vec<Comment>> {
        sqlx::query(
            "SELECT * FROM comments WHERE review_id = ? ORDER BY created_at_ms ASC, rowid ASC",
        )
        .bind(review.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(row_to_comment)
        .collect()
    }

    async fn get_vote(
        &self,
        review: &ReviewId,
        client: &ClientId,
    ) -> anyhow::Result<Option<VoteRecord>> {
        let row = sqlx::query(
            "SELECT id, is_like FROM review_likes WHERE review_id = ? AND user_session = ?",
        )
        .bind(review.as_str())
        .bind(client.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(VoteRecord {
                id: parse_uuid(&row.try_get::<String, _>("id")?)?,
                review_id: review.clone(),
                client_id: client.clone(),
                is_like: row.try_get("is_like")?,
            })),
            None => Ok(None),
        }
    }

    async fn create_vote(
        &self,
        review: &ReviewId,
        client: &ClientId,
        is_like: bool,
    ) -> anyhow::Result<VoteRecord> {
        self.require_review(review).await?;

        let vote = VoteRecord {
            id: Uuid::new_v4(),
            review_id: review.clone(),
            client_id: client.clone(),
            is_like,
        };
        sqlx::query(
            "INSERT INTO review_likes (id, review_id, user_session, is_like, created_at_ms) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(vote.id.to_string())
        .bind(review.as_str())
        .bind(client.as_str())
        .bind(is_like)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(vote)
    }

    async fn update_vote(&self, vote_id: Uuid, is_like: bool) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE review_likes SET is_like = ? WHERE id = ?")
            .bind(is_like)
            .bind(vote_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Vote".into(), vote_id.to_string()).into());
        }
        Ok(())
    }

    async fn delete_vote(&self, vote_id: Uuid) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM review_likes WHERE id = ?")
            .bind(vote_id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Vote".into(), vote_id.to_string()).into());
        }
        Ok(())
    }

    async fn get_stats(&self, review: &ReviewId) -> anyhow::Result<ReviewStats> {
        let row = sqlx::query(&format!("{} WHERE r.slug = ?", STATS_SELECT))
            .bind(review.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => row_to_stats(&row),
            None => Err(AppError::NotFound("Review".into(), review.to_string()).into()),
        }
    }

    async fn list_stats(&self) -> anyhow::Result<Vec<ReviewStats>> {
        sqlx::query(&format!("{} ORDER BY r.slug", STATS_SELECT))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_stats)
            .collect()
    }

    async fn record_page_view(&self, review: &ReviewId, client: &ClientId) -> anyhow::Result<()> {
        self.require_review(review).await?;
        sqlx::query("INSERT INTO page_views (review_id, user_session, viewed_at_ms) VALUES (?, ?, ?)")
            .bind(review.as_str())
            .bind(client.as_str())
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(reviews: &[&str]) -> SqliteReviewStore {
        let store = SqliteReviewStore::connect("sqlite::memory:").await.unwrap();
        for slug in reviews {
            store.ensure_review(&ReviewId::new(*slug), slug).await.unwrap();
        }
        store
    }

    fn new_comment(review: &str, content: &str, parent: Option<Uuid>) -> NewComment {
        NewComment {
            review_id: ReviewId::new(review),
            author_name: "Alex".into(),
            content: content.into(),
            parent_comment_id: parent,
        }
    }

    #[tokio::test]
    async fn test_ensure_review_is_idempotent() {
        let store = store_with(&[]).await;
        let slug = ReviewId::new("elden-ring");
        assert!(store.ensure_review(&slug, "Elden Ring").await.unwrap());
        assert!(!store.ensure_review(&slug, "Elden Ring").await.unwrap());
    }

    #[tokio::test]
    async fn test_comments_round_trip_in_order() {
        let store = store_with(&["elden-ring"]).await;

        let root = store
            .insert_comment(new_comment("elden-ring", "first", None))
            .await
            .unwrap();
        let reply = store
            .insert_comment(new_comment("elden-ring", "second", Some(root.id)))
            .await
            .unwrap();

        let listed = store.list_comments(&ReviewId::new("elden-ring")).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, root.id);
        assert_eq!(listed[1].parent_comment_id, Some(root.id));
        assert_eq!(listed[1].content, reply.content);
    }

    #[tokio::test]
    async fn test_unknown_review_is_not_found() {
        let store = store_with(&[]).await;
        let err = store
            .insert_comment(new_comment("missing", "hello", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::NotFound(entity, _)) if entity == "Review"
        ));
        assert!(store.get_stats(&ReviewId::new("missing")).await.is_err());
    }

    #[tokio::test]
    async fn test_one_vote_per_client_and_stats() {
        let store = store_with(&["elden-ring", "hades"]).await;
        let review = ReviewId::new("elden-ring");
        let alice = ClientId::new("client_alice");
        let bob = ClientId::new("client_bob");

        let vote = store.create_vote(&review, &alice, true).await.unwrap();
        assert!(store.create_vote(&review, &alice, false).await.is_err());
        store.create_vote(&review, &bob, false).await.unwrap();
        store.record_page_view(&review, &alice).await.unwrap();
        store.record_page_view(&review, &alice).await.unwrap();
        store
            .insert_comment(new_comment("elden-ring", "great bosses", None))
            .await
            .unwrap();

        let stats = store.get_stats(&review).await.unwrap();
        assert_eq!(
            stats,
            ReviewStats {
                likes: 1,
                dislikes: 1,
                comments: 1,
                views: 2
            }
        );

        store.update_vote(vote.id, false).await.unwrap();
        assert_eq!(store.get_vote(&review, &alice).await.unwrap().map(|v| v.is_like), Some(false));

        store.delete_vote(vote.id).await.unwrap();
        assert!(store.get_vote(&review, &alice).await.unwrap().is_none());
        assert!(store.delete_vote(vote.id).await.is_err());

        let all = store.list_stats().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].dislikes, 1);
        assert_eq!(all[1], ReviewStats::default());
    }
}
