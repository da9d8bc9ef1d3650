//! Comment submission flow and read-side threading.

use std::collections::HashMap;
use std::sync::Arc;

use rg_core::{
    AppError, Comment, CommentKind, CooldownState, NewComment, Result, ReviewStore,
    ThreadedComment,
};
use rg_filter::{sanitize_content, ContentFilter};
use uuid::Uuid;

use crate::limiter::CommentRateLimiter;

/// What a successful submission hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedComment {
    pub comment: Comment,
    pub state: CooldownState,
}

pub struct CommentService {
    filter: Arc<ContentFilter>,
    limiter: CommentRateLimiter,
    store: Arc<dyn ReviewStore>,
}

impl CommentService {
    pub fn new(
        filter: Arc<ContentFilter>,
        limiter: CommentRateLimiter,
        store: Arc<dyn ReviewStore>,
    ) -> Self {
        Self {
            filter,
            limiter,
            store,
        }
    }

    pub fn limiter(&self) -> &CommentRateLimiter {
        &self.limiter
    }

    pub fn state(&self) -> CooldownState {
        self.limiter.state()
    }

    /// Filters, gates, stores, then records.
    ///
    /// Nothing touches the store unless the author, the content and the
    /// cooldowns all pass, and nothing is recorded locally unless the store
    /// accepted the insert. Once it has, the result is `Ok` even if the
    /// local record could not be written.
    pub async fn submit(
        &self,
        author: &str,
        content: &str,
        parent: Option<Uuid>,
    ) -> Result<SubmittedComment> {
        self.filter.validate_author_name(author).into_result()?;
        self.filter.validate_comment_content(content).into_result()?;

        let kind = CommentKind::from_is_reply(parent.is_some());
        self.limiter.check(kind)?;

        let ctx = self.limiter.context();
        let new_comment = NewComment {
            review_id: ctx.review().clone(),
            author_name: author.trim().to_string(),
            content: sanitize_content(content),
            parent_comment_id: parent,
        };

        let comment = self.store.insert_comment(new_comment).await.map_err(|e| {
            tracing::error!(review = %ctx.review(), %kind, "comment insert failed: {:#}", e);
            AppError::Store(format!("inserting {}: {}", kind, e))
        })?;

        // The comment exists now; a local write failure must not report it
        // as lost or the user posts it twice.
        let state = self.limiter.record_comment(kind).unwrap_or_else(|e| {
            tracing::warn!(review = %ctx.review(), %kind, "comment stored but not recorded locally: {}", e);
            self.limiter.state()
        });
        Ok(SubmittedComment { comment, state })
    }

    /// All comments of the review, nested by thread.
    pub async fn threaded(&self) -> Result<Vec<ThreadedComment>> {
        let review = self.limiter.context().review();
        let flat = self
            .store
            .list_comments(review)
            .await
            .map_err(|e| AppError::Store(format!("listing comments: {}", e)))?;
        Ok(thread_comments(flat))
    }
}

/// Nests replies beneath their parents, oldest first at every level.
/// Replies whose parent is not in `flat` are dropped.
pub fn thread_comments(mut flat: Vec<Comment>) -> Vec<ThreadedComment> {
    flat.sort_by_key(|c| c.created_at);

    let mut children: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();
    for comment in flat {
        match comment.parent_comment_id {
            None => roots.push(comment),
            Some(parent) => children.entry(parent).or_default().push(comment),
        }
    }

    roots
        .into_iter()
        .map(|root| nest(root, &mut children))
        .collect()
}

fn nest(comment: Comment, children: &mut HashMap<Uuid, Vec<Comment>>) -> ThreadedComment {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| nest(reply, children))
        .collect();
    ThreadedComment { comment, replies }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rg_core::testing::{ManualClock, MockReviewStore, RefusingKvStore};
    use rg_core::{ClientId, Limits, RejectReason, ReviewId};
    use rg_kv_memory::MemoryKvStore;

    use crate::context::RateLimiterContext;

    fn service(store: MockReviewStore) -> CommentService {
        let ctx = RateLimiterContext::new(
            ReviewId::new("outer-wilds"),
            ClientId::new("client_c"),
            Arc::new(MemoryKvStore::new()),
            Arc::new(ManualClock::at_epoch()),
            Limits::default(),
        );
        CommentService::new(
            Arc::new(ContentFilter::default()),
            CommentRateLimiter::new(ctx),
            Arc::new(store),
        )
    }

    fn stored(new: NewComment) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            review_id: new.review_id,
            author_name: new.author_name,
            content: new.content,
            likes_count: 0,
            created_at: Utc::now(),
            parent_comment_id: new.parent_comment_id,
        }
    }

    #[tokio::test]
    async fn test_submit_sanitizes_and_records() {
        let mut store = MockReviewStore::new();
        store
            .expect_insert_comment()
            .withf(|c| c.content == "great soundtrack\n\nloved it" && c.author_name == "Alex")
            .times(1)
            .returning(|c| Ok(stored(c)));

        let svc = service(store);
        let submitted = svc
            .submit("  Alex ", "  great   soundtrack\n\n\nloved it ", None)
            .await
            .unwrap();

        assert_eq!(submitted.comment.content, "great soundtrack\n\nloved it");
        assert!(!submitted.state.can_comment);
        assert!(submitted.state.can_reply);
        assert_eq!(submitted.state.remaining_daily_comments, 9);
    }

    #[tokio::test]
    async fn test_rejected_content_never_reaches_store() {
        let mut store = MockReviewStore::new();
        store.expect_insert_comment().never();
        let svc = service(store);

        let err = svc.submit("Alex", "THIS GAME IS AWFUL", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(RejectReason::Shouting)));

        let err = svc.submit("admin", "fine review", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(RejectReason::InappropriateLanguage)));

        assert_eq!(svc.state().remaining_daily_comments, 10);
    }

    #[tokio::test]
    async fn test_cooldown_blocks_second_comment_but_not_reply() {
        let mut store = MockReviewStore::new();
        store
            .expect_insert_comment()
            .times(2)
            .returning(|c| Ok(stored(c)));
        let svc = service(store);

        svc.submit("Alex", "first thoughts", None).await.unwrap();
        let err = svc.submit("Alex", "second thoughts", None).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::CommentCooldown { kind: CommentKind::Main, .. }
        ));

        let reply = svc
            .submit("Alex", "agreed", Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(!reply.state.can_reply);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_state_unchanged() {
        let mut store = MockReviewStore::new();
        store
            .expect_insert_comment()
            .returning(|_| Err(anyhow::anyhow!("503 service unavailable")));
        let svc = service(store);
        let before = svc.state();

        let err = svc.submit("Alex", "nice game!", None).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(svc.state(), before);
    }

    #[tokio::test]
    async fn test_stored_comment_succeeds_when_local_record_fails() {
        let mut store = MockReviewStore::new();
        store
            .expect_insert_comment()
            .times(1)
            .returning(|c| Ok(stored(c)));
        let ctx = RateLimiterContext::new(
            ReviewId::new("outer-wilds"),
            ClientId::new("client_c"),
            Arc::new(RefusingKvStore::new("comment_main_")),
            Arc::new(ManualClock::at_epoch()),
            Limits::default(),
        );
        let svc = CommentService::new(
            Arc::new(ContentFilter::default()),
            CommentRateLimiter::new(ctx),
            Arc::new(store),
        );

        let submitted = svc.submit("Alex", "nice game!", None).await.unwrap();
        assert_eq!(submitted.comment.content, "nice game!");
        // No quota slot is spent without the cooldown that goes with it.
        assert_eq!(submitted.state.remaining_daily_comments, 10);
        assert_eq!(svc.state(), submitted.state);
    }

    fn comment(id: u128, parent: Option<u128>, minute: i64) -> Comment {
        Comment {
            id: Uuid::from_u128(id),
            review_id: ReviewId::new("outer-wilds"),
            author_name: "Alex".into(),
            content: format!("comment {}", id),
            likes_count: 0,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() + Duration::minutes(minute),
            parent_comment_id: parent.map(Uuid::from_u128),
        }
    }

    #[test]
    fn test_thread_comments_nests_in_order() {
        let flat = vec![
            comment(3, Some(1), 5),
            comment(2, None, 2),
            comment(1, None, 1),
            comment(4, Some(1), 3),
            comment(5, Some(4), 4),
            comment(6, Some(99), 6),
        ];

        let threads = thread_comments(flat);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, Uuid::from_u128(1));
        assert_eq!(threads[1].comment.id, Uuid::from_u128(2));

        let replies: Vec<_> = threads[0].replies.iter().map(|r| r.comment.id).collect();
        assert_eq!(replies, vec![Uuid::from_u128(4), Uuid::from_u128(3)]);
        assert_eq!(threads[0].replies[0].replies[0].comment.id, Uuid::from_u128(5));
        assert!(threads[1].replies.is_empty());
    }
}
