//! Line commands read from stdin while the service runs.
//!
//! ```text
//! comment <review> <author>: <text>
//! reply <review> <parent-id> <author>: <text>
//! vote <review> like|dislike
//! thread <review>
//! stats
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use rg_core::{AppError, ReviewId, ReviewStore, ThreadedComment};
use rg_guard::{global_stats, CommentService, VoteCooldownTracker};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Comment {
        review: ReviewId,
        parent: Option<Uuid>,
        author: String,
        text: String,
    },
    Vote {
        review: ReviewId,
        is_like: bool,
    },
    Thread {
        review: ReviewId,
    },
    Stats,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        match verb {
            "comment" => {
                let (review, body) = rest.trim().split_once(' ')?;
                let (author, text) = body.split_once(':')?;
                Some(Command::Comment {
                    review: ReviewId::new(review),
                    parent: None,
                    author: author.trim().to_string(),
                    text: text.trim().to_string(),
                })
            }
            "reply" => {
                let mut parts = rest.trim().splitn(3, ' ');
                let review = parts.next()?;
                let parent = Uuid::parse_str(parts.next()?).ok()?;
                let (author, text) = parts.next()?.split_once(':')?;
                Some(Command::Comment {
                    review: ReviewId::new(review),
                    parent: Some(parent),
                    author: author.trim().to_string(),
                    text: text.trim().to_string(),
                })
            }
            "vote" => {
                let (review, choice) = rest.trim().split_once(' ')?;
                let is_like = match choice.trim() {
                    "like" => true,
                    "dislike" => false,
                    _ => return None,
                };
                Some(Command::Vote {
                    review: ReviewId::new(review),
                    is_like,
                })
            }
            "thread" if !rest.trim().is_empty() => Some(Command::Thread {
                review: ReviewId::new(rest.trim()),
            }),
            "stats" => Some(Command::Stats),
            _ => None,
        }
    }
}

/// Per-review services for the single local client.
pub struct ReviewPage {
    pub comments: CommentService,
    pub votes: VoteCooldownTracker,
}

pub struct Console {
    pub store: Arc<dyn ReviewStore>,
    pub pages: HashMap<ReviewId, ReviewPage>,
}

impl Console {
    pub async fn execute(&self, command: Command) -> rg_core::Result<String> {
        match command {
            Command::Comment {
                review,
                parent,
                author,
                text,
            } => {
                let page = self.page(&review)?;
                let submitted = page.comments.submit(&author, &text, parent).await?;
                Ok(format!(
                    "posted {} ({} left today, next comment in {})",
                    submitted.comment.id,
                    submitted.state.remaining_daily_comments,
                    display_wait(&page.comments.limiter().main_comment_time_remaining()),
                ))
            }
            Command::Vote { review, is_like } => {
                let outcome = self.page(&review)?.votes.cast_vote(is_like).await?;
                Ok(format!("{:?}", outcome))
            }
            Command::Thread { review } => {
                let threads = self.page(&review)?.comments.threaded().await?;
                let mut out = String::new();
                render(&threads, 0, &mut out);
                Ok(out)
            }
            Command::Stats => {
                let totals = global_stats(self.store.as_ref()).await?;
                Ok(format!("{:?}", totals))
            }
        }
    }

    fn page(&self, review: &ReviewId) -> rg_core::Result<&ReviewPage> {
        self.pages
            .get(review)
            .ok_or_else(|| AppError::NotFound("Review".into(), review.to_string()))
    }
}

fn display_wait(wait: &str) -> &str {
    if wait.is_empty() {
        "0s"
    } else {
        wait
    }
}

fn render(threads: &[ThreadedComment], depth: usize, out: &mut String) {
    for t in threads {
        out.push_str(&format!(
            "{}{} [{}]: {}\n",
            "  ".repeat(depth),
            t.comment.author_name,
            t.comment.id,
            t.comment.content
        ));
        render(&t.replies, depth + 1, out);
    }
}
