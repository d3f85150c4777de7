use crate::{outcome::Outcome, validate::VideoId, youtube::CommentStore};
use rand::{Rng, rng, seq::IndexedRandom};
use tracing::{error, info};

/// Top-level comment bodies fetched for one video, in API order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    lines: Vec<String>,
}

impl Comments {
    #[must_use]
    pub const fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.lines
    }

    /// Pick a comment uniformly at random; `None` when there are none.
    #[must_use]
    pub fn pick(&self) -> Option<&str> {
        self.pick_with(&mut rng())
    }

    #[must_use]
    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.lines.choose(rng).map(AsRef::as_ref)
    }
}

impl From<Vec<String>> for Comments {
    fn from(lines: Vec<String>) -> Self {
        Self::new(lines)
    }
}

/// List the video's comments, treating any failure as "no comments".
pub async fn fetch_comments(
    store: &dyn CommentStore,
    video: &VideoId,
    max_results: u8,
) -> Outcome<Comments> {
    match store.list_comments(video, max_results).await {
        Ok(lines) => {
            if lines.is_empty() {
                info!(video_id = %video, "no comments found");
            }
            Outcome::Fresh(lines.into())
        }
        Err(err) => {
            error!(video_id = %video, %err, "failed to fetch comments");
            Outcome::degraded(Comments::default(), err)
        }
    }
}

/// Publish the reply; a failure is logged and reported as degraded.
pub async fn post_comment(store: &dyn CommentStore, video: &VideoId, text: &str) -> Outcome<()> {
    match store.insert_comment(video, text).await {
        Ok(()) => {
            info!(video_id = %video, text, "comment posted");
            Outcome::Fresh(())
        }
        Err(err) => {
            error!(video_id = %video, %err, "failed to post comment");
            Outcome::degraded((), err)
        }
    }
}
