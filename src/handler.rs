use crate::{
    comments::{fetch_comments, post_comment},
    error::Result,
    reply::{ReplyWriter, generate_reply},
    validate::VideoId,
    youtube::{CommentStore, MAX_RESULTS_LIMIT},
};
use std::sync::Arc;
use teloxide::{Bot, prelude::Requester, types::ChatId};
use tracing::{debug, info, warn};

pub const INVALID_LINK_NOTICE: &str = "❌ Invalid YouTube link. Please try again.";
pub const FETCHING_NOTICE: &str = "🔍 Fetching comments...";
pub const POSTED_NOTICE: &str = "✅ Comment posted successfully!";
pub const NO_COMMENTS_NOTICE: &str = "⚠️ No comments found on that video.";
pub const POST_FAILED_NOTICE: &str = "❌ Couldn't post the reply on YouTube. Check the bot logs.";

/// Outbound side of the chat: anything that can drop a line into a chat.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

#[async_trait::async_trait]
impl Notifier for Bot {
    async fn notify(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.send_message(chat_id, text.to_owned()).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Fetching,
    Replying,
    Posted,
    Aborted,
}

/// How handling a single link ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    InvalidLink,
    /// `degraded` is set when the listing call itself failed.
    NoComments {
        degraded: bool,
    },
    Posted {
        comment: String,
        reply: String,
        reply_degraded: bool,
    },
    PostFailed {
        comment: String,
        reply: String,
        reason: String,
    },
}

/// Fetch a random comment on the linked video, draft a reply, post it.
#[derive(Clone)]
pub struct CommentReplier {
    store: Arc<dyn CommentStore>,
    writer: Arc<dyn ReplyWriter>,
    max_results: u8,
}

impl CommentReplier {
    #[must_use]
    pub fn new(store: Arc<dyn CommentStore>, writer: Arc<dyn ReplyWriter>) -> Self {
        Self {
            store,
            writer,
            max_results: MAX_RESULTS_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_max_results(mut self, max_results: u8) -> Self {
        self.max_results = max_results;
        self
    }

    /// Handle one link sent to `chat_id`.
    ///
    /// API failures never abort the flow; they only change which notice the
    /// chat receives.
    ///
    /// # Errors
    ///
    /// Returns an error only when a notice cannot be delivered.
    pub async fn handle(
        &self,
        notifier: &dyn Notifier,
        chat_id: ChatId,
        text: &str,
    ) -> Result<Completion> {
        trace_stage(chat_id, Stage::Received);

        let Some(video) = VideoId::extract(text) else {
            warn!(chat_id = chat_id.0, text, "no video id in link");
            notifier.notify(chat_id, INVALID_LINK_NOTICE).await?;
            trace_stage(chat_id, Stage::Aborted);
            return Ok(Completion::InvalidLink);
        };

        info!(chat_id = chat_id.0, video_id = %video, "handling youtube link");
        notifier.notify(chat_id, FETCHING_NOTICE).await?;
        trace_stage(chat_id, Stage::Fetching);

        let fetched = fetch_comments(self.store.as_ref(), &video, self.max_results).await;
        let degraded = fetched.is_degraded();
        let comments = fetched.into_value();

        let Some(comment) = comments.pick().map(ToOwned::to_owned) else {
            notifier.notify(chat_id, NO_COMMENTS_NOTICE).await?;
            trace_stage(chat_id, Stage::Aborted);
            return Ok(Completion::NoComments { degraded });
        };

        trace_stage(chat_id, Stage::Replying);
        debug!(video_id = %video, pool = comments.len(), %comment, "picked comment");
        let reply = generate_reply(self.writer.as_ref(), &comment).await;
        let reply_degraded = reply.is_degraded();
        let reply = reply.into_value();

        let posted = post_comment(self.store.as_ref(), &video, &reply).await;
        if let Some(reason) = posted.reason() {
            notifier.notify(chat_id, POST_FAILED_NOTICE).await?;
            trace_stage(chat_id, Stage::Aborted);
            return Ok(Completion::PostFailed {
                comment,
                reply,
                reason: reason.to_owned(),
            });
        }

        notifier.notify(chat_id, POSTED_NOTICE).await?;
        trace_stage(chat_id, Stage::Posted);
        Ok(Completion::Posted {
            comment,
            reply,
            reply_degraded,
        })
    }
}

fn trace_stage(chat_id: ChatId, stage: Stage) {
    debug!(chat_id = chat_id.0, ?stage, "stage");
}
