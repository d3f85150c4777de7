use crate::{
    auth::TokenProvider,
    error::{Error, Result},
    validate::VideoId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const MAX_RESULTS_LIMIT: u8 = 50;

/// The two comment-thread operations the bot needs from a video platform.
#[async_trait::async_trait]
pub trait CommentStore: Send + Sync {
    /// Fetch up to `max_results` top-level comment bodies, in API order.
    async fn list_comments(&self, video: &VideoId, max_results: u8) -> Result<Vec<String>>;

    /// Publish `text` as a new top-level comment.
    async fn insert_comment(&self, video: &VideoId, text: &str) -> Result<()>;
}

/// YouTube Data API v3 client.
#[derive(Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    api_base: String,
    tokens: Arc<dyn TokenProvider>,
}

impl YouTubeClient {
    #[must_use]
    pub fn new(http: reqwest::Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_api_base(http, tokens, DEFAULT_API_BASE)
    }

    #[must_use]
    pub fn with_api_base(
        http: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_owned(),
            tokens,
        }
    }

    fn comment_threads_url(&self) -> String {
        format!("{}/commentThreads", self.api_base)
    }
}

#[async_trait::async_trait]
impl CommentStore for YouTubeClient {
    async fn list_comments(&self, video: &VideoId, max_results: u8) -> Result<Vec<String>> {
        let token = self.tokens.access_token().await?;
        let max_results = max_results.clamp(1, MAX_RESULTS_LIMIT).to_string();
        debug!(video_id = %video, max_results = %max_results, "listing comment threads");

        let response = self
            .http
            .get(self.comment_threads_url())
            .bearer_auth(token)
            .query(&[
                ("part", "snippet"),
                ("videoId", video.as_str()),
                ("maxResults", max_results.as_str()),
                ("textFormat", "plainText"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::from_response("youtube", response).await);
        }

        let list: CommentThreadList = response.json().await?;
        let comments = list.into_texts();
        info!(video_id = %video, comments = comments.len(), "fetched comments");
        Ok(comments)
    }

    async fn insert_comment(&self, video: &VideoId, text: &str) -> Result<()> {
        let token = self.tokens.access_token().await?;
        let body = NewCommentThread::new(video.as_str(), text);

        let response = self
            .http
            .post(self.comment_threads_url())
            .bearer_auth(token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::from_response("youtube", response).await);
        }

        info!(video_id = %video, "comment thread inserted");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CommentThreadList {
    #[serde(default)]
    items: Vec<CommentThread>,
}

impl CommentThreadList {
    fn into_texts(self) -> Vec<String> {
        self.items
            .into_iter()
            .filter_map(|item| item.snippet.top_level_comment.snippet.into_text())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_original: Option<String>,
    #[serde(default)]
    text_display: Option<String>,
}

impl CommentSnippet {
    // textOriginal is only guaranteed for the comment author
    fn into_text(self) -> Option<String> {
        self.text_original
            .filter(|t| !t.trim().is_empty())
            .or(self.text_display)
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
struct NewCommentThread<'a> {
    snippet: NewThreadSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewThreadSnippet<'a> {
    video_id: &'a str,
    top_level_comment: NewTopLevelComment<'a>,
}

#[derive(Debug, Serialize)]
struct NewTopLevelComment<'a> {
    snippet: NewCommentSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewCommentSnippet<'a> {
    text_original: &'a str,
}

impl<'a> NewCommentThread<'a> {
    const fn new(video_id: &'a str, text: &'a str) -> Self {
        Self {
            snippet: NewThreadSnippet {
                video_id,
                top_level_comment: NewTopLevelComment {
                    snippet: NewCommentSnippet {
                        text_original: text,
                    },
                },
            },
        }
    }
}
