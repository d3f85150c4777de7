use crate::{
    error::Result,
    outcome::Outcome,
    utils::{YOUTUBE_COMMENT_LIMIT, truncate_chars},
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const FALLBACK_REPLY: &str = "Thanks for your comment!";

/// Render the prompt sent to the language model for one comment.
#[must_use]
pub fn build_prompt(comment: &str) -> String {
    format!("Reply to this YouTube comment: \"{comment}\"")
}

/// Anything that can turn a prompt into a single completion.
#[async_trait::async_trait]
pub trait ReplyWriter: Send + Sync {
    /// Return the raw completion text, empty when the model produced none.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat-completion backed writer.
#[derive(Clone)]
pub struct OpenAiWriter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiWriter {
    #[must_use]
    pub fn new(api_key: &str, model: impl Into<String>, api_base: Option<&str>) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }
        Self {
            client: Client::with_config(config).with_backoff(single_attempt()),
            model: model.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Backoff policy that gives up after the first attempt, so a rate-limited
/// request surfaces as an error instead of being retried.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

#[async_trait::async_trait]
impl ReplyWriter for OpenAiWriter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?
            .into();
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message])
            .build()?;

        debug!(model = %self.model, "requesting chat completion");
        let response = self.client.chat().create(request).await?;

        if let Some(usage) = &response.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// Draft a reply to `comment`, falling back to [`FALLBACK_REPLY`] when the
/// model errors or answers with nothing.
pub async fn generate_reply(writer: &dyn ReplyWriter, comment: &str) -> Outcome<String> {
    match writer.complete(&build_prompt(comment)).await {
        Ok(text) if !text.trim().is_empty() => {
            Outcome::Fresh(truncate_chars(text.trim(), YOUTUBE_COMMENT_LIMIT))
        }
        Ok(_) => {
            warn!("model returned an empty reply; using fallback");
            Outcome::degraded(FALLBACK_REPLY.to_owned(), "empty completion")
        }
        Err(err) => {
            error!(%err, "failed to generate reply");
            Outcome::degraded(FALLBACK_REPLY.to_owned(), err)
        }
    }
}
