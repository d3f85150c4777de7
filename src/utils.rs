use crate::error::Result;

/// Maximum length of a YouTube comment, in characters.
pub const YOUTUBE_COMMENT_LIMIT: usize = 10_000;

/// Truncate `text` to at most `limit` characters, marking the cut with `...`.
#[must_use]
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let truncated = text
        .chars()
        .take(limit.saturating_sub(3))
        .collect::<String>();
    format!("{truncated}...")
}

/// Interpret `\n` escape sequences, as found in private keys pasted into `.env` files.
#[must_use]
pub fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

/// Shared HTTP client for the YouTube and OAuth endpoints.
///
/// # Errors
///
/// Returns `Error::Http` if the TLS backend cannot be initialised.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
