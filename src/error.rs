use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] tokio::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("openai error: {0}")]
    OpenAi(#[from] async_openai::error::OpenAIError),

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{service} api returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("other: {0}")]
    Other(String),
}

impl Error {
    #[inline]
    pub fn other(text: impl Into<String>) -> Self {
        Self::Other(text.into())
    }

    #[inline]
    pub fn invalid_config(text: impl Into<String>) -> Self {
        Self::InvalidConfig(text.into())
    }

    #[inline]
    pub fn auth(text: impl Into<String>) -> Self {
        Self::Auth(text.into())
    }

    /// Drain a non-success response into an [`Error::Api`].
    pub async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::Api {
            service,
            status,
            body,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
