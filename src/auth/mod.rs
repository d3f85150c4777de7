//! Access tokens for the YouTube Data API.
//!
//! A [`CredentialSource`] is picked once at startup and turned into a shared
//! [`TokenProvider`]. Every provider caches its token in memory and only goes
//! back to the token endpoint when the cached one is about to expire.

mod oauth;
mod service_account;

pub use oauth::{OAuthClient, RefreshTokenProvider, StoredToken, parse_authorization_code};
pub use service_account::{ServiceAccountKey, ServiceAccountProvider};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{fs::read_to_string, sync::Mutex};
use tracing::{debug, info};

pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";

const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_EXPIRES_IN: u64 = 3600;

#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a bearer token valid for at least another minute.
    async fn access_token(&self) -> Result<String>;
}

/// Where the YouTube credentials come from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Refresh token cached on disk by the `authorize` utility.
    AuthorizationCode {
        client: OAuthClient,
        token_path: PathBuf,
    },
    /// Service-account key supplied through the environment.
    ServiceAccount(ServiceAccountKey),
    /// A Google credentials JSON file (`service_account` or `authorized_user`).
    CredentialsFile {
        path: PathBuf,
        token_uri: Option<String>,
    },
}

impl CredentialSource {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "oauth",
            Self::ServiceAccount(_) => "service_account",
            Self::CredentialsFile { .. } => "credentials_file",
        }
    }

    /// Build the token provider for this source.
    ///
    /// # Errors
    ///
    /// - `Error::Auth` if the token file is missing or holds no tokens.
    /// - `Error::Json` / `Error::Jwt` for malformed credentials.
    pub async fn into_provider(self, http: reqwest::Client) -> Result<Arc<dyn TokenProvider>> {
        info!(source = self.kind(), "setting up youtube credentials");
        let provider: Arc<dyn TokenProvider> = match self {
            Self::AuthorizationCode { client, token_path } => {
                Arc::new(RefreshTokenProvider::from_token_file(http, client, &token_path).await?)
            }
            Self::ServiceAccount(key) => Arc::new(ServiceAccountProvider::new(http, key)?),
            Self::CredentialsFile { path, token_uri } => {
                let content = read_to_string(&path).await.map_err(|e| {
                    Error::auth(format!("cannot read credentials file {}: {e}", path.display()))
                })?;
                match serde_json::from_str::<CredentialsFile>(&content)? {
                    CredentialsFile::ServiceAccount(mut key) => {
                        if let Some(uri) = token_uri {
                            key.token_uri = uri;
                        }
                        Arc::new(ServiceAccountProvider::new(http, key)?)
                    }
                    CredentialsFile::AuthorizedUser(user) => {
                        let mut client = OAuthClient::new(user.client_id, user.client_secret, "");
                        if let Some(uri) = token_uri {
                            client = client.with_token_uri(uri);
                        }
                        Arc::new(RefreshTokenProvider::from_refresh_token(
                            http,
                            client,
                            user.refresh_token,
                        ))
                    }
                }
            }
        };
        Ok(provider)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Debug, Deserialize)]
struct AuthorizedUser {
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

/// Bearer token plus the moment it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: SystemTime,
}

impl AccessToken {
    #[must_use]
    pub fn is_fresh(&self, now: SystemTime) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

/// Body returned by Google's token endpoint for every grant type.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub(crate) fn access_token(&self, now: SystemTime) -> AccessToken {
        let lifetime = Duration::from_secs(self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));
        AccessToken {
            value: self.access_token.clone(),
            expires_at: now + lifetime,
        }
    }
}

/// POST a form to the token endpoint.
pub(crate) async fn request_token(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let grant = form
        .iter()
        .find_map(|(k, v)| (*k == "grant_type").then_some(*v))
        .unwrap_or("unknown");
    debug!(token_uri, grant, "requesting access token");

    let response = http.post(token_uri).form(form).send().await?;
    if !response.status().is_success() {
        return Err(Error::from_response("oauth", response).await);
    }
    Ok(response.json().await?)
}

#[derive(Debug, Default)]
struct TokenCache(Mutex<Option<AccessToken>>);

impl TokenCache {
    fn new(initial: Option<AccessToken>) -> Self {
        Self(Mutex::new(initial))
    }

    /// Serve the cached token, or run `refresh` under the lock so concurrent
    /// callers wait for a single refresh.
    async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<AccessToken>> + Send,
    {
        let mut guard = self.0.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(SystemTime::now())) {
            return Ok(token.value.clone());
        }
        let token = refresh().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }
}

pub(crate) fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token(value: &str, ttl: Duration) -> AccessToken {
        AccessToken {
            value: value.into(),
            expires_at: SystemTime::now() + ttl,
        }
    }

    #[test]
    fn freshness_keeps_a_margin() {
        let now = SystemTime::now();
        assert!(token("a", Duration::from_secs(600)).is_fresh(now));
        assert!(!token("a", Duration::from_secs(30)).is_fresh(now));
    }

    #[tokio::test]
    async fn cache_serves_fresh_token_without_refresh() {
        let cache = TokenCache::new(Some(token("cached", Duration::from_secs(600))));
        let calls = AtomicUsize::new(0);
        let value = cache
            .get_or_refresh(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(token("new", Duration::from_secs(600)))
            })
            .await
            .expect("token");
        assert_eq!(value, "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cache_refreshes_once_then_reuses() {
        let cache = TokenCache::default();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = cache
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(token("new", Duration::from_secs(600)))
                })
                .await
                .expect("token");
            assert_eq!(value, "new");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refresh_leaves_cache_empty() {
        let cache = TokenCache::default();
        let err = cache
            .get_or_refresh(|| async { Err(Error::auth("nope")) })
            .await;
        assert!(err.is_err());
        assert!(cache.0.lock().await.is_none());
    }

    #[test]
    fn token_response_defaults_to_one_hour() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"abc"}"#).expect("json");
        let now = SystemTime::now();
        let token = response.access_token(now);
        assert_eq!(token.value, "abc");
        assert_eq!(token.expires_at, now + Duration::from_secs(3600));
    }

    #[test]
    fn credentials_file_is_tagged_by_type() {
        let json = r#"{"type":"authorized_user","client_id":"id","client_secret":"s","refresh_token":"r"}"#;
        assert!(matches!(
            serde_json::from_str::<CredentialsFile>(json),
            Ok(CredentialsFile::AuthorizedUser(_))
        ));
        let json = r#"{"type":"external_account"}"#;
        assert!(serde_json::from_str::<CredentialsFile>(json).is_err());
    }
}
