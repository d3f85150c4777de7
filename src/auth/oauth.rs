use super::{
    AccessToken, DEFAULT_AUTH_URI, DEFAULT_TOKEN_URI, TokenCache, TokenProvider, TokenResponse,
    YOUTUBE_SCOPE, request_token,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::fs;
use tracing::{info, warn};
use url::Url;

/// OAuth2 client registered in the Google Cloud console.
#[derive(Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
}

impl OAuthClient {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_uri: DEFAULT_AUTH_URI.into(),
            token_uri: DEFAULT_TOKEN_URI.into(),
        }
    }

    #[must_use]
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Consent page the operator opens once to grant offline access.
    ///
    /// # Errors
    ///
    /// Returns `Error::Url` if `auth_uri` is not a valid URL.
    pub fn authorization_url(&self) -> Result<Url> {
        let url = Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", YOUTUBE_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )?;
        Ok(url)
    }

    /// Trade the code pasted by the operator for a token pair.
    ///
    /// # Errors
    ///
    /// Propagates transport errors and non-success token endpoint replies.
    pub async fn exchange_code(&self, http: &reqwest::Client, code: &str) -> Result<StoredToken> {
        let response = request_token(
            http,
            &self.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.redirect_uri),
            ],
        )
        .await?;

        if response.refresh_token.is_none() {
            warn!("token endpoint returned no refresh token; the bot will stop working once the access token expires");
        }
        Ok(StoredToken::from_response(response, SystemTime::now()))
    }

    /// Mint a new access token from a refresh token.
    ///
    /// # Errors
    ///
    /// Propagates transport errors and non-success token endpoint replies.
    pub async fn refresh(&self, http: &reqwest::Client, refresh_token: &str) -> Result<AccessToken> {
        let response = request_token(
            http,
            &self.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
            ],
        )
        .await?;
        Ok(response.access_token(SystemTime::now()))
    }
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Accept either the bare code or the whole redirect URL the browser landed on.
#[must_use]
pub fn parse_authorization_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, code)| code.into_owned()),
        Err(_) => Some(input.to_owned()),
    }
}

/// Token file layout shared with the `googleapis` Node client;
/// `expiry_date` is in epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<u64>,
}

impl StoredToken {
    pub(crate) fn from_response(response: TokenResponse, now: SystemTime) -> Self {
        let expires_at = response.access_token(now).expires_at;
        let expiry_date = expires_at
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u64::try_from(d.as_millis()).ok());
        Self {
            access_token: Some(response.access_token),
            refresh_token: response.refresh_token,
            scope: response.scope,
            token_type: response.token_type,
            expiry_date,
        }
    }

    /// Read a token file.
    ///
    /// # Errors
    ///
    /// - `Error::Auth` if the file does not exist.
    /// - `Error::Io` / `Error::Json` if it cannot be read or parsed.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::auth(format!(
                    "token file {} not found; run `authorize` first",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the token file, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be written.
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).await?;
        Ok(())
    }

    /// The stored access token, if the file carries one with a known expiry.
    #[must_use]
    pub fn cached_access_token(&self) -> Option<AccessToken> {
        let value = self.access_token.clone()?;
        let expires_at = UNIX_EPOCH + Duration::from_millis(self.expiry_date?);
        Some(AccessToken { value, expires_at })
    }
}

/// Provider backed by a long-lived refresh token.
#[derive(Debug)]
pub struct RefreshTokenProvider {
    http: reqwest::Client,
    client: OAuthClient,
    refresh_token: Option<String>,
    cache: TokenCache,
}

impl RefreshTokenProvider {
    #[must_use]
    pub fn from_refresh_token(
        http: reqwest::Client,
        client: OAuthClient,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            client,
            refresh_token: Some(refresh_token.into()),
            cache: TokenCache::default(),
        }
    }

    /// Start from the token file written by `authorize`.
    ///
    /// # Errors
    ///
    /// - Propagates [`StoredToken::load`] errors.
    /// - `Error::Auth` if the file holds neither an access nor a refresh token.
    pub async fn from_token_file<P: AsRef<Path>>(
        http: reqwest::Client,
        client: OAuthClient,
        path: P,
    ) -> Result<Self> {
        let path = path.as_ref();
        let stored = StoredToken::load(path).await?;
        if stored.refresh_token.is_none() && stored.access_token.is_none() {
            return Err(Error::auth(format!(
                "token file {} holds no tokens; run `authorize` again",
                path.display()
            )));
        }
        info!(path = %path.display(), "oauth token loaded from file");

        Ok(Self {
            http,
            client,
            refresh_token: stored.refresh_token.clone(),
            cache: TokenCache::new(stored.cached_access_token()),
        })
    }
}

#[async_trait::async_trait]
impl TokenProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<String> {
        self.cache
            .get_or_refresh(|| async {
                let refresh_token = self.refresh_token.as_deref().ok_or_else(|| {
                    Error::auth("access token expired and no refresh token is stored")
                })?;
                info!("refreshing youtube access token");
                self.client.refresh(&self.http, refresh_token).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_requests_offline_access() {
        let client = OAuthClient::new("my-id", "secret", "http://localhost:3000/callback");
        let url = client.authorization_url().expect("url");
        let params = url.query_pairs().into_owned().collect::<Vec<_>>();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert!(params.contains(&("client_id".into(), "my-id".into())));
        assert!(params.contains(&("access_type".into(), "offline".into())));
        assert!(params.contains(&("scope".into(), YOUTUBE_SCOPE.into())));
        assert!(params.contains(&(
            "redirect_uri".into(),
            "http://localhost:3000/callback".into()
        )));
        assert!(!url.as_str().contains("secret"));
    }

    #[test]
    fn stored_token_uses_millisecond_expiry() {
        let response = TokenResponse {
            access_token: "at".into(),
            expires_in: Some(10),
            refresh_token: Some("rt".into()),
            scope: Some(YOUTUBE_SCOPE.into()),
            token_type: Some("Bearer".into()),
        };
        let now = UNIX_EPOCH + Duration::from_secs(1_000);
        let stored = StoredToken::from_response(response, now);
        assert_eq!(stored.expiry_date, Some(1_010_000));

        let cached = stored.cached_access_token().expect("access token");
        assert_eq!(cached.value, "at");
        assert_eq!(cached.expires_at, UNIX_EPOCH + Duration::from_secs(1_010));
    }

    #[test]
    fn parses_node_client_token_file() {
        let json = r#"{
            "access_token": "ya29.x",
            "refresh_token": "1//r",
            "scope": "https://www.googleapis.com/auth/youtube.force-ssl",
            "token_type": "Bearer",
            "expiry_date": 1700000000000
        }"#;
        let stored: StoredToken = serde_json::from_str(json).expect("json");
        assert_eq!(stored.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(stored.expiry_date, Some(1_700_000_000_000));
    }

    #[test]
    fn authorization_code_from_plain_input() {
        assert_eq!(
            parse_authorization_code("  4/0AX4XfWh-abc\n").as_deref(),
            Some("4/0AX4XfWh-abc")
        );
        assert_eq!(parse_authorization_code("\n"), None);
    }

    #[test]
    fn authorization_code_from_redirect_url() {
        let url = "http://localhost:3000/callback?code=4%2F0AX4&scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fyoutube.force-ssl";
        assert_eq!(parse_authorization_code(url).as_deref(), Some("4/0AX4"));
        assert_eq!(
            parse_authorization_code("http://localhost:3000/callback?error=access_denied"),
            None
        );
    }

    #[test]
    fn debug_hides_client_secret() {
        let client = OAuthClient::new("id", "top-secret", "uri");
        assert!(!format!("{client:?}").contains("top-secret"));
    }
}
