use super::{
    AccessToken, DEFAULT_TOKEN_URI, TokenCache, TokenProvider, YOUTUBE_SCOPE, request_token,
    unix_now,
};
use crate::error::Result;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tracing::info;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// The subset of a Google service-account key file the bot needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// User to impersonate through domain-wide delegation.
    #[serde(skip)]
    pub subject: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

impl ServiceAccountKey {
    #[must_use]
    pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.into(),
            token_uri: default_token_uri(),
            subject: None,
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }

    #[must_use]
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"***")
            .field("token_uri", &self.token_uri)
            .field("subject", &self.subject)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

/// Provider that signs its own assertions with a service-account key.
pub struct ServiceAccountProvider {
    http: reqwest::Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    cache: TokenCache,
}

impl ServiceAccountProvider {
    /// # Errors
    ///
    /// Returns `Error::Jwt` if the private key is not a valid RSA PEM.
    pub fn new(http: reqwest::Client, key: ServiceAccountKey) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        info!(client_email = %key.client_email, "service account key loaded");
        Ok(Self {
            http,
            key,
            signing_key,
            cache: TokenCache::default(),
        })
    }

    fn assertion(&self, issued_at: u64) -> Result<String> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: YOUTUBE_SCOPE,
            aud: &self.key.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
            sub: self.key.subject.as_deref(),
        };
        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.signing_key,
        )?)
    }

    async fn fetch(&self) -> Result<AccessToken> {
        let assertion = self.assertion(unix_now().as_secs())?;
        let response = request_token(
            &self.http,
            &self.key.token_uri,
            &[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)],
        )
        .await?;
        Ok(response.access_token(SystemTime::now()))
    }
}

#[async_trait::async_trait]
impl TokenProvider for ServiceAccountProvider {
    async fn access_token(&self) -> Result<String> {
        self.cache.get_or_refresh(|| self.fetch()).await
    }
}
