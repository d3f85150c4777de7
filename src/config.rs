use crate::{
    auth::{CredentialSource, OAuthClient, ServiceAccountKey},
    error::{Error, Result},
    reply::DEFAULT_MODEL,
    utils::unescape_newlines,
    validate::validate_non_empty,
    youtube::{DEFAULT_API_BASE, MAX_RESULTS_LIMIT},
};
use std::{env, fmt::Debug, path::PathBuf};
use teloxide::types::ChatId;

const DEFAULT_TOKEN_PATH: &str = "token.json";

#[derive(Clone)]
pub struct Config {
    pub telegram_token: String,
    /// Only handle links sent to this chat, when set.
    pub chat_id: Option<ChatId>,
    pub openai: OpenAiConfig,
    pub youtube: YoutubeConfig,
}

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    pub api_base: String,
    pub max_results: u8,
    pub credentials: CredentialSource,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Config::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// - `Error::MissingEnv` if a required variable is absent or blank.
    /// - `Error::InvalidConfig` if a variable holds an unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let chat_id = vars
            .optional("CHAT_ID")
            .map(|id| {
                id.parse::<i64>()
                    .map(ChatId)
                    .map_err(|_| Error::invalid_config(format!("CHAT_ID is not a chat id: {id}")))
            })
            .transpose()?;

        Ok(Self {
            telegram_token: vars.required("TELEGRAM_BOT_TOKEN")?,
            chat_id,
            openai: OpenAiConfig::from_vars(&vars)?,
            youtube: YoutubeConfig::from_vars(&vars)?,
        })
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("telegram_token", &"***")
            .field("chat_id", &self.chat_id)
            .field("openai", &self.openai)
            .field("youtube", &self.youtube)
            .finish()
    }
}

impl OpenAiConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<Self> {
        Ok(Self {
            api_key: vars.required("OPENAI_API_KEY")?,
            model: vars
                .optional("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            api_base: vars.optional("OPENAI_BASE_URL"),
        })
    }
}

impl Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl YoutubeConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<Self> {
        let max_results = match vars.optional("YOUTUBE_MAX_RESULTS") {
            Some(raw) => raw
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=MAX_RESULTS_LIMIT).contains(n))
                .ok_or_else(|| {
                    Error::invalid_config(format!(
                        "YOUTUBE_MAX_RESULTS must be between 1 and {MAX_RESULTS_LIMIT}, got {raw}"
                    ))
                })?,
            None => MAX_RESULTS_LIMIT,
        };

        Ok(Self {
            api_base: vars
                .optional("YOUTUBE_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.into()),
            max_results,
            credentials: credential_source(vars)?,
        })
    }
}

/// Build the OAuth client used by both the bot and the `authorize` utility.
///
/// # Errors
///
/// Returns `Error::MissingEnv` if a client variable is absent.
pub fn oauth_client_from_env() -> Result<(OAuthClient, PathBuf)> {
    oauth_client(&Vars(|key: &str| env::var(key).ok()))
}

fn oauth_client<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<(OAuthClient, PathBuf)> {
    let mut client = OAuthClient::new(
        vars.required("GOOGLE_CLIENT_ID")?,
        vars.required("GOOGLE_CLIENT_SECRET")?,
        vars.required("GOOGLE_REDIRECT_URI")?,
    );
    if let Some(uri) = vars.optional("GOOGLE_TOKEN_URI") {
        client = client.with_token_uri(uri);
    }
    let token_path = vars
        .optional("GOOGLE_TOKEN_PATH")
        .map_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH), PathBuf::from);
    Ok((client, token_path))
}

fn credential_source<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<CredentialSource> {
    let kind = vars.optional("YOUTUBE_AUTH").unwrap_or_else(|| {
        if vars.optional("GOOGLE_APPLICATION_CREDENTIALS").is_some() {
            "credentials_file".into()
        } else if vars.optional("GOOGLE_SERVICE_ACCOUNT_EMAIL").is_some() {
            "service_account".into()
        } else {
            "oauth".into()
        }
    });

    match kind.to_ascii_lowercase().as_str() {
        "oauth" => {
            let (client, token_path) = oauth_client(vars)?;
            Ok(CredentialSource::AuthorizationCode { client, token_path })
        }
        "service_account" => {
            let private_key = unescape_newlines(&vars.required("GOOGLE_PRIVATE_KEY")?);
            let mut key = ServiceAccountKey::new(
                vars.required("GOOGLE_SERVICE_ACCOUNT_EMAIL")?,
                private_key,
            )
            .with_subject(vars.optional("GOOGLE_DELEGATED_USER"));
            if let Some(uri) = vars.optional("GOOGLE_TOKEN_URI") {
                key = key.with_token_uri(uri);
            }
            Ok(CredentialSource::ServiceAccount(key))
        }
        "credentials_file" => Ok(CredentialSource::CredentialsFile {
            path: PathBuf::from(vars.required("GOOGLE_APPLICATION_CREDENTIALS")?),
            token_uri: vars.optional("GOOGLE_TOKEN_URI"),
        }),
        other => Err(Error::invalid_config(format!(
            "YOUTUBE_AUTH must be oauth, service_account or credentials_file, got {other}"
        ))),
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).and_then(|v| validate_non_empty(&v).ok().map(ToOwned::to_owned))
    }

    fn required(&self, key: &'static str) -> Result<String> {
        self.optional(key).ok_or(Error::MissingEnv(key))
    }
}
