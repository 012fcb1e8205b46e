use anyhow::{anyhow, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::PathBuf;

/// What to do with the stored credential when the server rejects it
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailurePolicy {
    /// Keep the token; the user sees a failure and may retry or log out
    #[default]
    Retain,
    /// Clear the token and reset everything derived from it
    Clear,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    // API server
    pub api_base_url: String,

    // Session persistence
    pub token_path: PathBuf,
    pub auth_failure_policy: AuthFailurePolicy,

    // Transport; None keeps the HTTP client's default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    // Observability
    pub log_level: String,
}

impl ClientConfig {
    pub const DEFAULT_API_BASE_URL: &'static str = "http://127.0.0.1:8000";

    /// Load from `FEED_*` environment variables (and `.env`), over defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("api_base_url", Self::DEFAULT_API_BASE_URL)?
            .set_default(
                "token_path",
                default_token_path().to_string_lossy().into_owned(),
            )?
            .set_default("auth_failure_policy", "retain")?
            .set_default("log_level", "info")?
            .add_source(
                config::Environment::with_prefix("FEED")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Defaults pointed at a specific server
    pub fn for_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            token_path: default_token_path(),
            auth_failure_policy: AuthFailurePolicy::default(),
            request_timeout_secs: None,
            log_level: "info".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url()?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "API base URL must use http or https, got {}",
                url.scheme()
            ));
        }

        if self.token_path.as_os_str().is_empty() {
            return Err(anyhow!("Token path is required"));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(anyhow!("Request timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Parsed base URL
    pub fn base_url(&self) -> Result<Url> {
        if self.api_base_url.trim().is_empty() {
            return Err(anyhow!("API base URL is required"));
        }
        Url::parse(&self.api_base_url)
            .map_err(|e| anyhow!("Invalid API base URL {}: {}", self.api_base_url, e))
    }

    /// `scheme://host:port` of the API server; tokens are stored per origin
    pub fn origin(&self) -> Result<String> {
        Ok(self.base_url()?.origin().ascii_serialization())
    }
}

fn default_token_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feed-client")
        .join("tokens.json")
}
