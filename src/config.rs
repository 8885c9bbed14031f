//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Client configuration for the onboarding backend and OAuth flow.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `http://localhost:8000`.
    pub api_url: Url,
    /// Per-request timeout.
    pub http_timeout: Duration,
    /// Directory holding the local draft snapshot.
    pub draft_dir: PathBuf,
    /// Port the callback landing listener binds to.
    pub callback_port: u16,
    /// Delay before redirecting away from a failed callback.
    pub failure_redirect_delay: Duration,
    /// Delay before returning to the wizard after a successful link.
    pub success_redirect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            http_timeout: Duration::from_secs(30),
            draft_dir: default_draft_dir(None),
            callback_port: 3001,
            failure_redirect_delay: Duration::from_secs(3),
            success_redirect_delay: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    /// Build from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = match lookup("ONBOARDING_API_URL") {
            Some(raw) => parse_api_url(&raw)?,
            None => defaults.api_url,
        };

        let http_timeout = parse_secs(&lookup, "ONBOARDING_HTTP_TIMEOUT_SECS")?
            .unwrap_or(defaults.http_timeout);

        let draft_dir = lookup("ONBOARDING_DRAFT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_draft_dir(lookup("HOME")));

        let callback_port = match lookup("ONBOARDING_CALLBACK_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "ONBOARDING_CALLBACK_PORT".to_string(),
                message: format!("'{raw}' is not a port number"),
            })?,
            None => defaults.callback_port,
        };

        let failure_redirect_delay = parse_secs(&lookup, "ONBOARDING_FAILURE_REDIRECT_SECS")?
            .unwrap_or(defaults.failure_redirect_delay);
        let success_redirect_delay = parse_secs(&lookup, "ONBOARDING_SUCCESS_REDIRECT_SECS")?
            .unwrap_or(defaults.success_redirect_delay);

        Ok(Self {
            api_url,
            http_timeout,
            draft_dir,
            callback_port,
            failure_redirect_delay,
            success_redirect_delay,
        })
    }

    /// Append path segments to the base URL. Segments are percent-encoded.
    pub fn api_url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        key: "ONBOARDING_API_URL".to_string(),
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue {
            key: "ONBOARDING_API_URL".to_string(),
            message: "must be an absolute http(s) URL".to_string(),
        });
    }
    Ok(url)
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{raw}' is not a whole number of seconds"),
            }),
        None => Ok(None),
    }
}

fn default_draft_dir(home: Option<String>) -> PathBuf {
    let home = home.unwrap_or_else(|| ".".to_string());
    PathBuf::from(home).join(".location-onboarding")
}
