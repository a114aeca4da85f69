//! Configuration Builder
//!
//! Fluent builder for client configuration.

use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::error::ConfigurationError;
use crate::types::{
    ClientConfig, DEFAULT_REFRESH_PATH, DEFAULT_TIMEOUT_MS, ENV_BASE_URL, ENV_REFRESH_PATH,
    ENV_TIMEOUT_SECS,
};

/// Client configuration builder.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    refresh_path: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: HashMap<String, String>,
}

impl ClientConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from environment variables.
    ///
    /// `API_CLIENT_BASE_URL` is required; `API_CLIENT_REFRESH_PATH` and
    /// `API_CLIENT_TIMEOUT_SECS` are applied when set. Further builder calls
    /// override what was read.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigurationError> {
        let base_url = lookup(ENV_BASE_URL).ok_or_else(|| ConfigurationError::MissingEnvironment {
            name: ENV_BASE_URL.to_string(),
        })?;

        let mut builder = Self::new().base_url(base_url);

        if let Some(path) = lookup(ENV_REFRESH_PATH) {
            builder = builder.refresh_path(path);
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigurationError::InvalidValue {
                    field: ENV_TIMEOUT_SECS.to_string(),
                    message: e.to_string(),
                })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(builder)
    }

    /// Set base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set refresh exchange path.
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Add a default header.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.default_headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> Result<ClientConfig, ConfigurationError> {
        let raw_url = self.base_url.ok_or_else(|| ConfigurationError::MissingField {
            field: "base_url".to_string(),
        })?;

        let base_url = Url::parse(&raw_url).map_err(|e| ConfigurationError::InvalidBaseUrl {
            url: raw_url.clone(),
            message: e.to_string(),
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidBaseUrl {
                url: raw_url,
                message: "scheme must be http or https".to_string(),
            });
        }

        let refresh_path = self
            .refresh_path
            .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string());
        if refresh_path.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: "refresh_path".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let timeout = self
            .timeout
            .unwrap_or_else(|| Duration::from_millis(DEFAULT_TIMEOUT_MS));
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                field: "timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(ClientConfig {
            base_url,
            refresh_path,
            timeout,
            user_agent: self.user_agent,
            default_headers: self.default_headers,
        })
    }
}

/// Create a new client configuration builder.
pub fn client_config() -> ClientConfigBuilder {
    ClientConfigBuilder::new()
}
