//! Configuration Types
//!
//! Client configuration types.

use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::error::ConfigurationError;

/// API client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Origin applied to every relative request path.
    pub base_url: Url,
    /// Path of the refresh exchange endpoint, relative to `base_url`.
    pub refresh_path: String,
    /// HTTP timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: Option<String>,
    /// Headers added to every request unless the descriptor overrides them.
    pub default_headers: HashMap<String, String>,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the base URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: None,
            default_headers: HashMap::new(),
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// Reads `API_CLIENT_BASE_URL` (required), `API_CLIENT_REFRESH_PATH` and
    /// `API_CLIENT_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        crate::builders::ClientConfigBuilder::from_env()?.build()
    }
}

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";

/// Environment variable names.
pub const ENV_BASE_URL: &str = "API_CLIENT_BASE_URL";
pub const ENV_REFRESH_PATH: &str = "API_CLIENT_REFRESH_PATH";
pub const ENV_TIMEOUT_SECS: &str = "API_CLIENT_TIMEOUT_SECS";
