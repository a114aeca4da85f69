//! Token Types
//!
//! Session token definitions.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

/// Access token handed to requests waiting on a refresh.
pub struct AccessToken {
    value: SecretString,
}

impl AccessToken {
    /// Create new access token.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: SecretString::new(value.into()),
        }
    }

    /// Get token value.
    pub fn secret(&self) -> &str {
        self.value.expose_secret()
    }

    /// Format as Authorization header value.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.value.expose_secret())
    }
}

impl Clone for AccessToken {
    fn clone(&self) -> Self {
        Self::new(self.value.expose_secret().clone())
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.secret() == other.secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// The two tokens held by the credential store.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionTokens {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Whether an access token is present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Extract tokens from a sign-in or sign-up response body.
    ///
    /// Tokens are looked up at the top level first, then under `data`.
    pub fn from_payload(payload: &Value) -> Self {
        let access_token = lookup_str(payload, &["accessToken", "access_token", "token"]);
        let refresh_token = lookup_str(payload, &["refreshToken", "refresh_token"]);

        Self {
            access_token,
            refresh_token,
        }
    }
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SessionTokens")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

/// Result of a successful refresh exchange.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    #[serde(rename = "accessToken", alias = "access_token")]
    pub access_token: String,
    /// Rotated refresh token, when the server issues one.
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

impl TokenGrant {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Parse a grant from a refresh response body (top level or under `data`).
    pub fn from_payload(payload: &Value) -> Option<Self> {
        [Some(payload), payload.get("data")]
            .into_iter()
            .flatten()
            .find_map(|candidate| serde_json::from_value::<Self>(candidate.clone()).ok())
    }
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("rotates_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

fn lookup_str(payload: &Value, keys: &[&str]) -> Option<String> {
    let scopes = [Some(payload), payload.get("data")];
    scopes.into_iter().flatten().find_map(|scope| {
        keys.iter()
            .find_map(|key| scope.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    })
}
