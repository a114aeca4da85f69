//! Session Client Integration Module
//!
//! Session-aware HTTP client with coordinated access-token refresh.
//!
//! # Features
//!
//! - Base URL resolution, bearer injection and JSON or multipart encoding
//! - Single-flight token refresh: concurrent 401s share one refresh exchange
//! - Queued requests replayed with the new token, or all rejected together
//! - At most one retry per request
//! - One normalized error shape (`message` + `status`) for every failure
//! - Pluggable credential stores (in-memory, JSON file, mock)
//!
//! # Example
//!
//! ```rust,ignore
//! use session_client_integration::{client_config, ApiClient, RequestDescriptor};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build configuration using the fluent builder
//!     let config = client_config()
//!         .base_url("https://api.example.com")
//!         .refresh_path("/auth/refresh-token")
//!         .user_agent("my-app/1.0")
//!         .build()?;
//!
//!     let client = ApiClient::new(config)?;
//!
//!     // Sign in; tokens and the user snapshot are persisted
//!     client
//!         .sign_in(RequestDescriptor::post("/auth/login").json(json!({
//!             "email": "user@example.com",
//!             "password": "secret",
//!         })))
//!         .await?;
//!
//!     // Authenticated request; an expired token is refreshed transparently
//!     let profile = client.get("/me").await?;
//!     println!("Profile: {}", profile.data);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: request descriptors, responses, tokens and configuration
//! - `error`: the normalized error shape and the failure normalizer
//! - `core`: request normalization and the HTTP transport boundary
//! - `token`: credential storage, refresh exchange and the refresh coordinator
//! - `builders`: fluent builder for configuration
//! - `telemetry`: metrics seam (logging goes through `tracing`)
//! - `client`: high-level client combining all of the above

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{api_client, ApiClient};

// Re-export builders
pub use builders::{client_config, ClientConfigBuilder};

// Re-export errors
pub use error::{
    normalize_failure, normalize_response, ApiError, ApiResult, ConfigurationError, ErrorMessage,
    RawFailure, StorageError, GENERIC_ERROR_MESSAGE, INTERNAL_ERROR_STATUS,
    SERVICE_UNAVAILABLE_STATUS, UNAUTHORIZED_STATUS,
};

// Re-export types
pub use types::{
    // Config
    ClientConfig,
    // Request
    FormField, FormValue, HttpMethod, RequestBody, RequestDescriptor,
    // Response
    ApiResponse,
    // Token
    AccessToken, SessionTokens, TokenGrant,
};

// Re-export core components
pub use core::{
    // Normalizer
    RequestNormalizer,
    // Transport
    HttpTransport, MockHttpTransport, PreparedBody, PreparedRequest, ReqwestHttpTransport,
};

// Re-export token management
pub use token::{
    // Storage
    CredentialStore, FileCredentialStore, InMemoryCredentialStore, MockCredentialStore,
    // Exchange
    HttpRefreshExchange, RefreshExchange,
    // Coordinator
    RefreshCoordinator, RefreshStats,
};

// Re-export telemetry
pub use telemetry::{
    create_in_memory_metrics, no_op_metrics, ClientMetrics, InMemoryMetrics, MetricEntry,
    MetricLabels, MetricNames, NoOpMetrics,
};
