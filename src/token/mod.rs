//! Token Management
//!
//! Credential persistence and the single-flight refresh cycle.
//!
//! This module provides:
//!
//! - **Credential Store**: async key-value persistence for tokens and the user snapshot
//! - **Refresh Exchange**: the network call trading a refresh token for an access token
//! - **Refresh Coordinator**: at most one refresh in flight, with queued replays

pub mod coordinator;
pub mod exchange;
pub mod storage;

// Credential Store
pub use storage::{
    CredentialStore, FileCredentialStore, InMemoryCredentialStore, MockCredentialStore,
    ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY,
};

// Refresh Exchange
pub use exchange::{HttpRefreshExchange, RefreshExchange};

// Refresh Coordinator
pub use coordinator::{RefreshCoordinator, RefreshStats};
