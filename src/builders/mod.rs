//! Builders
//!
//! Fluent builder patterns for client configuration.

pub mod config;

pub use config::{client_config, ClientConfigBuilder};
