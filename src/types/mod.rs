//! Client Types
//!
//! Core type definitions for requests, responses, tokens and configuration.

pub mod config;
pub mod request;
pub mod response;
pub mod token;

pub use config::*;
pub use request::*;
pub use response::*;
pub use token::*;
