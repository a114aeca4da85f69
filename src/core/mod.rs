//! Core Components
//!
//! Request preparation and the HTTP transport boundary.

pub mod normalizer;
pub mod transport;

pub use normalizer::*;
pub use transport::*;
