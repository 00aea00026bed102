//! # keeper-core
//!
//! Core types, configuration, and utilities for Keeper.
//!
//! This crate provides shared functionality used across all Keeper crates:
//!
//! - **Configuration**: Loading, validation, and environment overrides
//! - **Types**: Data items, item filters, user accounts, caller identity
//! - **Utilities**: Path resolution, ID generation, and secret handling

pub mod config;
pub mod env;
pub mod error;
pub mod id;
pub mod paths;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use secret::SecretString;
pub use types::*;
