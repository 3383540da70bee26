//! # tome_config - Configuration for tome
//!
//! TOML configuration with path discovery. The `[loader]` section tunes the
//! file loader, `[logging]` the log output.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod settings;

pub use config::*;
pub use error::*;
pub use settings::*;
