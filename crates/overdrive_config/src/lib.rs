//! Parsing and validation of `overdrive.toml` simulation settings.
//!
//! This crate reads the optional configuration file of a testbench run and
//! produces a strongly-typed [`OverdriveConfig`]. A missing table or field
//! falls back to its default, so an empty file is a valid configuration.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
