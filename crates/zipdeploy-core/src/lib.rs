//! Core types and configuration for zipdeploy.
//!
//! This crate defines the `zipdeploy.toml` schema ([`DeployConfig`]),
//! the per-environment view handed to the packager ([`EnvConfig`]),
//! and shared error types.

pub mod config;
pub mod error;

pub use config::{
    CANONICAL_DESCRIPTOR, CANONICAL_EXTENSIONS_DIR, CONFIG_FILE, DeployConfig, EnvConfig,
    EnvSettings,
};
pub use error::{Error, Result};
