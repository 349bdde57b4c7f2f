// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and apply CLI overrides (`loader.rs`).
//! - Validate runtime, logging and demo settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DemoOverrides, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, DemoSection, LoggingSection, RawConfigFile, RuntimeSection};
pub use validate::validate_config;
