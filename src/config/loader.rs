// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, DemoSection, RawConfigFile};
use crate::errors::Result;

/// Parse a TOML config file into a [`RawConfigFile`]. No semantic checks;
/// see [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str(&contents)?)
}

/// Like [`load_from_path`], but a file that does not exist yields the
/// built-in defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(RawConfigFile::default());
    }
    load_from_path(path)
}

/// Read, apply section defaults, then check runtime sizes, the logging
/// level and the demo shape.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}

/// Command-line values that replace `[demo]` settings before validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoOverrides {
    pub producers: Option<usize>,
    pub chain_length: Option<usize>,
    pub fail_at: Option<usize>,
}

impl DemoOverrides {
    pub fn apply(&self, demo: &mut DemoSection) {
        if let Some(producers) = self.producers {
            demo.producers = producers;
        }
        if let Some(chain_length) = self.chain_length {
            demo.chain_length = chain_length;
        }
        if self.fail_at.is_some() {
            demo.fail_at = self.fail_at;
        }
    }
}
