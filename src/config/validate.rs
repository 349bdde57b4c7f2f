// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AsyncProcError, Result};
use crate::logging::parse_level_str;

/// Largest accepted `[runtime].inline_depth`.
pub const MAX_INLINE_DEPTH: usize = 1024;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AsyncProcError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.runtime, raw.logging, raw.demo))
    }
}

pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_runtime(cfg)?;
    validate_logging(cfg)?;
    validate_demo(cfg)?;
    Ok(())
}

fn validate_runtime(cfg: &RawConfigFile) -> Result<()> {
    let rt = &cfg.runtime;

    if rt.worker_threads == Some(0) {
        return Err(AsyncProcError::ConfigError(
            "[runtime].worker_threads must be >= 1 (got 0)".to_string(),
        ));
    }
    if rt.max_blocking_threads == Some(0) {
        return Err(AsyncProcError::ConfigError(
            "[runtime].max_blocking_threads must be >= 1 (got 0)".to_string(),
        ));
    }
    if rt.inline_depth == 0 || rt.inline_depth > MAX_INLINE_DEPTH {
        return Err(AsyncProcError::ConfigError(format!(
            "[runtime].inline_depth must be in 1..={} (got {})",
            MAX_INLINE_DEPTH, rt.inline_depth
        )));
    }
    if rt.thread_name.trim().is_empty() {
        return Err(AsyncProcError::ConfigError(
            "[runtime].thread_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(cfg: &RawConfigFile) -> Result<()> {
    if let Some(level) = &cfg.logging.level {
        if parse_level_str(level).is_none() {
            return Err(AsyncProcError::ConfigError(format!(
                "[logging].level '{}' is not one of error, warn, info, debug, trace",
                level
            )));
        }
    }
    Ok(())
}

fn validate_demo(cfg: &RawConfigFile) -> Result<()> {
    let demo = &cfg.demo;

    if demo.producers == 0 {
        return Err(AsyncProcError::ConfigError(
            "[demo].producers must be >= 1 (got 0)".to_string(),
        ));
    }
    if demo.chain_length == 0 {
        return Err(AsyncProcError::ConfigError(
            "[demo].chain_length must be >= 1 (got 0)".to_string(),
        ));
    }
    if let Some(fail_at) = demo.fail_at {
        if fail_at >= demo.chain_length {
            return Err(AsyncProcError::ConfigError(format!(
                "[demo].fail_at ({}) must be less than chain_length ({})",
                fail_at, demo.chain_length
            )));
        }
    }
    Ok(())
}
