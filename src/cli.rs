// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::DemoOverrides;

/// Command-line arguments for `asyncproc`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "asyncproc",
    version,
    about = "Run a gated dataflow of asynchronous procedures.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `AsyncProc.toml` in the current working directory. A missing
    /// file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "AsyncProc.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASYNCPROC_LOG`, then `[logging].level`, is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Number of producer procs feeding the sink.
    #[arg(long, value_name = "N")]
    pub producers: Option<usize>,

    /// Number of procs in the chain after the sink.
    #[arg(long, value_name = "N")]
    pub chain_length: Option<usize>,

    /// Make the chain proc at this index fail.
    #[arg(long, value_name = "INDEX")]
    pub fail_at: Option<usize>,

    /// Parse + validate, print the effective configuration, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn demo_overrides(&self) -> DemoOverrides {
        DemoOverrides {
            producers: self.producers,
            chain_length: self.chain_length,
            fail_at: self.fail_at,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
