// src/config/model.rs

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [runtime]
/// worker_threads = 4
/// thread_name = "asyncproc-worker"
/// inline_depth = 16
///
/// [logging]
/// level = "debug"
///
/// [demo]
/// producers = 8
/// chain_length = 16
/// fail_at = 5
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub demo: DemoSection,
}

/// Validated configuration. Build one with `ConfigFile::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub runtime: RuntimeSection,
    pub logging: LoggingSection,
    pub demo: DemoSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        runtime: RuntimeSection,
        logging: LoggingSection,
        demo: DemoSection,
    ) -> Self {
        Self {
            runtime,
            logging,
            demo,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.runtime, raw.logging, raw.demo)
    }
}

/// `[runtime]` section: the shared Tokio runtime and inline execution.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    /// Worker threads for the shared runtime. Tokio's default (one per core)
    /// when omitted.
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Upper bound on the blocking pool that runs actions.
    #[serde(default)]
    pub max_blocking_threads: Option<usize>,

    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// How many run steps an `InlineExecutor` may nest on one thread before
    /// handing off.
    #[serde(default = "default_inline_depth")]
    pub inline_depth: usize,
}

fn default_thread_name() -> String {
    "asyncproc-worker".to_string()
}

fn default_inline_depth() -> usize {
    16
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_blocking_threads: None,
            thread_name: default_thread_name(),
            inline_depth: default_inline_depth(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    /// "error", "warn", "info", "debug" or "trace".
    #[serde(default)]
    pub level: Option<String>,
}

/// `[demo]` section: shape of the dataflow the `asyncproc` binary runs.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoSection {
    /// Procs feeding the sink, one gate each.
    #[serde(default = "default_producers")]
    pub producers: usize,

    /// Procs in the chain after the sink.
    #[serde(default = "default_chain_length")]
    pub chain_length: usize,

    /// Index in the chain whose action fails.
    #[serde(default)]
    pub fail_at: Option<usize>,
}

fn default_producers() -> usize {
    8
}

fn default_chain_length() -> usize {
    16
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            producers: default_producers(),
            chain_length: default_chain_length(),
            fail_at: None,
        }
    }
}
