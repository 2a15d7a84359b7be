//! Pool sizing policy and thread options.
//!
//! # Sizing precedence
//!
//! The worker count is resolved in this order (highest priority first):
//!
//! 1. **Programmatic** — a positive size set via [`PoolConfig::size`]
//! 2. **Environment** — the [`ENV_POOL_SIZE`] variable
//! 3. **Host** — [`std::thread::available_parallelism`]
//! 4. **Default** — [`DEFAULT_POOL_SIZE`]
//!
//! The size is fixed for the lifetime of the pool.
//!
//! With the `config-file` feature enabled, a TOML file can seed the
//! configuration before programmatic overrides are applied:
//!
//! ```toml
//! [pool]
//! size = 8
//! thread_name_prefix = "myapp-pool"
//! ```

use crate::error::{Error, ErrorKind, Result};
use crate::worker::ThreadCallback;
use std::fmt;

/// Environment variable consulted when no explicit size is configured.
pub const ENV_POOL_SIZE: &str = "POOL_SIZE";

/// Fallback worker count when neither the environment nor the host CPU
/// count yields a usable value.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Configuration for a [`Threadpool`](crate::Threadpool).
#[derive(Clone, Default)]
pub struct PoolConfig {
    pub(crate) size: Option<usize>,
    pub(crate) thread_name_prefix: Option<String>,
    pub(crate) on_thread_start: Option<ThreadCallback>,
    pub(crate) on_thread_stop: Option<ThreadCallback>,
}

impl PoolConfig {
    /// Creates a configuration that resolves everything by policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit worker count.
    ///
    /// Zero means "unset" and falls back to the environment/CPU policy.
    #[must_use]
    pub fn size(mut self, size: usize) -> Self {
        self.size = (size > 0).then_some(size);
        self
    }

    /// Sets the worker thread name prefix (default `taskpool-worker`).
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    /// Sets a callback invoked on each worker thread as it starts.
    #[must_use]
    pub fn on_thread_start(mut self, callback: ThreadCallback) -> Self {
        self.on_thread_start = Some(callback);
        self
    }

    /// Sets a callback invoked on each worker thread as it exits.
    #[must_use]
    pub fn on_thread_stop(mut self, callback: ThreadCallback) -> Self {
        self.on_thread_stop = Some(callback);
        self
    }

    /// Resolves the effective worker count per the precedence above.
    ///
    /// A set-but-unparseable environment value is an error; an unset or
    /// zero value falls through to the host CPU count.
    pub fn resolved_size(&self) -> Result<usize> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        if let Some(raw) = read_env(ENV_POOL_SIZE) {
            let size = parse_usize(ENV_POOL_SIZE, &raw)?;
            if size > 0 {
                return Ok(size);
            }
        }
        Ok(std::thread::available_parallelism()
            .map_or(DEFAULT_POOL_SIZE, std::num::NonZeroUsize::get))
    }

    pub(crate) fn prefix(&self) -> &str {
        self.thread_name_prefix.as_deref().unwrap_or("taskpool-worker")
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("size", &self.size)
            .field("thread_name_prefix", &self.prefix())
            .field("on_thread_start", &self.on_thread_start.is_some())
            .field("on_thread_stop", &self.on_thread_stop.is_some())
            .finish()
    }
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize> {
    val.trim().parse::<usize>().map_err(|e| {
        Error::new(ErrorKind::InvalidConfig).with_context(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?} ({e})"
        ))
    })
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable pool configuration.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct PoolTomlConfig {
    /// Pool settings.
    #[serde(default)]
    pub pool: PoolToml,
}

/// Pool section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct PoolToml {
    /// Number of worker threads.
    pub size: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name_prefix: Option<String>,
}

#[cfg(feature = "config-file")]
impl PoolConfig {
    /// Applies a parsed TOML config.
    ///
    /// Meant to run before programmatic setters, so that builder calls
    /// override file values.
    #[must_use]
    pub fn apply_toml(mut self, toml: &PoolTomlConfig) -> Self {
        if let Some(size) = toml.pool.size {
            self = self.size(size);
        }
        if let Some(prefix) = &toml.pool.thread_name_prefix {
            self = self.thread_name_prefix(prefix.clone());
        }
        self
    }

    /// Loads configuration from a TOML file.
    pub fn from_config_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::new(ErrorKind::InvalidConfig)
                .with_context("failed to read config file")
                .with_source(e)
        })?;
        let parsed: PoolTomlConfig = toml::from_str(&text).map_err(|e| {
            Error::new(ErrorKind::InvalidConfig)
                .with_context("failed to parse config file")
                .with_source(e)
        })?;
        Ok(Self::new().apply_toml(&parsed))
    }
}
