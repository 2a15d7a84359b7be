//! Error types for pool construction and configuration.
//!
//! Error handling in this crate follows a narrow policy:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - The only runtime condition surfaced to producers is the boolean
//!   result of a cancel request; everything else is either a rejected
//!   submission (a `false` from the queue), a local no-op (an invalid
//!   state transition leaves the state unchanged), or fatal
//! - Construction-time failures (thread spawn, bad configuration) are
//!   the domain of [`Error`]

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A worker's backing OS thread could not be created.
    ThreadSpawn,
    /// A configuration value could not be parsed or is out of range.
    InvalidConfig,
}

/// The main error type for taskpool operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    context: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Adds context text to the error.
    #[must_use]
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.kind {
            ErrorKind::ThreadSpawn => "failed to spawn worker thread",
            ErrorKind::InvalidConfig => "invalid configuration",
        };
        match &self.context {
            Some(ctx) => write!(f, "{base}: {ctx}"),
            None => write!(f, "{base}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience result alias for taskpool operations.
pub type Result<T> = std::result::Result<T, Error>;
