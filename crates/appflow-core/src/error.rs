use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by driver lifecycle operations.
///
/// Every variant is fatal for the call that produced it; there are no
/// automatic retries. Partial work (a half-copied template tree, a
/// half-built environment) is left in place and re-invocation is the
/// documented recovery path.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("asset tree '{prefix}' not found under {root:?}")]
    AssetNotFound { prefix: String, root: PathBuf },

    #[error("i/o failure on {path:?}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    PreconditionNotMet { message: String },

    #[error("'{program}' invocation failed: {reason}\n{output}")]
    ToolInvocationFailure {
        program: String,
        reason: String,
        output: String,
    },

    #[error("dev environment failure: {reason}\n{output}")]
    EnvironmentFailure { reason: String, output: String },

    #[error("infrastructure lookup failed: {0}")]
    LookupFailure(String),

    #[error("no driver registered for application kind '{0}'")]
    DriverNotFound(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

impl DriverError {
    /// Wraps an i/o error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }
}
