//! Driver error types.

use std::path::PathBuf;

use thiserror::Error;
use vscript_types::GraphError;

/// A failure that stops the driver from producing output.
///
/// Problems inside a graph never end up here; they are diagnostics.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid compiler configuration: {0}")]
    Config(String),
}

impl CompileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for the driver.
pub type CompileResult<T> = std::result::Result<T, CompileError>;
