//! Error types shared across the crate

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-class errors. These are fatal and surface before any
/// search is dispatched.
#[derive(Debug, Error)]
pub enum Error {
    #[error("model directory does not exist: {}", .0.display())]
    ModelDirNotFound(PathBuf),

    #[error("no .{extension} model files found in {}", .dir.display())]
    NoModels { dir: PathBuf, extension: String },

    #[error("input sequence file does not exist: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a single search invocation. Always recovered by the
/// dispatcher, which treats the model as having produced zero hits.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with {status}")]
    Failed {
        binary: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("search produced no tabular output at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("temporary output file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("search task panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, Error>;
