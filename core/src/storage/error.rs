//! Error types for encounter persistence

use std::path::PathBuf;
use thiserror::Error;

/// Errors from an encounter store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create data directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open history file {path}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write history file {path}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record at {path}:{line}")]
    Decode {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode record")]
    Encode(#[from] serde_json::Error),
}
