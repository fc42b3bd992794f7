//! Error types for parsing, registry loading, and directory scans.
//!
//! Application edges (config loading, CLI commands, server startup) use
//! `anyhow`; the core operations return these typed errors so the router
//! can map each failure kind to its own HTTP status.

use std::path::PathBuf;

use thiserror::Error;

/// A document whose metadata block could not be decoded.
///
/// `line` and `column` are 1-based and relative to the start of the file,
/// not to the metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse metadata in {file} at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Failures while building the collection registry. All of them are fatal
/// at startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("collection #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate collection name: '{0}'")]
    DuplicateName(String),

    #[error("collection '{0}' has an empty folder")]
    EmptyFolder(String),

    #[error("cannot resolve folder for collection '{name}': {source}")]
    UnresolvableFolder {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of a whole-collection scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
