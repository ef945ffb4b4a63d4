//! Error types for the service layer.

use thiserror::Error;

/// Errors raised by discovery, watching, or the service façade.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Graph construction or resolution failure.
    #[error(transparent)]
    Graph(#[from] lode_graph::GraphError),

    /// A configured glob pattern could not be compiled.
    #[error("invalid pattern \"{pattern}\": {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    /// Directory traversal failure during bulk discovery.
    #[error("discovery failed: {0}")]
    Walk(#[source] ignore::Error),

    /// File watcher failure.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error outside of a single module load.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured working directory does not exist.
    #[error("working directory not found: {}", .0.display())]
    CwdNotFound(std::path::PathBuf),
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
