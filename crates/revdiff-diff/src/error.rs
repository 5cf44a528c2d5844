//! Error types for the diff crate.

use revdiff_types::ContentId;

/// Errors that can occur while computing or writing a diff.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A comparison target does not exist on either side.
    #[error("'{0}' was not found")]
    NotFound(String),

    /// Incompatible or invalid options. Raised before any resolution work.
    #[error("{0}")]
    Usage(String),

    /// The requested comparison cannot be expressed (e.g. a working-copy
    /// revision keyword on a repository target).
    #[error("unsupported comparison: {0}")]
    UnsupportedComparison(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] revdiff_store::StoreError),

    /// A node references content the store does not have.
    #[error("content {0} is missing from the store")]
    MissingContent(ContentId),

    /// Writing the rendered output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
