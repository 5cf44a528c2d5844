use revdiff_types::{ContentId, RelPath, TypeError};

/// Errors from node store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested path does not exist where an existing node is required.
    #[error("path not found: '{0}'")]
    NotFound(RelPath),

    /// The revision is newer than the youngest revision.
    #[error("no such revision {0}")]
    NoSuchRevision(u64),

    /// The store has no working copy checked out.
    #[error("no working copy is available")]
    NoWorkingCopy,

    /// Content referenced by a node is missing from the blob table.
    #[error("content {0} is missing")]
    MissingContent(ContentId),

    /// A working-copy or commit operation was not applicable.
    #[error("invalid operation on '{path}': {reason}")]
    InvalidOperation { path: RelPath, reason: String },

    /// Fixture data could not be decoded.
    #[error("fixture error: {0}")]
    Fixture(String),

    /// Invalid path or revision text.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// I/O error reading a fixture file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
