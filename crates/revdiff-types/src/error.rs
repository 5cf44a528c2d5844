use thiserror::Error;

/// Errors produced by type operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("syntax error in revision argument '{0}'")]
    InvalidRevision(String),

    #[error("unrecognized eol style '{0}'")]
    InvalidEolStyle(String),

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}
