//! Foundation types for revdiff.
//!
//! This crate provides the value types shared by the store, the diff engine
//! and the command-line front end. Every other revdiff crate depends on
//! `revdiff-types`.
//!
//! # Key Types
//!
//! - [`ContentId`] - Content-addressed handle to file bytes (BLAKE3 hash)
//! - [`RelPath`] - Tree-relative path with depth-first ordering
//! - [`NodeState`] - One node of a resolved tree (file, directory or nonexistent)
//! - [`Origin`] - Where a node state was read from (revision or working copy)
//! - [`CopySource`] - Copy/move ancestry of a node
//! - [`RevisionSpec`] - Revision number or keyword (`HEAD`, `BASE`, ...)
//! - [`EolStyle`] - Effective line-ending policy of a file

pub mod content;
pub mod error;
pub mod node;
pub mod path;
pub mod revision;

pub use content::ContentId;
pub use error::TypeError;
pub use node::{
    CopySource, EolStyle, NodeKind, NodeState, Origin, PropMap, PROP_EOL_STYLE, PROP_EXECUTABLE,
    PROP_MIME_TYPE,
};
pub use path::RelPath;
pub use revision::RevisionSpec;
