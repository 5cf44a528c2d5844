//! Node storage for revdiff.
//!
//! The diff engine never touches on-disk formats. It reads resolved node
//! states through the [`NodeStore`] trait: committed revisions addressed by
//! repository path, and the working copy addressed by working-copy path.
//!
//! # Storage Backends
//!
//! - [`InMemoryNodeStore`] - snapshot-per-revision store with a mutable
//!   working copy, used by tests and by the CLI (loaded from a fixture)
//!
//! # Design Rules
//!
//! 1. Committed revisions are immutable snapshots.
//! 2. File content is content-addressed ([`ContentId`](revdiff_types::ContentId)).
//! 3. Every trait call is synchronous, read-only and side-effect free.
//! 4. Concurrent reads are always safe.
//! 5. All errors are propagated, never silently ignored.

pub mod error;
pub mod fixture;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fixture::{greek_tree, RepositoryFixture, TreeBuilder};
pub use memory::InMemoryNodeStore;
pub use traits::{NodeStore, WcInfo};
