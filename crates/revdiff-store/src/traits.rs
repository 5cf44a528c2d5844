use revdiff_types::{ContentId, CopySource, NodeState, Origin, RelPath};

use crate::error::StoreResult;

/// Recorded working-copy metadata for one path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WcInfo {
    /// Repository location the working-copy node tracks.
    pub repos_relpath: RelPath,
    /// Revision of the pristine (`BASE`) node, `None` for local additions.
    pub base_revision: Option<u64>,
    /// Last revision the node changed in, `None` for local additions.
    pub changed_revision: Option<u64>,
}

/// Read-only access to versioned node states.
///
/// Paths are interpreted according to the origin: repository-relative for
/// [`Origin::Revision`], working-copy-relative for [`Origin::WorkingCopy`].
///
/// All implementations must satisfy these invariants:
/// - Calls are synchronous and side-effect free.
/// - Committed revisions never change once visible.
/// - Concurrent reads are always safe (the engine resolves both endpoints
///   of a comparison in parallel).
pub trait NodeStore: Send + Sync {
    /// Read the state of the node at `path`.
    ///
    /// Returns `Ok(None)` if nothing exists there. The returned state has no
    /// copy source; use [`NodeStore::get_copy_source`] for ancestry.
    fn get_node(&self, path: &RelPath, origin: Origin) -> StoreResult<Option<NodeState>>;

    /// Names of the direct children of the directory at `path`, sorted.
    fn list_children(&self, path: &RelPath, origin: Origin) -> StoreResult<Vec<String>>;

    /// The node `path` was copied or moved from, if any.
    fn get_copy_source(&self, path: &RelPath, origin: Origin) -> StoreResult<Option<CopySource>>;

    /// Read the bytes behind a content handle.
    fn read_content(&self, id: &ContentId) -> StoreResult<Option<Vec<u8>>>;

    /// The youngest committed revision (`HEAD`).
    fn youngest_revision(&self) -> StoreResult<u64>;

    /// Working-copy metadata for `path`, `None` if the path is unversioned.
    fn wc_info(&self, path: &RelPath) -> StoreResult<Option<WcInfo>>;
}
