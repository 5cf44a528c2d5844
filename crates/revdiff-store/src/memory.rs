use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tracing::debug;

use revdiff_types::{ContentId, CopySource, NodeKind, NodeState, Origin, PropMap, RelPath};

use crate::error::{StoreError, StoreResult};
use crate::fixture::{PendingNode, TreeBuilder};
use crate::traits::{NodeStore, WcInfo};

/// One node of a committed revision.
#[derive(Clone, Debug, PartialEq, Eq)]
struct NodeRecord {
    kind: NodeKind,
    content: Option<ContentId>,
    props: PropMap,
    copy_source: Option<CopySource>,
    changed_revision: u64,
}

impl NodeRecord {
    /// Reuse `prev` when nothing about the node changed, so that
    /// `changed_revision` keeps pointing at the last real change.
    fn carry(
        prev: Option<&NodeRecord>,
        kind: NodeKind,
        content: Option<ContentId>,
        props: PropMap,
        copy_source: Option<CopySource>,
        rev: u64,
    ) -> Self {
        match prev {
            Some(old)
                if old.kind == kind
                    && old.content == content
                    && old.props == props
                    && old.copy_source == copy_source =>
            {
                old.clone()
            }
            _ => Self {
                kind,
                content,
                props,
                copy_source,
                changed_revision: rev,
            },
        }
    }

    fn to_state(&self, path: &RelPath, rev: u64) -> NodeState {
        NodeState {
            path: path.clone(),
            kind: self.kind,
            content: self.content,
            props: self.props.clone(),
            origin: Origin::Revision(rev),
            repos_relpath: Some(path.clone()),
            copy_source: None,
            replaced: false,
        }
    }
}

/// One node of the working copy.
#[derive(Clone, Debug)]
struct WcRecord {
    kind: NodeKind,
    content: Option<ContentId>,
    props: PropMap,
    repos_relpath: RelPath,
    base_revision: Option<u64>,
    changed_revision: Option<u64>,
    copy_source: Option<CopySource>,
    replaced: bool,
}

impl WcRecord {
    fn from_base(record: &NodeRecord, repos_relpath: RelPath, rev: u64) -> Self {
        Self {
            kind: record.kind,
            content: record.content,
            props: record.props.clone(),
            repos_relpath,
            base_revision: Some(rev),
            changed_revision: Some(record.changed_revision),
            copy_source: None,
            replaced: false,
        }
    }

    fn added(kind: NodeKind, content: Option<ContentId>, repos_relpath: RelPath, replaced: bool) -> Self {
        Self {
            kind,
            content,
            props: PropMap::new(),
            repos_relpath,
            base_revision: None,
            changed_revision: None,
            copy_source: None,
            replaced,
        }
    }

    fn to_state(&self, path: &RelPath) -> NodeState {
        NodeState {
            path: path.clone(),
            kind: self.kind,
            content: self.content,
            props: self.props.clone(),
            origin: Origin::WorkingCopy,
            repos_relpath: Some(self.repos_relpath.clone()),
            copy_source: self.copy_source.clone(),
            replaced: self.replaced,
        }
    }
}

type Snapshot = BTreeMap<RelPath, NodeRecord>;
type WorkingTree = BTreeMap<RelPath, WcRecord>;

struct State {
    blobs: HashMap<ContentId, Vec<u8>>,
    /// Index `n` holds revision `n`; revision 0 is an empty root.
    revisions: Vec<Snapshot>,
    working: Option<WorkingTree>,
}

impl State {
    fn snapshot(&self, rev: u64) -> StoreResult<&Snapshot> {
        usize::try_from(rev)
            .ok()
            .and_then(|idx| self.revisions.get(idx))
            .ok_or(StoreError::NoSuchRevision(rev))
    }

    fn youngest(&self) -> u64 {
        self.revisions.len().saturating_sub(1) as u64
    }

    fn working(&self) -> StoreResult<&WorkingTree> {
        self.working.as_ref().ok_or(StoreError::NoWorkingCopy)
    }

    fn working_mut(&mut self) -> StoreResult<&mut WorkingTree> {
        self.working.as_mut().ok_or(StoreError::NoWorkingCopy)
    }

    fn store_blob(&mut self, data: Vec<u8>) -> ContentId {
        let id = ContentId::from_bytes(&data);
        self.blobs.entry(id).or_insert(data);
        id
    }

    /// Repository location for a node about to be added at `path`, and
    /// whether the addition replaces a node of the parent's base revision.
    fn new_node_location(&self, path: &RelPath) -> StoreResult<(RelPath, bool)> {
        let wc = self.working()?;
        if wc.contains_key(path) {
            return Err(invalid(path, "already exists"));
        }
        let (Some(parent_path), Some(name)) = (path.parent(), path.file_name()) else {
            return Err(invalid(path, "the root cannot be added"));
        };
        let parent = wc
            .get(&parent_path)
            .filter(|rec| rec.kind == NodeKind::Directory)
            .ok_or_else(|| invalid(path, "parent is not a versioned directory"))?;
        let repos_relpath = parent.repos_relpath.join(name);
        let replaced = match parent.base_revision {
            Some(rev) => self.snapshot(rev)?.contains_key(&repos_relpath),
            None => false,
        };
        Ok((repos_relpath, replaced))
    }
}

fn invalid(path: &RelPath, reason: &str) -> StoreError {
    StoreError::InvalidOperation {
        path: path.clone(),
        reason: reason.to_string(),
    }
}

fn children_of<V>(tree: &BTreeMap<RelPath, V>, path: &RelPath) -> Vec<String> {
    let depth = path.depth() + 1;
    tree.range(path.clone()..)
        .take_while(|(p, _)| p.starts_with(path))
        .filter(|(p, _)| p.depth() == depth)
        .filter_map(|(p, _)| p.file_name().map(str::to_string))
        .collect()
}

/// In-memory store of committed revisions plus one working copy.
///
/// Each revision is a full snapshot (`BTreeMap` of path to record); file
/// bytes live once in a content-addressed blob table. Everything sits behind
/// a single `RwLock`, so reads from both sides of a comparison can proceed
/// concurrently.
///
/// Working-copy mutators mirror the client operations a user would run
/// (`write`, `propset`, `copy`, `switch`, ...) and keep the bookkeeping
/// the diff engine relies on: repository location, base revision, copy
/// source and the replaced flag.
pub struct InMemoryNodeStore {
    state: RwLock<State>,
}

impl InMemoryNodeStore {
    /// Create a store holding only revision 0 (an empty root directory).
    pub fn new() -> Self {
        let mut root = Snapshot::new();
        root.insert(
            RelPath::root(),
            NodeRecord {
                kind: NodeKind::Directory,
                content: None,
                props: PropMap::new(),
                copy_source: None,
                changed_revision: 0,
            },
        );
        Self {
            state: RwLock::new(State {
                blobs: HashMap::new(),
                revisions: vec![root],
                working: None,
            }),
        }
    }

    /// Youngest committed revision.
    pub fn youngest(&self) -> u64 {
        self.state.read().expect("lock poisoned").youngest()
    }

    /// Add bytes to the blob table.
    pub fn put_content(&self, data: &[u8]) -> ContentId {
        self.state
            .write()
            .expect("lock poisoned")
            .store_blob(data.to_vec())
    }

    /// Commit `tree` as the complete content of the next revision.
    pub fn commit(&self, tree: &TreeBuilder) -> StoreResult<u64> {
        if let Some(err) = &tree.error {
            return Err(StoreError::Type(err.clone()));
        }
        let mut state = self.state.write().expect("lock poisoned");
        let rev = state.revisions.len() as u64;

        let mut pending: Vec<(RelPath, NodeKind, Option<ContentId>, PropMap, Option<CopySource>)> =
            Vec::with_capacity(tree.nodes.len() + 1);
        if !tree.nodes.contains_key(&RelPath::root()) {
            pending.push((RelPath::root(), NodeKind::Directory, None, PropMap::new(), None));
        }
        for (path, node) in &tree.nodes {
            if let Some(source) = &node.copy_source {
                if source.revision >= rev {
                    return Err(StoreError::NoSuchRevision(source.revision));
                }
            }
            let content = node.content.clone().map(|data| state.store_blob(data));
            pending.push((
                path.clone(),
                node.kind,
                content,
                node.props.clone(),
                node.copy_source.clone(),
            ));
        }

        let prev = state.snapshot(rev - 1)?;
        let snapshot: Snapshot = pending
            .into_iter()
            .map(|(path, kind, content, props, copy_source)| {
                let record = NodeRecord::carry(prev.get(&path), kind, content, props, copy_source, rev);
                (path, record)
            })
            .collect();

        debug!(rev, nodes = snapshot.len(), "committed revision");
        state.revisions.push(snapshot);
        Ok(rev)
    }

    /// Rebuild the tree of revision `rev`, e.g. to derive the next revision.
    pub fn tree_at(&self, rev: u64) -> StoreResult<TreeBuilder> {
        let state = self.state.read().expect("lock poisoned");
        let mut tree = TreeBuilder::new();
        for (path, record) in state.snapshot(rev)? {
            let content = match &record.content {
                Some(id) => Some(
                    state
                        .blobs
                        .get(id)
                        .cloned()
                        .ok_or(StoreError::MissingContent(*id))?,
                ),
                None => None,
            };
            tree.nodes.insert(
                path.clone(),
                PendingNode {
                    kind: record.kind,
                    content,
                    props: record.props.clone(),
                    copy_source: record.copy_source.clone(),
                },
            );
        }
        Ok(tree)
    }

    /// Check out revision `rev` as the working copy, discarding any
    /// previous working copy.
    pub fn checkout(&self, rev: u64) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        let working: WorkingTree = state
            .snapshot(rev)?
            .iter()
            .map(|(path, record)| (path.clone(), WcRecord::from_base(record, path.clone(), rev)))
            .collect();
        debug!(rev, nodes = working.len(), "checked out working copy");
        state.working = Some(working);
        Ok(())
    }

    /// Commit the working copy as the complete next revision and bring the
    /// working copy up to date with it.
    pub fn commit_working_copy(&self) -> StoreResult<u64> {
        let mut state = self.state.write().expect("lock poisoned");
        let wc = state.working()?;
        if let Some((path, _)) = wc.iter().find(|(path, rec)| rec.repos_relpath != **path) {
            return Err(invalid(path, "cannot commit a switched working copy"));
        }

        let rev = state.revisions.len() as u64;
        let prev = state.snapshot(rev - 1)?;
        let snapshot: Snapshot = wc
            .iter()
            .map(|(path, rec)| {
                let old = prev.get(path);
                let copy_source = match rec.base_revision {
                    None => rec.copy_source.clone(),
                    Some(_) => old.and_then(|o| o.copy_source.clone()),
                };
                let old = if rec.replaced { None } else { old };
                let record = NodeRecord::carry(
                    old,
                    rec.kind,
                    rec.content,
                    rec.props.clone(),
                    copy_source,
                    rev,
                );
                (path.clone(), record)
            })
            .collect();

        let working: WorkingTree = snapshot
            .iter()
            .map(|(path, record)| (path.clone(), WcRecord::from_base(record, path.clone(), rev)))
            .collect();
        debug!(rev, nodes = snapshot.len(), "committed working copy");
        state.revisions.push(snapshot);
        state.working = Some(working);
        Ok(rev)
    }

    // -----------------------------------------------------------------------
    // Working-copy modifications
    // -----------------------------------------------------------------------

    /// Overwrite a file, or add a new one.
    pub fn write_file(&self, path: &str, content: impl AsRef<[u8]>) -> StoreResult<()> {
        let path = RelPath::parse(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        let id = state.store_blob(content.as_ref().to_vec());
        match state.working_mut()?.get_mut(&path) {
            Some(rec) if rec.kind == NodeKind::File => {
                rec.content = Some(id);
                return Ok(());
            }
            Some(_) => return Err(invalid(&path, "not a file")),
            None => {}
        }
        let (repos_relpath, replaced) = state.new_node_location(&path)?;
        state
            .working_mut()?
            .insert(path, WcRecord::added(NodeKind::File, Some(id), repos_relpath, replaced));
        Ok(())
    }

    /// Append bytes to an existing file.
    pub fn append(&self, path: &str, text: impl AsRef<[u8]>) -> StoreResult<()> {
        let path = RelPath::parse(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        let current = state
            .working()?
            .get(&path)
            .filter(|rec| rec.kind == NodeKind::File)
            .and_then(|rec| rec.content)
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        let mut data = state
            .blobs
            .get(&current)
            .cloned()
            .ok_or(StoreError::MissingContent(current))?;
        data.extend_from_slice(text.as_ref());
        let id = state.store_blob(data);
        if let Some(rec) = state.working_mut()?.get_mut(&path) {
            rec.content = Some(id);
        }
        Ok(())
    }

    pub fn set_prop(&self, path: &str, name: &str, value: &str) -> StoreResult<()> {
        let path = RelPath::parse(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        let rec = state
            .working_mut()?
            .get_mut(&path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        rec.props.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn delete_prop(&self, path: &str, name: &str) -> StoreResult<()> {
        let path = RelPath::parse(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        let rec = state
            .working_mut()?
            .get_mut(&path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        rec.props.remove(name);
        Ok(())
    }

    /// Add a new directory.
    pub fn mkdir(&self, path: &str) -> StoreResult<()> {
        let path = RelPath::parse(path)?;
        let mut state = self.state.write().expect("lock poisoned");
        let (repos_relpath, replaced) = state.new_node_location(&path)?;
        state.working_mut()?.insert(
            path,
            WcRecord::added(NodeKind::Directory, None, repos_relpath, replaced),
        );
        Ok(())
    }

    /// Schedule a node and everything below it for deletion.
    pub fn delete(&self, path: &str) -> StoreResult<()> {
        let path = RelPath::parse(path)?;
        if path.is_root() {
            return Err(invalid(&path, "the root cannot be deleted"));
        }
        let mut state = self.state.write().expect("lock poisoned");
        let wc = state.working_mut()?;
        if !wc.contains_key(&path) {
            return Err(StoreError::NotFound(path));
        }
        wc.retain(|p, _| !p.starts_with(&path));
        Ok(())
    }

    /// Copy a node (with history) to a new location.
    ///
    /// Every copied node records the node it came from; nodes that were
    /// themselves added without history stay plain additions.
    pub fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
        let from = RelPath::parse(from)?;
        let to = RelPath::parse(to)?;
        if to.starts_with(&from) {
            return Err(invalid(&to, "cannot copy a node into itself"));
        }
        let mut state = self.state.write().expect("lock poisoned");
        if !state.working()?.contains_key(&from) {
            return Err(StoreError::NotFound(from));
        }
        let (dest_repos, replaced) = state.new_node_location(&to)?;

        let copies: Vec<(RelPath, WcRecord)> = state
            .working()?
            .iter()
            .filter_map(|(path, rec)| {
                let rel = path.strip_prefix(&from)?;
                let copy_source = match rec.base_revision {
                    Some(rev) => Some(CopySource::new(rec.repos_relpath.clone(), rev)),
                    None => rec.copy_source.clone(),
                };
                let record = WcRecord {
                    kind: rec.kind,
                    content: rec.content,
                    props: rec.props.clone(),
                    repos_relpath: dest_repos.join_path(&rel),
                    base_revision: None,
                    changed_revision: None,
                    copy_source,
                    replaced: replaced && rel.is_root(),
                };
                Some((to.join_path(&rel), record))
            })
            .collect();

        debug!(from = %from, to = %to, nodes = copies.len(), "copied in working copy");
        state.working_mut()?.extend(copies);
        Ok(())
    }

    /// Move a node: a copy followed by deletion of the source.
    pub fn move_node(&self, from: &str, to: &str) -> StoreResult<()> {
        self.copy(from, to)?;
        self.delete(from)
    }

    /// Point the working-copy subtree at `path` to `url@rev`.
    ///
    /// `url` is a repository path, optionally written with a leading `^/`.
    pub fn switch(&self, path: &str, url: &str, rev: u64) -> StoreResult<()> {
        let path = RelPath::parse(path)?;
        let url = RelPath::parse(url.trim_start_matches('^'))?;
        let mut state = self.state.write().expect("lock poisoned");
        let State {
            revisions, working, ..
        } = &mut *state;
        let snapshot = usize::try_from(rev)
            .ok()
            .and_then(|idx| revisions.get(idx))
            .ok_or(StoreError::NoSuchRevision(rev))?;
        let wc = working.as_mut().ok_or(StoreError::NoWorkingCopy)?;

        let current_kind = wc
            .get(&path)
            .map(|rec| rec.kind)
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        let target_kind = snapshot
            .get(&url)
            .map(|rec| rec.kind)
            .ok_or_else(|| StoreError::NotFound(url.clone()))?;
        if current_kind != target_kind {
            return Err(invalid(&path, "cannot switch to a node of a different kind"));
        }

        wc.retain(|p, _| !p.starts_with(&path));
        for (repos_path, record) in snapshot.range(url.clone()..) {
            let Some(rel) = repos_path.strip_prefix(&url) else {
                break;
            };
            wc.insert(
                path.join_path(&rel),
                WcRecord::from_base(record, repos_path.clone(), rev),
            );
        }
        debug!(path = %path, url = %url, rev, "switched working copy path");
        Ok(())
    }
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore for InMemoryNodeStore {
    fn get_node(&self, path: &RelPath, origin: Origin) -> StoreResult<Option<NodeState>> {
        let state = self.state.read().expect("lock poisoned");
        match origin {
            Origin::Revision(rev) => Ok(state.snapshot(rev)?.get(path).map(|r| r.to_state(path, rev))),
            Origin::WorkingCopy => Ok(state.working()?.get(path).map(|r| r.to_state(path))),
        }
    }

    fn list_children(&self, path: &RelPath, origin: Origin) -> StoreResult<Vec<String>> {
        let state = self.state.read().expect("lock poisoned");
        match origin {
            Origin::Revision(rev) => {
                let snapshot = state.snapshot(rev)?;
                if !snapshot.contains_key(path) {
                    return Err(StoreError::NotFound(path.clone()));
                }
                Ok(children_of(snapshot, path))
            }
            Origin::WorkingCopy => {
                let wc = state.working()?;
                if !wc.contains_key(path) {
                    return Err(StoreError::NotFound(path.clone()));
                }
                Ok(children_of(wc, path))
            }
        }
    }

    fn get_copy_source(&self, path: &RelPath, origin: Origin) -> StoreResult<Option<CopySource>> {
        let state = self.state.read().expect("lock poisoned");
        match origin {
            Origin::Revision(rev) => Ok(state
                .snapshot(rev)?
                .get(path)
                .and_then(|r| r.copy_source.clone())),
            Origin::WorkingCopy => Ok(state
                .working()?
                .get(path)
                .and_then(|r| r.copy_source.clone())),
        }
    }

    fn read_content(&self, id: &ContentId) -> StoreResult<Option<Vec<u8>>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.blobs.get(id).cloned())
    }

    fn youngest_revision(&self) -> StoreResult<u64> {
        Ok(self.youngest())
    }

    fn wc_info(&self, path: &RelPath) -> StoreResult<Option<WcInfo>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.working()?.get(path).map(|rec| WcInfo {
            repos_relpath: rec.repos_relpath.clone(),
            base_revision: rec.base_revision,
            changed_revision: rec.changed_revision,
        }))
    }
}
