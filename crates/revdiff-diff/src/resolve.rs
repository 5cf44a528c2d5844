//! Node resolution: turning a comparison endpoint into a tree of node states.
//!
//! An endpoint is a target (working-copy path or repository path) plus a
//! revision. Working-copy targets at `WORKING` are read from the working
//! copy; at any other revision they are mapped to their recorded repository
//! location. The resulting [`NodeTree`] is keyed by paths relative to the
//! target, so both sides of a comparison line up regardless of where they
//! were read from.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use revdiff_store::{NodeStore, StoreError};
use revdiff_types::{CopySource, NodeKind, NodeState, Origin, RelPath, RevisionSpec};

use crate::error::{DiffError, DiffResult};
use crate::options::{Depth, DiffOptions};

/// What an endpoint names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// A path inside the working copy.
    WorkingCopy(RelPath),
    /// A repository path (written `^/path`).
    Url(RelPath),
}

impl Target {
    /// Parse a target as written by a user.
    ///
    /// `^/path` names a repository path. Anything else is a working-copy path
    /// relative to `cwd`; `..` components are applied lexically and may not
    /// climb above the working-copy root.
    pub fn parse(text: &str, cwd: &RelPath) -> DiffResult<Self> {
        if let Some(url) = text.strip_prefix("^/") {
            let path = RelPath::parse(url).map_err(|e| DiffError::Usage(e.to_string()))?;
            return Ok(Self::Url(path));
        }
        let mut parts: Vec<&str> = cwd.components().collect();
        for component in text.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(DiffError::Usage(format!(
                            "'{text}' is outside the working copy"
                        )));
                    }
                }
                name => parts.push(name),
            }
        }
        let path = RelPath::parse(&parts.join("/")).map_err(|e| DiffError::Usage(e.to_string()))?;
        Ok(Self::WorkingCopy(path))
    }

    pub fn is_working_copy(&self) -> bool {
        matches!(self, Self::WorkingCopy(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkingCopy(path) if path.is_root() => write!(f, "."),
            Self::WorkingCopy(path) => write!(f, "{path}"),
            Self::Url(path) => write!(f, "^/{path}"),
        }
    }
}

/// One side of a comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub target: Target,
    pub revision: RevisionSpec,
}

impl Endpoint {
    pub fn new(target: Target, revision: RevisionSpec) -> Self {
        Self { target, revision }
    }

    /// The working copy as it is on disk.
    pub fn working(path: RelPath) -> Self {
        Self::new(Target::WorkingCopy(path), RevisionSpec::Working)
    }
}

/// A resolved tree: every node below the endpoint's target, keyed by path
/// relative to the target and iterated depth-first.
#[derive(Clone, Debug)]
pub struct NodeTree {
    pub origin: Origin,
    /// Location of the root: the repository path for revision trees, the
    /// working-copy path for working trees.
    pub location: RelPath,
    pub nodes: BTreeMap<RelPath, NodeState>,
    /// Copy sources referenced by nodes of this tree, resolved at their
    /// source revision.
    pub copy_sources: BTreeMap<CopySource, NodeState>,
}

impl NodeTree {
    fn absent(origin: Origin, location: RelPath) -> Self {
        Self {
            origin,
            location,
            nodes: BTreeMap::new(),
            copy_sources: BTreeMap::new(),
        }
    }

    /// Returns `true` if the root did not exist at the origin.
    pub fn is_absent(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&NodeState> {
        self.nodes.get(&RelPath::root())
    }

    pub fn get(&self, path: &RelPath) -> Option<&NodeState> {
        self.nodes.get(path)
    }

    /// The resolved node a copy source refers to.
    pub fn copy_source(&self, source: &CopySource) -> Option<&NodeState> {
        self.copy_sources.get(source)
    }
}

/// Where an endpoint's root lives in the store.
struct Located {
    origin: Origin,
    /// Path to read from the store at `origin`.
    store_path: RelPath,
}

/// Resolve an endpoint into a tree.
///
/// Fails with [`DiffError::NotFound`] if the target does not exist at the
/// endpoint's origin.
pub fn resolve(store: &dyn NodeStore, endpoint: &Endpoint, options: &DiffOptions) -> DiffResult<NodeTree> {
    let tree = resolve_tree(store, endpoint, options)?;
    if tree.is_absent() {
        return Err(DiffError::NotFound(endpoint.target.to_string()));
    }
    Ok(tree)
}

/// Resolve both endpoints concurrently.
///
/// A target missing on one side yields an empty tree for that side (the
/// whole target then shows as added or deleted); missing on both sides is
/// a [`DiffError::NotFound`].
pub fn resolve_pair(
    store: &dyn NodeStore,
    old: &Endpoint,
    new: &Endpoint,
    options: &DiffOptions,
) -> DiffResult<(NodeTree, NodeTree)> {
    let (old_tree, new_tree) = std::thread::scope(|s| {
        let handle = s.spawn(|| resolve_tree(store, old, options));
        let new_tree = resolve_tree(store, new, options);
        let old_tree = match handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        (old_tree, new_tree)
    });
    let (old_tree, new_tree) = (old_tree?, new_tree?);
    if old_tree.is_absent() && new_tree.is_absent() {
        return Err(DiffError::NotFound(new.target.to_string()));
    }
    Ok((old_tree, new_tree))
}

fn resolve_tree(store: &dyn NodeStore, endpoint: &Endpoint, options: &DiffOptions) -> DiffResult<NodeTree> {
    let Located { origin, store_path } = locate(store, endpoint)?;
    let mut tree = NodeTree::absent(origin, store_path.clone());
    let Some(root) = store.get_node(&store_path, origin)? else {
        debug!(endpoint = %endpoint.target, %origin, "endpoint root does not exist");
        return Ok(tree);
    };

    let root_is_dir = root.is_dir();
    let mut walker = Walker {
        store,
        origin,
        base: &store_path,
        track_copies: options.tracks_copies(origin),
        tree: &mut tree,
    };
    walker.visit(root, RelPath::root(), None)?;
    if root_is_dir {
        walker.descend(&RelPath::root(), options.depth)?;
    }

    debug!(
        endpoint = %endpoint.target,
        %origin,
        location = %tree.location,
        nodes = tree.nodes.len(),
        copy_sources = tree.copy_sources.len(),
        "resolved endpoint"
    );
    Ok(tree)
}

/// Depth-first walk below an endpoint root.
struct Walker<'a> {
    store: &'a dyn NodeStore,
    origin: Origin,
    base: &'a RelPath,
    track_copies: bool,
    tree: &'a mut NodeTree,
}

impl Walker<'_> {
    fn descend(&mut self, dir: &RelPath, depth: Depth) -> DiffResult<()> {
        let children = self.store.list_children(&self.base.join_path(dir), self.origin)?;
        let inherited = self.tree.get(dir).and_then(|d| d.copy_source.clone());
        for name in children {
            let rel = dir.join(&name);
            let Some(node) = self.store.get_node(&self.base.join_path(&rel), self.origin)? else {
                continue;
            };
            let include = match depth {
                Depth::Empty => false,
                Depth::Files => node.is_file(),
                Depth::Immediates | Depth::Infinity => true,
            };
            if !include {
                continue;
            }
            let parent_source = inherited.as_ref().map(|s| s.descend(&RelPath::root().join(&name)));
            let is_dir = node.is_dir();
            self.visit(node, rel.clone(), parent_source)?;
            if is_dir && depth == Depth::Infinity {
                self.descend(&rel, depth)?;
            }
        }
        Ok(())
    }

    /// Record `node` at `rel`, attaching its copy source when copies are
    /// tracked.
    fn visit(&mut self, mut node: NodeState, rel: RelPath, parent_source: Option<CopySource>) -> DiffResult<()> {
        node.path = rel.clone();
        node.copy_source = if self.track_copies {
            self.copy_source_of(&rel, parent_source)?
        } else {
            None
        };
        self.tree.nodes.insert(rel, node);
        Ok(())
    }

    fn copy_source_of(&mut self, rel: &RelPath, parent_source: Option<CopySource>) -> DiffResult<Option<CopySource>> {
        let own = self
            .store
            .get_copy_source(&self.base.join_path(rel), self.origin)?;
        // Repository history records ancestry on the copy root only; its
        // children follow the root's source.
        let source = match (own, self.origin) {
            (Some(source), _) => source,
            (None, Origin::Revision(_)) => match parent_source {
                Some(source) => source,
                None => return Ok(None),
            },
            (None, Origin::WorkingCopy) => return Ok(None),
        };
        if self.tree.copy_sources.contains_key(&source) {
            return Ok(Some(source));
        }
        match self.store.get_node(&source.path, Origin::Revision(source.revision)) {
            Ok(Some(mut state)) => {
                state.path = rel.clone();
                self.tree.copy_sources.insert(source.clone(), state);
                Ok(Some(source))
            }
            Ok(None) => {
                warn!(path = %rel, source = %source, "copy source does not exist; treating as added");
                Ok(None)
            }
            Err(StoreError::NoSuchRevision(rev)) => {
                warn!(path = %rel, rev, "copy source revision is unknown; treating as added");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn locate(store: &dyn NodeStore, endpoint: &Endpoint) -> DiffResult<Located> {
    match &endpoint.target {
        Target::Url(path) => {
            let rev = match endpoint.revision {
                RevisionSpec::Number(rev) => rev,
                RevisionSpec::Head => store.youngest_revision()?,
                keyword => {
                    return Err(DiffError::UnsupportedComparison(format!(
                        "revision '{keyword}' requires a working copy target, got '{}'",
                        endpoint.target
                    )))
                }
            };
            Ok(Located {
                origin: Origin::Revision(rev),
                store_path: path.clone(),
            })
        }
        Target::WorkingCopy(path) => {
            if endpoint.revision == RevisionSpec::Working {
                return Ok(Located {
                    origin: Origin::WorkingCopy,
                    store_path: path.clone(),
                });
            }
            let recorded = recorded_location(store, path)?;
            let rev = match endpoint.revision {
                RevisionSpec::Number(rev) => rev,
                RevisionSpec::Head => store.youngest_revision()?,
                RevisionSpec::Base | RevisionSpec::Working => recorded.base_revision,
                RevisionSpec::Committed => recorded.changed_revision,
                RevisionSpec::Prev => recorded.changed_revision.checked_sub(1).ok_or_else(|| {
                    DiffError::UnsupportedComparison(format!(
                        "'{}' has no revision before r{}",
                        endpoint.target, recorded.changed_revision
                    ))
                })?,
            };
            Ok(Located {
                origin: Origin::Revision(rev),
                store_path: recorded.repos_relpath,
            })
        }
    }
}

struct Recorded {
    repos_relpath: RelPath,
    base_revision: u64,
    changed_revision: u64,
}

/// Repository location and revisions recorded for a working-copy path.
///
/// Paths the working copy does not know (or knows only as local additions)
/// borrow what is missing from their nearest versioned ancestor.
fn recorded_location(store: &dyn NodeStore, path: &RelPath) -> DiffResult<Recorded> {
    let mut repos_relpath: Option<RelPath> = None;
    let mut current = Some(path.clone());
    while let Some(candidate) = current {
        if let Some(info) = store.wc_info(&candidate)? {
            let rest = path.strip_prefix(&candidate).unwrap_or_default();
            let repos = repos_relpath
                .take()
                .unwrap_or_else(|| info.repos_relpath.join_path(&rest));
            if let (Some(base), Some(changed)) = (info.base_revision, info.changed_revision) {
                return Ok(Recorded {
                    repos_relpath: repos,
                    base_revision: base,
                    changed_revision: changed,
                });
            }
            repos_relpath = Some(repos);
        }
        current = candidate.parent();
    }
    Err(DiffError::NotFound(path.to_string()))
}

/// Kind of the root a tree was resolved from.
pub fn root_kind(tree: &NodeTree) -> NodeKind {
    tree.root().map_or(NodeKind::Nonexistent, |n| n.kind)
}
