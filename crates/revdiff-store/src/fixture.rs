//! Building repository content: tree builders and on-disk fixtures.
//!
//! A fixture describes a repository as a sequence of incremental revisions
//! plus an optional working copy with local modifications. It is the input
//! format of the CLI and a convenient way to set up comparison scenarios.
//!
//! ```toml
//! [[revisions]]
//! [revisions.nodes."iota"]
//! content = "This is the file 'iota'.\n"
//!
//! [working-copy]
//! revision = 1
//! ops = [
//!   { op = "propset", path = "iota", name = "svn:mime-type", value = "text/plain" },
//!   { op = "append", path = "iota", text = "second line\n" },
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use revdiff_types::{CopySource, NodeKind, PropMap, RelPath, TypeError};

use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryNodeStore;

/// A node waiting to be committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PendingNode {
    pub(crate) kind: NodeKind,
    pub(crate) content: Option<Vec<u8>>,
    pub(crate) props: PropMap,
    pub(crate) copy_source: Option<CopySource>,
}

impl PendingNode {
    fn directory() -> Self {
        Self {
            kind: NodeKind::Directory,
            content: None,
            props: PropMap::new(),
            copy_source: None,
        }
    }
}

/// Complete tree for one revision, built fluently.
///
/// Missing parent directories are created on demand. Path errors are
/// remembered and reported by [`InMemoryNodeStore::commit`].
#[derive(Clone, Debug, Default)]
pub struct TreeBuilder {
    pub(crate) nodes: BTreeMap<RelPath, PendingNode>,
    pub(crate) error: Option<TypeError>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        if let Some(path) = self.parse(path) {
            self.ensure_parents(&path);
            self.nodes.insert(
                path,
                PendingNode {
                    kind: NodeKind::File,
                    content: Some(content.as_ref().to_vec()),
                    props: PropMap::new(),
                    copy_source: None,
                },
            );
        }
        self
    }

    /// Add a directory (no-op if it already exists).
    pub fn dir(mut self, path: &str) -> Self {
        if let Some(path) = self.parse(path) {
            self.ensure_parents(&path);
            self.nodes.entry(path).or_insert_with(PendingNode::directory);
        }
        self
    }

    /// Set a property on an existing node.
    pub fn prop(mut self, path: &str, name: &str, value: &str) -> Self {
        if let Some(path) = self.parse(path) {
            match self.nodes.get_mut(&path) {
                Some(node) => {
                    node.props.insert(name.to_string(), value.to_string());
                }
                None => self.fail(path.as_str(), "cannot set a property on a missing node"),
            }
        }
        self
    }

    /// Remove a property from an existing node.
    pub fn del_prop(mut self, path: &str, name: &str) -> Self {
        if let Some(path) = self.parse(path) {
            if let Some(node) = self.nodes.get_mut(&path) {
                node.props.remove(name);
            }
        }
        self
    }

    /// Record that the node at `path` was copied from `source@revision`.
    pub fn copied_from(mut self, path: &str, source: &str, revision: u64) -> Self {
        let (Some(path), Some(source)) = (self.parse(path), self.parse(source)) else {
            return self;
        };
        match self.nodes.get_mut(&path) {
            Some(node) => node.copy_source = Some(CopySource::new(source, revision)),
            None => self.fail(path.as_str(), "cannot record ancestry of a missing node"),
        }
        self
    }

    /// Remove a node and everything below it.
    pub fn remove(mut self, path: &str) -> Self {
        if let Some(path) = self.parse(path) {
            self.nodes.retain(|p, _| !p.starts_with(&path) || p.is_root());
        }
        self
    }

    fn parse(&mut self, path: &str) -> Option<RelPath> {
        match RelPath::parse(path) {
            Ok(p) => Some(p),
            Err(e) => {
                self.error.get_or_insert(e);
                None
            }
        }
    }

    fn fail(&mut self, path: &str, reason: &str) {
        self.error.get_or_insert(TypeError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }

    fn ensure_parents(&mut self, path: &RelPath) {
        let mut parent = path.parent();
        while let Some(dir) = parent {
            parent = dir.parent();
            self.nodes.entry(dir).or_insert_with(PendingNode::directory);
        }
    }
}

/// The classic sample tree: `iota`, `A/mu`, `A/B/...`, `A/C`, `A/D/...`.
pub fn greek_tree() -> TreeBuilder {
    TreeBuilder::new()
        .file("iota", "This is the file 'iota'.\n")
        .file("A/mu", "This is the file 'mu'.\n")
        .file("A/B/lambda", "This is the file 'lambda'.\n")
        .file("A/B/E/alpha", "This is the file 'alpha'.\n")
        .file("A/B/E/beta", "This is the file 'beta'.\n")
        .dir("A/B/F")
        .dir("A/C")
        .file("A/D/gamma", "This is the file 'gamma'.\n")
        .file("A/D/G/pi", "This is the file 'pi'.\n")
        .file("A/D/G/rho", "This is the file 'rho'.\n")
        .file("A/D/G/tau", "This is the file 'tau'.\n")
        .file("A/D/H/chi", "This is the file 'chi'.\n")
        .file("A/D/H/psi", "This is the file 'psi'.\n")
        .file("A/D/H/omega", "This is the file 'omega'.\n")
}

// ---------------------------------------------------------------------------
// Serialized fixtures
// ---------------------------------------------------------------------------

/// A repository described as data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryFixture {
    /// Revisions 1..=N, each applied on top of the previous tree.
    #[serde(default)]
    pub revisions: Vec<RevisionFixture>,
    /// Working copy to check out after the revisions are committed.
    #[serde(default)]
    pub working_copy: Option<WorkingCopyFixture>,
}

/// Changes making up one revision.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RevisionFixture {
    /// Start from the standard sample tree instead of the previous revision.
    #[serde(default)]
    pub greek: bool,
    /// Paths removed (with their subtrees) in this revision.
    #[serde(default)]
    pub delete: Vec<String>,
    /// Nodes added or replaced in this revision.
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeFixture>,
}

/// One node of a revision fixture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeFixture {
    #[serde(default = "default_kind")]
    pub kind: NodeKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub props: PropMap,
    #[serde(default)]
    pub copy_from: Option<CopySource>,
}

fn default_kind() -> NodeKind {
    NodeKind::File
}

/// Working copy checkout plus local modifications.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkingCopyFixture {
    /// Revision to check out; defaults to the youngest.
    #[serde(default)]
    pub revision: Option<u64>,
    #[serde(default)]
    pub ops: Vec<WcOp>,
}

/// A local modification applied to the working copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum WcOp {
    Write { path: String, content: String },
    Append { path: String, text: String },
    Propset { path: String, name: String, value: String },
    Propdel { path: String, name: String },
    Mkdir { path: String },
    Delete { path: String },
    Copy { from: String, to: String },
    Move { from: String, to: String },
    Switch { path: String, url: String, revision: u64 },
}

impl RepositoryFixture {
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Fixture(e.to_string()))
    }

    pub fn from_json_str(s: &str) -> StoreResult<Self> {
        serde_json::from_str(s).map_err(|e| StoreError::Fixture(e.to_string()))
    }

    /// Load a fixture file; `.json` files are JSON, anything else TOML.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    /// Commit every revision and set up the working copy.
    pub fn into_store(self) -> StoreResult<InMemoryNodeStore> {
        let store = InMemoryNodeStore::new();
        let mut tree = TreeBuilder::new();
        for revision in &self.revisions {
            if revision.greek {
                tree = greek_tree();
            }
            for path in &revision.delete {
                tree = tree.remove(path);
            }
            for (path, node) in &revision.nodes {
                tree = match node.kind {
                    NodeKind::Directory => tree.dir(path),
                    _ => tree.file(path, node.content.as_deref().unwrap_or_default()),
                };
                for (name, value) in &node.props {
                    tree = tree.prop(path, name, value);
                }
                if let Some(source) = &node.copy_from {
                    tree = tree.copied_from(path, source.path.as_str(), source.revision);
                }
            }
            let rev = store.commit(&tree)?;
            debug!(rev, nodes = tree.nodes.len(), "fixture revision committed");
        }

        if let Some(wc) = &self.working_copy {
            let rev = match wc.revision {
                Some(rev) => rev,
                None => store.youngest(),
            };
            store.checkout(rev)?;
            for op in &wc.ops {
                apply_op(&store, op)?;
            }
        }
        Ok(store)
    }
}

fn apply_op(store: &InMemoryNodeStore, op: &WcOp) -> StoreResult<()> {
    match op {
        WcOp::Write { path, content } => store.write_file(path, content),
        WcOp::Append { path, text } => store.append(path, text),
        WcOp::Propset { path, name, value } => store.set_prop(path, name, value),
        WcOp::Propdel { path, name } => store.delete_prop(path, name),
        WcOp::Mkdir { path } => store.mkdir(path),
        WcOp::Delete { path } => store.delete(path),
        WcOp::Copy { from, to } => store.copy(from, to),
        WcOp::Move { from, to } => store.move_node(from, to),
        WcOp::Switch {
            path,
            url,
            revision,
        } => store.switch(path, url, *revision),
    }
}
