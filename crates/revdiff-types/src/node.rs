//! Node states: one entry of a resolved tree.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::ContentId;
use crate::error::TypeError;
use crate::path::RelPath;

/// Versioned property holding a file's MIME type.
pub const PROP_MIME_TYPE: &str = "svn:mime-type";
/// Versioned property holding a file's line-ending policy.
pub const PROP_EOL_STYLE: &str = "svn:eol-style";
/// Versioned property marking a file executable.
pub const PROP_EXECUTABLE: &str = "svn:executable";

/// Property map of a node. Sorted by name, keys unique.
pub type PropMap = BTreeMap<String, String>;

/// The kind of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    #[serde(alias = "dir")]
    Directory,
    Nonexistent,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "dir"),
            Self::Nonexistent => write!(f, "none"),
        }
    }
}

/// Where a node state was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Origin {
    /// A committed revision of the repository.
    Revision(u64),
    /// The (possibly modified) working copy.
    WorkingCopy,
}

impl Origin {
    /// The revision number, if this origin is a committed revision.
    pub fn revision(&self) -> Option<u64> {
        match self {
            Self::Revision(rev) => Some(*rev),
            Self::WorkingCopy => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revision(rev) => write!(f, "revision {rev}"),
            Self::WorkingCopy => write!(f, "working copy"),
        }
    }
}

/// The node a copy (or move) was made from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CopySource {
    /// Repository-relative path of the source.
    pub path: RelPath,
    /// Revision the source was copied at.
    pub revision: u64,
}

impl CopySource {
    pub fn new(path: RelPath, revision: u64) -> Self {
        Self { path, revision }
    }

    /// Source of a descendant `rel` of a copied directory.
    pub fn descend(&self, rel: &RelPath) -> Self {
        Self {
            path: self.path.join_path(rel),
            revision: self.revision,
        }
    }
}

impl fmt::Display for CopySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.revision)
    }
}

/// The state of one node in a resolved tree.
///
/// A `Nonexistent` node carries no content and no properties; use
/// [`NodeState::nonexistent`] to build one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// Path relative to the root of the tree the node belongs to.
    pub path: RelPath,
    pub kind: NodeKind,
    /// Content handle (files only).
    pub content: Option<ContentId>,
    pub props: PropMap,
    pub origin: Origin,
    /// Repository location of the node, when known.
    pub repos_relpath: Option<RelPath>,
    /// Copy/move ancestry, if the node was copied.
    pub copy_source: Option<CopySource>,
    /// The node started a new line of history at its path, replacing
    /// whatever lived there before.
    pub replaced: bool,
}

impl NodeState {
    /// A file node.
    pub fn file(path: RelPath, content: ContentId, origin: Origin) -> Self {
        Self {
            path,
            kind: NodeKind::File,
            content: Some(content),
            props: PropMap::new(),
            origin,
            repos_relpath: None,
            copy_source: None,
            replaced: false,
        }
    }

    /// A directory node.
    pub fn directory(path: RelPath, origin: Origin) -> Self {
        Self {
            path,
            kind: NodeKind::Directory,
            content: None,
            props: PropMap::new(),
            origin,
            repos_relpath: None,
            copy_source: None,
            replaced: false,
        }
    }

    /// A node that does not exist at `origin`.
    pub fn nonexistent(path: RelPath, origin: Origin) -> Self {
        Self {
            path,
            kind: NodeKind::Nonexistent,
            content: None,
            props: PropMap::new(),
            origin,
            repos_relpath: None,
            copy_source: None,
            replaced: false,
        }
    }

    pub fn with_props(mut self, props: PropMap) -> Self {
        if self.exists() {
            self.props = props;
        }
        self
    }

    pub fn with_repos_relpath(mut self, repos_relpath: RelPath) -> Self {
        self.repos_relpath = Some(repos_relpath);
        self
    }

    pub fn with_copy_source(mut self, source: Option<CopySource>) -> Self {
        self.copy_source = source;
        self
    }

    pub fn exists(&self) -> bool {
        self.kind != NodeKind::Nonexistent
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Header label: the origin, or `nonexistent` for an absent node.
    pub fn origin_label(&self) -> String {
        if self.exists() {
            self.origin.to_string()
        } else {
            "nonexistent".to_string()
        }
    }

    pub fn prop(&self, name: &str) -> Option<&str> {
        self.props.get(name).map(String::as_str)
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.prop(PROP_MIME_TYPE)
    }

    /// Effective eol style, ignoring unrecognized values.
    pub fn eol_style(&self) -> Option<EolStyle> {
        self.prop(PROP_EOL_STYLE).and_then(|v| v.parse().ok())
    }

    pub fn is_executable(&self) -> bool {
        self.props.contains_key(PROP_EXECUTABLE)
    }

    /// Returns `true` if this node is the node `source` refers to.
    pub fn is_copy_source(&self, source: &CopySource) -> bool {
        self.exists()
            && self.origin.revision().is_some()
            && self.repos_relpath.as_ref() == Some(&source.path)
    }
}

/// Line-ending policy set through `svn:eol-style`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EolStyle {
    Native,
    Lf,
    CrLf,
    Cr,
}

impl EolStyle {
    /// The terminator bytes this style writes.
    pub fn terminator(&self) -> &'static [u8] {
        match self {
            Self::Native if cfg!(windows) => b"\r\n",
            Self::Native | Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
            Self::Cr => b"\r",
        }
    }
}

impl FromStr for EolStyle {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "native" => Ok(Self::Native),
            "LF" => Ok(Self::Lf),
            "CRLF" => Ok(Self::CrLf),
            "CR" => Ok(Self::Cr),
            other => Err(TypeError::InvalidEolStyle(other.to_string())),
        }
    }
}

impl fmt::Display for EolStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Lf => write!(f, "LF"),
            Self::CrLf => write!(f, "CRLF"),
            Self::Cr => write!(f, "CR"),
        }
    }
}
