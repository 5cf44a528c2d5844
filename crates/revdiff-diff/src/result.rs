use revdiff_types::{CopySource, NodeKind, RelPath};

use crate::content_diff::ContentDiff;
use crate::prop_diff::PropDiff;
use crate::tree_diff::ChangeKind;

/// Everything a renderer needs to print one node pair.
///
/// Replacements never reach this stage; the engine has already split them
/// into a deletion and an addition (or copy).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodePairResult {
    /// Path relative to the comparison target.
    pub path: RelPath,
    /// Path as printed in headers.
    pub display_path: String,
    pub change: ChangeKind,
    pub node_kind: NodeKind,
    /// Header label of the old side (`revision N`, `working copy` or
    /// `nonexistent`).
    pub old_label: String,
    pub new_label: String,
    /// Location annotation of the old side, set when the two roots differ.
    pub old_location: Option<String>,
    pub new_location: Option<String>,
    /// Repository path of the old side, used by git headers.
    pub old_repos_path: Option<RelPath>,
    pub new_repos_path: Option<RelPath>,
    pub copied_from: Option<CopySource>,
    pub old_executable: bool,
    pub new_executable: bool,
    /// The file content changed, whether or not a diff was computed.
    pub text_changed: bool,
    pub content: Option<ContentDiff>,
    pub props: PropDiff,
}

impl NodePairResult {
    pub fn is_file(&self) -> bool {
        self.node_kind == NodeKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.node_kind == NodeKind::Directory
    }

    pub fn props_changed(&self) -> bool {
        !self.props.is_empty()
    }

    /// Returns `true` if there are hunks to print.
    pub fn has_hunks(&self) -> bool {
        matches!(&self.content, Some(ContentDiff::Text(t)) if !t.is_empty())
    }

    /// Repository path used on the `b/` side of git headers.
    pub fn git_path(&self) -> String {
        self.new_repos_path
            .as_ref()
            .or(self.old_repos_path.as_ref())
            .map_or_else(|| self.display_path.clone(), RelPath::to_string)
    }
}
