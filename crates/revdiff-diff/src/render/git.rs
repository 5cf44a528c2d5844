//! Git-style extended headers on top of the unified body.

use crate::content_diff::ContentDiff;
use crate::options::DiffOptions;
use crate::result::NodePairResult;
use crate::tree_diff::ChangeKind;

use super::{
    annotation, push_line, write_binary_notice, write_index, write_property_changes,
    write_text_hunks, PairRenderer,
};

const DEV_NULL: &str = "/dev/null";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GitRenderer {
    properties_only: bool,
}

fn file_mode(executable: bool) -> &'static str {
    if executable {
        "100755"
    } else {
        "100644"
    }
}

impl GitRenderer {
    pub fn new(options: &DiffOptions) -> Self {
        Self {
            properties_only: options.properties_only,
        }
    }

    fn old_git_path(pair: &NodePairResult) -> String {
        match (&pair.copied_from, &pair.old_repos_path) {
            (Some(source), _) => source.path.to_string(),
            (None, Some(path)) => path.to_string(),
            (None, None) => pair.git_path(),
        }
    }

    /// The extended header lines between `diff --git` and `---`.
    fn extended_header(pair: &NodePairResult, out: &mut Vec<u8>) {
        match pair.change {
            ChangeKind::Added => {
                push_line(out, &format!("new file mode {}", file_mode(pair.new_executable)));
            }
            ChangeKind::Deleted => {
                push_line(out, &format!("deleted file mode {}", file_mode(pair.old_executable)));
            }
            ChangeKind::Copied => {
                if let Some(source) = &pair.copied_from {
                    push_line(out, &format!("copy from {}@{}", source.path, source.revision));
                    push_line(out, &format!("copy to {}", pair.git_path()));
                }
            }
            ChangeKind::Modified if pair.old_executable != pair.new_executable => {
                push_line(out, &format!("old mode {}", file_mode(pair.old_executable)));
                push_line(out, &format!("new mode {}", file_mode(pair.new_executable)));
            }
            _ => {}
        }
    }

    fn write_labels(pair: &NodePairResult, out: &mut Vec<u8>) {
        let old = if pair.change == ChangeKind::Added {
            DEV_NULL.to_string()
        } else {
            format!("a/{}{}", pair.display_path, annotation(&pair.old_location))
        };
        let new = if pair.change == ChangeKind::Deleted {
            DEV_NULL.to_string()
        } else {
            format!("b/{}{}", pair.display_path, annotation(&pair.new_location))
        };
        push_line(out, &format!("--- {old}\t({})", pair.old_label));
        push_line(out, &format!("+++ {new}\t({})", pair.new_label));
    }
}

impl PairRenderer for GitRenderer {
    fn render(&self, pair: &NodePairResult) -> Vec<u8> {
        let mut out = Vec::new();
        if self.properties_only && !pair.props_changed() {
            return out;
        }

        let shown = if pair.is_dir() {
            pair.props_changed()
        } else {
            match pair.change {
                ChangeKind::Added | ChangeKind::Deleted | ChangeKind::Copied => true,
                ChangeKind::Modified => {
                    pair.content.is_some()
                        || pair.props_changed()
                        || pair.old_executable != pair.new_executable
                }
                ChangeKind::Replaced | ChangeKind::Unchanged => false,
            }
        };
        if !shown {
            return out;
        }

        write_index(&mut out, &pair.display_path);
        push_line(
            &mut out,
            &format!("diff --git a/{} b/{}", Self::old_git_path(pair), pair.git_path()),
        );
        if pair.is_file() {
            Self::extended_header(pair, &mut out);
            match &pair.content {
                Some(binary @ ContentDiff::Binary { .. }) => write_binary_notice(&mut out, binary),
                Some(ContentDiff::Text(text)) if !text.is_empty() => {
                    Self::write_labels(pair, &mut out);
                    write_text_hunks(&mut out, &text.hunks);
                }
                _ => {}
            }
        }
        write_property_changes(&mut out, &pair.display_path, &pair.props);
        out
    }
}
