//! Unified (svn-style) patch output.

use crate::content_diff::ContentDiff;
use crate::options::DiffOptions;
use crate::result::NodePairResult;
use crate::tree_diff::ChangeKind;

use super::{
    annotation, push_line, write_binary_notice, write_index, write_property_changes,
    write_text_hunks, PairRenderer,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnifiedRenderer {
    properties_only: bool,
    no_diff_added: bool,
    no_diff_deleted: bool,
}

impl UnifiedRenderer {
    pub fn new(options: &DiffOptions) -> Self {
        Self {
            properties_only: options.properties_only,
            no_diff_added: options.no_diff_added,
            no_diff_deleted: options.no_diff_deleted,
        }
    }

    fn suppressed_body(&self, pair: &NodePairResult) -> Option<&'static str> {
        match pair.change {
            ChangeKind::Added if self.no_diff_added => Some("added"),
            ChangeKind::Deleted if self.no_diff_deleted => Some("deleted"),
            _ => None,
        }
    }
}

/// `--- <path>[\t(.../<loc>)]\t(<label>)` and the matching `+++` line.
pub(super) fn write_labels(out: &mut Vec<u8>, pair: &NodePairResult) {
    push_line(
        out,
        &format!(
            "--- {}{}\t({})",
            pair.display_path,
            annotation(&pair.old_location),
            pair.old_label
        ),
    );
    push_line(
        out,
        &format!(
            "+++ {}{}\t({})",
            pair.display_path,
            annotation(&pair.new_location),
            pair.new_label
        ),
    );
}

impl PairRenderer for UnifiedRenderer {
    fn render(&self, pair: &NodePairResult) -> Vec<u8> {
        let mut out = Vec::new();
        if self.properties_only && !pair.props_changed() {
            return out;
        }

        if pair.is_dir() {
            if pair.props_changed() {
                write_index(&mut out, &pair.display_path);
                write_labels(&mut out, pair);
                write_property_changes(&mut out, &pair.display_path, &pair.props);
            }
            return out;
        }

        if let Some(what) = self.suppressed_body(pair) {
            write_index(&mut out, &format!("{} ({what})", pair.display_path));
            return out;
        }

        let shown = match pair.change {
            ChangeKind::Added | ChangeKind::Deleted => true,
            ChangeKind::Copied | ChangeKind::Modified => {
                pair.content.is_some() || pair.props_changed()
            }
            ChangeKind::Replaced | ChangeKind::Unchanged => false,
        };
        if !shown {
            return out;
        }

        write_index(&mut out, &pair.display_path);
        match &pair.content {
            Some(binary @ ContentDiff::Binary { .. }) => write_binary_notice(&mut out, binary),
            Some(ContentDiff::Text(text)) => {
                write_labels(&mut out, pair);
                write_text_hunks(&mut out, &text.hunks);
            }
            None => write_labels(&mut out, pair),
        }
        write_property_changes(&mut out, &pair.display_path, &pair.props);
        out
    }
}
