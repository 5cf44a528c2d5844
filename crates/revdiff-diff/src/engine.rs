//! The comparison pipeline: resolve, match, diff, render.
//!
//! [`compare`] turns one [`ComparisonSpec`] into an ordered list of
//! [`NodePairResult`]s. [`write_diff`] runs several comparisons with a single
//! renderer, writing each target's output only once it has been computed in
//! full.

use std::io::Write;

use tracing::debug;

use revdiff_store::NodeStore;
use revdiff_types::{NodeKind, RelPath};

use crate::content_diff::diff_content;
use crate::error::DiffResult;
use crate::options::DiffOptions;
use crate::prop_diff::{diff_properties, PropDiff};
use crate::render::{render_pairs, OutputMode, PairRenderer};
use crate::resolve::{resolve_pair, root_kind, Endpoint, NodeTree, Target};
use crate::result::NodePairResult;
use crate::tree_diff::{match_trees, ChangeKind, NodePair};

/// One requested comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComparisonSpec {
    pub old: Endpoint,
    pub new: Endpoint,
    /// Literal root text used for printed paths (`..`, `../..`, `A/mu`).
    /// Derived from the new target when unset.
    pub display_root: Option<String>,
    pub options: DiffOptions,
}

impl ComparisonSpec {
    pub fn new(old: Endpoint, new: Endpoint) -> Self {
        Self {
            old,
            new,
            display_root: None,
            options: DiffOptions::default(),
        }
    }

    pub fn with_display_root(mut self, root: impl Into<String>) -> Self {
        self.display_root = Some(root.into());
        self
    }

    pub fn with_options(mut self, options: DiffOptions) -> Self {
        self.options = options;
        self
    }

    /// Root text for printed paths. Repository targets print paths relative
    /// to the target, or the file name when the target is a file.
    fn root_text(&self, kind: NodeKind) -> String {
        if let Some(root) = &self.display_root {
            return root.clone();
        }
        match &self.new.target {
            Target::WorkingCopy(_) => self.new.target.to_string(),
            Target::Url(path) if kind == NodeKind::File => {
                path.file_name().unwrap_or(".").to_string()
            }
            Target::Url(_) => String::new(),
        }
    }
}

/// Printed path of `rel` below a display root.
pub fn display_path(root: &str, rel: &RelPath) -> String {
    let trimmed = root.trim_end_matches('/');
    let root = if trimmed.is_empty() { root } else { trimmed };
    if rel.is_root() {
        if root.is_empty() {
            ".".to_string()
        } else {
            root.to_string()
        }
    } else if root.is_empty() || root == "." {
        rel.to_string()
    } else {
        format!("{root}/{rel}")
    }
}

/// Run one comparison.
///
/// Options are validated before anything is resolved. Unchanged pairs are
/// dropped and replacements come out as a deletion followed by an addition
/// (or copy) of the same path.
pub fn compare(store: &dyn NodeStore, spec: &ComparisonSpec) -> DiffResult<Vec<NodePairResult>> {
    let options = spec.options;
    options.validate()?;

    let (old, new) = resolve_pair(store, &spec.old, &spec.new, &options)?;
    let kind = match root_kind(&new) {
        NodeKind::Nonexistent => root_kind(&old),
        kind => kind,
    };
    let root = spec.root_text(kind);
    let annotate = old.location != new.location;

    let mut results = Vec::new();
    for pair in match_trees(&old, &new, &options)
        .into_iter()
        .filter(|p| p.change != ChangeKind::Unchanged)
        .flat_map(NodePair::expand)
    {
        results.push(build_result(store, pair, &old, &new, &root, annotate, &options)?);
    }

    debug!(
        old = %spec.old.target,
        old_rev = %spec.old.revision,
        new = %spec.new.target,
        new_rev = %spec.new.revision,
        annotate,
        results = results.len(),
        "comparison complete"
    );
    Ok(results)
}

fn build_result(
    store: &dyn NodeStore,
    pair: NodePair,
    old: &NodeTree,
    new: &NodeTree,
    root: &str,
    annotate: bool,
    options: &DiffOptions,
) -> DiffResult<NodePairResult> {
    let NodePair {
        path,
        change,
        left,
        right,
        copied_from,
    } = pair;
    let node_kind = if right.exists() { right.kind } else { left.kind };

    let suppressed = (change == ChangeKind::Added && options.no_diff_added)
        || (change == ChangeKind::Deleted && options.no_diff_deleted);
    let content = if options.summarize_only
        || options.properties_only
        || suppressed
        || node_kind != NodeKind::File
    {
        None
    } else {
        diff_content(store, &left, &right, options)?
    };
    let text_changed = node_kind == NodeKind::File
        && (left.kind != right.kind
            || left.content != right.content
            || left.eol_style() != right.eol_style());
    let props = if options.ignore_properties {
        PropDiff::default()
    } else {
        diff_properties(&left.props, &right.props)
    };

    let (old_location, new_location) = if annotate {
        (
            Some(old.location.join_path(&path).to_string()),
            Some(new.location.join_path(&path).to_string()),
        )
    } else {
        (None, None)
    };

    debug!(
        path = %path,
        %change,
        kind = %node_kind,
        text_changed,
        props = props.len(),
        "built pair result"
    );
    Ok(NodePairResult {
        display_path: display_path(root, &path),
        path,
        change,
        node_kind,
        old_label: left.origin_label(),
        new_label: right.origin_label(),
        old_location,
        new_location,
        old_repos_path: left.repos_relpath.clone().filter(|_| left.exists()),
        new_repos_path: right.repos_relpath.clone().filter(|_| right.exists()),
        copied_from: copied_from.map(|(source, _)| source),
        old_executable: left.is_executable(),
        new_executable: right.is_executable(),
        text_changed,
        content,
        props,
    })
}

/// Run one comparison and render it as a complete document.
pub fn diff_to_bytes(store: &dyn NodeStore, spec: &ComparisonSpec) -> DiffResult<Vec<u8>> {
    let mut out = Vec::new();
    write_diff(store, std::slice::from_ref(spec), &mut out)?;
    Ok(out)
}

/// Run every comparison and write the rendered output to `out`.
///
/// The output mode is taken from the first spec. All options are validated
/// up front; after that each target is computed in full and then written.
/// The first failing target aborts the run, leaving the output of earlier
/// targets in place.
pub fn write_diff(store: &dyn NodeStore, specs: &[ComparisonSpec], out: &mut dyn Write) -> DiffResult<()> {
    for spec in specs {
        spec.options.validate()?;
    }
    let Some(first) = specs.first() else {
        return Ok(());
    };
    let renderer = OutputMode::for_options(&first.options);

    out.write_all(&renderer.prologue())?;
    for spec in specs {
        let results = compare(store, spec)?;
        out.write_all(&render_pairs(&renderer, &results))?;
    }
    out.write_all(&renderer.epilogue())?;
    out.flush()?;
    Ok(())
}
