//! Tree matching: pair the nodes of two resolved trees and classify each
//! pair.
//!
//! Both trees are keyed by target-relative path, so the match is a full
//! outer join in depth-first order. Classification is pure: copy sources
//! were already resolved into the new tree's arena by the resolver.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use revdiff_types::{CopySource, NodeKind, NodeState, RelPath};

use crate::options::DiffOptions;
use crate::resolve::NodeTree;

/// How a node changed between the two sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    /// Unrelated nodes at the same path; shown as a deletion plus an addition.
    Replaced,
    /// Added with history; diffed against the copy source.
    Copied,
    Unchanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::Modified => "modified",
            Self::Replaced => "replaced",
            Self::Copied => "copied",
            Self::Unchanged => "unchanged",
        })
    }
}

/// A matched pair of nodes.
///
/// `left` is nonexistent for additions, `right` for deletions. For copies
/// `left` is the resolved copy source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodePair {
    /// Path relative to the comparison target.
    pub path: RelPath,
    pub change: ChangeKind,
    pub left: NodeState,
    pub right: NodeState,
    /// Where the right side was copied from, for copies and replacements
    /// by a copy.
    pub copied_from: Option<(CopySource, NodeState)>,
}

impl NodePair {
    /// Kind of the node this pair describes (the right side unless deleted).
    pub fn node_kind(&self) -> NodeKind {
        if self.right.exists() {
            self.right.kind
        } else {
            self.left.kind
        }
    }

    /// Split a replacement into a deletion followed by an addition (or a
    /// copy). Other pairs are returned unchanged.
    pub fn expand(self) -> Vec<NodePair> {
        if self.change != ChangeKind::Replaced {
            return vec![self];
        }
        let deleted = NodePair {
            path: self.path.clone(),
            change: ChangeKind::Deleted,
            left: self.left.clone(),
            right: NodeState::nonexistent(self.path.clone(), self.right.origin),
            copied_from: None,
        };
        let added = match self.copied_from {
            Some((source, state)) => NodePair {
                path: self.path,
                change: ChangeKind::Copied,
                left: state.clone(),
                right: self.right,
                copied_from: Some((source, state)),
            },
            None => NodePair {
                path: self.path.clone(),
                change: ChangeKind::Added,
                left: NodeState::nonexistent(self.path, self.left.origin),
                right: self.right,
                copied_from: None,
            },
        };
        vec![deleted, added]
    }
}

/// Returns `true` if the two nodes differ in content or properties.
fn differs(a: &NodeState, b: &NodeState) -> bool {
    a.content != b.content || a.props != b.props
}

/// Pair every path of `old` with the same path of `new`.
///
/// The result is in depth-first path order and contains unchanged pairs as
/// well; renderers skip what they do not show.
pub fn match_trees(old: &NodeTree, new: &NodeTree, options: &DiffOptions) -> Vec<NodePair> {
    let paths: BTreeSet<&RelPath> = old.nodes.keys().chain(new.nodes.keys()).collect();
    let mut replaced_dirs: Vec<RelPath> = Vec::new();
    let mut pairs = Vec::with_capacity(paths.len());

    for path in paths {
        let a = old.get(path);
        let b = new.get(path);
        let under_replaced = replaced_dirs.iter().any(|dir| path.starts_with(dir));
        let pair = classify(path, a, b, old, new, under_replaced, options);
        if pair.change == ChangeKind::Replaced && pair.node_kind() == NodeKind::Directory {
            replaced_dirs.push(path.clone());
        }
        debug!(path = %path, change = %pair.change, "matched node");
        pairs.push(pair);
    }
    pairs
}

fn classify(
    path: &RelPath,
    a: Option<&NodeState>,
    b: Option<&NodeState>,
    old: &NodeTree,
    new: &NodeTree,
    under_replaced: bool,
    options: &DiffOptions,
) -> NodePair {
    let absent_left = || NodeState::nonexistent(path.clone(), old.origin);
    let absent_right = || NodeState::nonexistent(path.clone(), new.origin);

    let mut copied_from = b.and_then(|b| {
        let source = b.copy_source.as_ref().filter(|_| options.tracks_copies(new.origin))?;
        let state = new.copy_source(source)?;
        Some((source.clone(), state.clone()))
    });
    // A node that already carried the same copy source on the old side is
    // the same line of history. Without ancestry, a copy onto an unrelated
    // node of the same kind is compared by path.
    if let (Some(a), Some(b), Some((source, _))) = (a, b, &copied_from) {
        let same_history = a.copy_source.as_ref() == Some(source);
        let by_path = !options.notice_ancestry && a.kind == b.kind && !a.is_copy_source(source);
        if same_history || by_path {
            copied_from = None;
        }
    }

    let (change, left, right) = match (a, b) {
        (None, None) => (ChangeKind::Unchanged, absent_left(), absent_right()),
        (Some(a), None) => (ChangeKind::Deleted, a.clone(), absent_right()),
        (a, Some(b)) if copied_from.is_some() => match (a, &copied_from) {
            (Some(a), Some((source, _))) if !a.is_copy_source(source) || a.kind != b.kind => {
                (ChangeKind::Replaced, a.clone(), b.clone())
            }
            (_, Some((_, state))) => (ChangeKind::Copied, state.clone(), b.clone()),
            (_, None) => (ChangeKind::Added, absent_left(), b.clone()),
        },
        (None, Some(b)) => (ChangeKind::Added, absent_left(), b.clone()),
        (Some(a), Some(b)) => {
            let change = if a.kind != b.kind
                || (options.notice_ancestry && (b.replaced || under_replaced))
            {
                ChangeKind::Replaced
            } else if differs(a, b) {
                ChangeKind::Modified
            } else {
                ChangeKind::Unchanged
            };
            (change, a.clone(), b.clone())
        }
    };

    NodePair {
        path: path.clone(),
        change,
        left,
        right,
        copied_from,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{resolve_pair, Endpoint, Target};
    use revdiff_store::{greek_tree, InMemoryNodeStore};
    use revdiff_types::RevisionSpec;

    fn p(s: &str) -> RelPath {
        RelPath::parse(s).unwrap()
    }

    fn greek_wc() -> InMemoryNodeStore {
        let store = InMemoryNodeStore::new();
        store.commit(&greek_tree()).unwrap();
        store.checkout(1).unwrap();
        store
    }

    fn matched(store: &InMemoryNodeStore, target: &str, options: DiffOptions) -> Vec<NodePair> {
        let old = Endpoint::new(Target::WorkingCopy(p(target)), RevisionSpec::Base);
        let new = Endpoint::working(p(target));
        let (a, b) = resolve_pair(store, &old, &new, &options).unwrap();
        match_trees(&a, &b, &options)
    }

    fn changed(pairs: &[NodePair]) -> Vec<(String, ChangeKind)> {
        pairs
            .iter()
            .filter(|pair| pair.change != ChangeKind::Unchanged)
            .map(|pair| (pair.path.to_string(), pair.change))
            .collect()
    }

    #[test]
    fn unchanged_tree_has_no_changes() {
        let store = greek_wc();
        let pairs = matched(&store, "", DiffOptions::default());
        assert_eq!(pairs.len(), 21);
        assert!(changed(&pairs).is_empty());
    }

    #[test]
    fn added_directory_enumerates_descendants() {
        let store = greek_wc();
        store.mkdir("Q").unwrap();
        store.mkdir("Q/R").unwrap();
        store.write_file("Q/R/newfile", "new\n").unwrap();
        store.delete("A/D/H").unwrap();

        let pairs = matched(&store, "", DiffOptions::default());
        assert_eq!(
            changed(&pairs),
            vec![
                ("A/D/H".to_string(), ChangeKind::Deleted),
                ("A/D/H/chi".to_string(), ChangeKind::Deleted),
                ("A/D/H/omega".to_string(), ChangeKind::Deleted),
                ("A/D/H/psi".to_string(), ChangeKind::Deleted),
                ("Q".to_string(), ChangeKind::Added),
                ("Q/R".to_string(), ChangeKind::Added),
                ("Q/R/newfile".to_string(), ChangeKind::Added),
            ]
        );
        let added = pairs.iter().find(|pair| pair.path == p("Q/R/newfile")).unwrap();
        assert!(!added.left.exists());
        assert_eq!(added.left.origin_label(), "nonexistent");
    }

    #[test]
    fn local_copies_follow_their_source_unless_shown_as_adds() {
        let store = greek_wc();
        store.copy("A/mu", "mu2").unwrap();

        for options in [
            DiffOptions::default(),
            DiffOptions {
                notice_ancestry: true,
                ..Default::default()
            },
        ] {
            let pairs = matched(&store, "", options);
            assert_eq!(changed(&pairs), vec![("mu2".to_string(), ChangeKind::Copied)]);
            let copy = pairs.iter().find(|pair| pair.change == ChangeKind::Copied).unwrap();
            assert_eq!(copy.left.repos_relpath, Some(p("A/mu")));
            assert_eq!(copy.copied_from.as_ref().unwrap().0, CopySource::new(p("A/mu"), 1));
        }

        let as_adds = DiffOptions {
            notice_ancestry: true,
            show_copies_as_adds: true,
            ..Default::default()
        };
        assert_eq!(
            changed(&matched(&store, "", as_adds)),
            vec![("mu2".to_string(), ChangeKind::Added)]
        );
    }

    #[test]
    fn committed_copies_need_ancestry() {
        let store = greek_wc();
        store.copy("A/mu", "mu2").unwrap();
        assert_eq!(store.commit_working_copy().unwrap(), 2);

        let pairs_at = |options: DiffOptions| {
            let old = Endpoint::new(Target::Url(p("")), RevisionSpec::Number(1));
            let new = Endpoint::new(Target::Url(p("")), RevisionSpec::Number(2));
            let (a, b) = resolve_pair(&store, &old, &new, &options).unwrap();
            changed(&match_trees(&a, &b, &options))
        };
        assert_eq!(
            pairs_at(DiffOptions::default()),
            vec![("mu2".to_string(), ChangeKind::Added)]
        );
        assert_eq!(
            pairs_at(DiffOptions {
                notice_ancestry: true,
                ..Default::default()
            }),
            vec![("mu2".to_string(), ChangeKind::Copied)]
        );
    }

    #[test]
    fn later_edits_to_a_committed_copy_are_modifications() {
        let store = greek_wc();
        store.copy("A/mu", "mu2").unwrap();
        assert_eq!(store.commit_working_copy().unwrap(), 2);
        store.append("mu2", "more\n").unwrap();
        assert_eq!(store.commit_working_copy().unwrap(), 3);

        let options = DiffOptions {
            notice_ancestry: true,
            ..Default::default()
        };
        let old = Endpoint::new(Target::Url(p("")), RevisionSpec::Number(2));
        let new = Endpoint::new(Target::Url(p("")), RevisionSpec::Number(3));
        let (a, b) = resolve_pair(&store, &old, &new, &options).unwrap();
        let pairs = match_trees(&a, &b, &options);
        assert_eq!(changed(&pairs), vec![("mu2".to_string(), ChangeKind::Modified)]);
        let mu2 = pairs.iter().find(|pair| pair.path == p("mu2")).unwrap();
        assert!(mu2.copied_from.is_none());
    }

    #[test]
    fn kind_change_is_a_replacement() {
        let store = greek_wc();
        store.delete("iota").unwrap();
        store.mkdir("iota").unwrap();
        let pairs = matched(&store, "", DiffOptions::default());
        assert_eq!(changed(&pairs), vec![("iota".to_string(), ChangeKind::Replaced)]);

        let expanded: Vec<NodePair> = pairs
            .into_iter()
            .filter(|pair| pair.change == ChangeKind::Replaced)
            .flat_map(NodePair::expand)
            .collect();
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].change, ChangeKind::Deleted);
        assert!(expanded[0].left.is_file());
        assert!(!expanded[0].right.exists());
        assert_eq!(expanded[1].change, ChangeKind::Added);
        assert!(expanded[1].right.is_dir());
    }

    #[test]
    fn replaced_history_needs_ancestry() {
        let store = greek_wc();
        store.delete("A/B").unwrap();
        store.move_node("A/D", "A/B").unwrap();

        // Without ancestry the paths are compared by content.
        let plain = matched(&store, "A", DiffOptions::default());
        let b = plain.iter().find(|pair| pair.path == p("B")).unwrap();
        assert_eq!(b.change, ChangeKind::Unchanged);

        let tracked = DiffOptions {
            notice_ancestry: true,
            ..Default::default()
        };
        let pairs = matched(&store, "A", tracked);
        let b = pairs.iter().find(|pair| pair.path == p("B")).unwrap();
        assert_eq!(b.change, ChangeKind::Replaced);
        assert_eq!(b.copied_from.as_ref().unwrap().0, CopySource::new(p("A/D"), 1));

        let expanded = b.clone().expand();
        assert_eq!(expanded[0].change, ChangeKind::Deleted);
        assert_eq!(expanded[1].change, ChangeKind::Copied);
        // The moved-away source shows as deleted.
        let d = pairs.iter().find(|pair| pair.path == p("D")).unwrap();
        assert_eq!(d.change, ChangeKind::Deleted);
    }
}
