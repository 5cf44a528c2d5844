//! Property diff: compare the property maps of two node versions.
//!
//! Changes come out sorted by property name whatever the input maps look
//! like, so rendered output is reproducible.

use std::collections::BTreeSet;

use revdiff_types::PropMap;

use crate::content_diff::{diff_lines, Hunk};
use crate::options::DiffOptions;

/// How a property changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropChangeKind {
    Added,
    Deleted,
    Modified,
}

impl PropChangeKind {
    /// Label used in a `Property changes on:` section.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Added => "Added",
            Self::Deleted => "Deleted",
            Self::Modified => "Modified",
        }
    }
}

/// A single property change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropChange {
    pub name: String,
    pub kind: PropChangeKind,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl PropChange {
    /// Line hunks turning the old value into the new one.
    pub fn hunks(&self) -> Vec<Hunk> {
        let old = self.old_value.as_deref().unwrap_or_default();
        let new = self.new_value.as_deref().unwrap_or_default();
        diff_lines(old.as_bytes(), new.as_bytes(), &DiffOptions::default()).hunks
    }
}

/// The result of comparing two property maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropDiff {
    /// Changes, sorted by property name.
    pub changes: Vec<PropChange>,
}

impl PropDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// The change to property `name`, if any.
    pub fn get(&self, name: &str) -> Option<&PropChange> {
        self.changes.iter().find(|c| c.name == name)
    }
}

/// Compute the property changes from `old` to `new`.
///
/// Names present only in `new` are `Added`, names present only in `old` are
/// `Deleted`, and names present in both with different values are
/// `Modified`. Equal values produce no entry.
pub fn diff_properties(old: &PropMap, new: &PropMap) -> PropDiff {
    let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let changes = names
        .into_iter()
        .filter_map(|name| {
            let kind = match (old.get(name), new.get(name)) {
                (Some(a), Some(b)) if a == b => return None,
                (Some(_), Some(_)) => PropChangeKind::Modified,
                (None, Some(_)) => PropChangeKind::Added,
                (Some(_), None) => PropChangeKind::Deleted,
                (None, None) => return None,
            };
            Some(PropChange {
                name: name.clone(),
                kind,
                old_value: old.get(name).cloned(),
                new_value: new.get(name).cloned(),
            })
        })
        .collect();
    PropDiff { changes }
}
