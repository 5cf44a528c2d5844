//! Tree-relative paths.
//!
//! A [`RelPath`] names a node relative to the root of a tree: `""` is the
//! root itself, `"A/B/lambda"` a descendant. Paths are stored in canonical
//! form (no empty, `.` or `..` components, no leading or trailing slash).
//!
//! Ordering is component-wise, which yields a depth-first walk when a set of
//! paths is iterated in order: `A`, `A/B`, `A/B/x`, `A-1`, `gamma`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A canonical, slash-separated path relative to a tree root.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    /// The root path (`""`).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse and canonicalize a path.
    ///
    /// Empty and `.` components are dropped; `..` is rejected because a
    /// relative path may never escape its tree.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let mut parts = Vec::new();
        for component in s.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    return Err(TypeError::InvalidPath {
                        path: s.to_string(),
                        reason: "'..' is not allowed in a tree-relative path".into(),
                    })
                }
                other => parts.push(other),
            }
        }
        Ok(Self(parts.join("/")))
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty())
    }

    /// Number of components (`0` for the root).
    pub fn depth(&self) -> usize {
        self.components().count()
    }

    /// Append a single child name.
    pub fn join(&self, name: &str) -> Self {
        debug_assert!(!name.contains('/'), "child name must be a single component");
        if self.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    /// Append another relative path.
    pub fn join_path(&self, other: &RelPath) -> Self {
        match (self.is_root(), other.is_root()) {
            (true, _) => other.clone(),
            (false, true) => self.clone(),
            (false, false) => Self(format!("{}/{}", self.0, other.0)),
        }
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<RelPath> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rfind('/') {
            Some(idx) => Self(self.0[..idx].to_string()),
            None => Self::root(),
        })
    }

    /// The last component, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit('/').next()
        }
    }

    /// Returns `true` if `self` is `base` or lies below it.
    pub fn starts_with(&self, base: &RelPath) -> bool {
        self.strip_prefix(base).is_some()
    }

    /// The remainder of `self` below `base`, if `self` is inside `base`.
    pub fn strip_prefix(&self, base: &RelPath) -> Option<RelPath> {
        if base.is_root() {
            return Some(self.clone());
        }
        if self.0 == base.0 {
            return Some(Self::root());
        }
        self.0
            .strip_prefix(base.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| Self(rest.to_string()))
    }
}

impl Ord for RelPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components().cmp(other.components())
    }
}

impl PartialOrd for RelPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelPath({:?})", self.0)
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RelPath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for RelPath {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(s: &str) -> RelPath {
        RelPath::parse(s).unwrap()
    }

    #[test]
    fn parse_canonicalizes() {
        assert_eq!(p("/A//B/./lambda/").as_str(), "A/B/lambda");
        assert!(p(".").is_root());
        assert!(p("").is_root());
    }

    #[test]
    fn parse_rejects_parent_components() {
        assert!(matches!(
            RelPath::parse("A/../iota"),
            Err(TypeError::InvalidPath { .. })
        ));
    }

    #[test]
    fn ordering_is_depth_first() {
        let mut paths = vec![p("gamma"), p("A-1"), p("A/B/x"), p("A"), p("A/B"), p("")];
        paths.sort();
        let names: Vec<&str> = paths.iter().map(RelPath::as_str).collect();
        assert_eq!(names, vec!["", "A", "A/B", "A/B/x", "A-1", "gamma"]);
    }

    #[test]
    fn uppercase_sorts_before_lowercase() {
        let mut paths = vec![p("gamma"), p("H/psi"), p("G/pi")];
        paths.sort();
        let names: Vec<&str> = paths.iter().map(RelPath::as_str).collect();
        assert_eq!(names, vec!["G/pi", "H/psi", "gamma"]);
    }

    #[test]
    fn join_and_parent() {
        let root = RelPath::root();
        let a = root.join("A");
        let mu = a.join("mu");
        assert_eq!(mu.as_str(), "A/mu");
        assert_eq!(mu.parent(), Some(a.clone()));
        assert_eq!(a.parent(), Some(RelPath::root()));
        assert_eq!(root.parent(), None);
        assert_eq!(mu.file_name(), Some("mu"));
        assert_eq!(p("A").join_path(&p("B/E")).as_str(), "A/B/E");
    }

    #[test]
    fn strip_prefix_respects_component_boundaries() {
        assert_eq!(p("A/B/E").strip_prefix(&p("A")), Some(p("B/E")));
        assert_eq!(p("A").strip_prefix(&p("A")), Some(RelPath::root()));
        assert_eq!(p("AA/B").strip_prefix(&p("A")), None);
        assert!(p("A/B").starts_with(&RelPath::root()));
    }

    #[test]
    fn serde_uses_plain_string() {
        let json = serde_json::to_string(&p("A/mu")).unwrap();
        assert_eq!(json, "\"A/mu\"");
        let back: RelPath = serde_json::from_str("\"/A/mu/\"").unwrap();
        assert_eq!(back, p("A/mu"));
    }

    proptest! {
        #[test]
        fn parent_is_always_ordered_before_child(
            parts in proptest::collection::vec("[a-zA-Z0-9_-]{1,6}", 1..5)
        ) {
            let child = RelPath::parse(&parts.join("/")).unwrap();
            let parent = child.parent().unwrap();
            prop_assert!(parent < child);
            prop_assert!(child.starts_with(&parent));
        }
    }
}
