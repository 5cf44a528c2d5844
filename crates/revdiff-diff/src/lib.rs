//! Diff engine for revdiff.
//!
//! Resolves two endpoints of a versioned tree, pairs their nodes, computes
//! per-node content and property differences and renders the result as a
//! unified patch, a git-style patch or a status summary.
//!
//! # Key Types
//!
//! - [`ComparisonSpec`] - Two endpoints, a display root and [`DiffOptions`]
//! - [`NodeTree`] / [`Endpoint`] - Resolved tree of one side
//! - [`NodePair`] / [`ChangeKind`] - Matched nodes and how they changed
//! - [`ContentDiff`] / [`TextDiff`] / [`Hunk`] - File content differences
//! - [`PropDiff`] / [`PropChange`] - Property differences
//! - [`NodePairResult`] - Everything a renderer prints for one pair
//! - [`OutputMode`] / [`PairRenderer`] - Unified, git and summary output

pub mod content_diff;
pub mod engine;
pub mod error;
pub mod options;
pub mod prop_diff;
pub mod render;
pub mod resolve;
pub mod result;
pub mod tree_diff;


pub use content_diff::{diff_content, diff_lines, ContentDiff, DiffLine, Hunk, LineKind, TextDiff};
pub use engine::{compare, diff_to_bytes, display_path, write_diff, ComparisonSpec};
pub use error::{DiffError, DiffResult};
pub use options::{Depth, DiffOptions, IgnoreSpace};
pub use prop_diff::{diff_properties, PropChange, PropChangeKind, PropDiff};
pub use render::{OutputMode, PairRenderer, INDEX_SEPARATOR, PROPERTY_SEPARATOR};
pub use resolve::{resolve, resolve_pair, Endpoint, NodeTree, Target};
pub use result::NodePairResult;
pub use tree_diff::{match_trees, ChangeKind, NodePair};
