//! Output rendering.
//!
//! The output mode is chosen once per invocation from [`DiffOptions`] and
//! every mode implements [`PairRenderer`]. Renderers write bytes: file
//! lines are emitted exactly as the content differ produced them, line
//! terminators included.

pub mod git;
pub mod summarize;
pub mod unified;

use crate::content_diff::{ContentDiff, Hunk, LineKind};
use crate::options::DiffOptions;
use crate::prop_diff::PropDiff;
use crate::result::NodePairResult;

pub use git::GitRenderer;
pub use summarize::SummaryRenderer;
pub use unified::UnifiedRenderer;

/// Separator under an `Index:` line (67 `=`).
pub const INDEX_SEPARATOR: &str =
    "===================================================================";
/// Separator under a `Property changes on:` line (67 `_`).
pub const PROPERTY_SEPARATOR: &str =
    "___________________________________________________________________";

const NO_NEWLINE_AT_END_OF_FILE: &str = "\\ No newline at end of file";
const NO_NEWLINE_AT_END_OF_PROPERTY: &str = "\\ No newline at end of property";

/// Turns node pair results into output bytes.
pub trait PairRenderer {
    /// Bytes written once before the first pair of the run.
    fn prologue(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Bytes for one pair; empty if the pair is not shown in this mode.
    fn render(&self, pair: &NodePairResult) -> Vec<u8>;

    /// Bytes written once after the last pair of the run.
    fn epilogue(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// The output modes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Unified(UnifiedRenderer),
    Git(GitRenderer),
    Summarize(SummaryRenderer),
}

impl OutputMode {
    pub fn for_options(options: &DiffOptions) -> Self {
        if options.summarize_only {
            Self::Summarize(SummaryRenderer::new(options.xml))
        } else if options.git_style {
            Self::Git(GitRenderer::new(options))
        } else {
            Self::Unified(UnifiedRenderer::new(options))
        }
    }
}

impl PairRenderer for OutputMode {
    fn prologue(&self) -> Vec<u8> {
        match self {
            Self::Unified(r) => r.prologue(),
            Self::Git(r) => r.prologue(),
            Self::Summarize(r) => r.prologue(),
        }
    }

    fn render(&self, pair: &NodePairResult) -> Vec<u8> {
        match self {
            Self::Unified(r) => r.render(pair),
            Self::Git(r) => r.render(pair),
            Self::Summarize(r) => r.render(pair),
        }
    }

    fn epilogue(&self) -> Vec<u8> {
        match self {
            Self::Unified(r) => r.epilogue(),
            Self::Git(r) => r.epilogue(),
            Self::Summarize(r) => r.epilogue(),
        }
    }
}

/// Render a sequence of pairs, without prologue or epilogue.
pub fn render_pairs(renderer: &impl PairRenderer, pairs: &[NodePairResult]) -> Vec<u8> {
    pairs.iter().flat_map(|pair| renderer.render(pair)).collect()
}

/// Render a complete document: prologue, every pair, epilogue.
pub fn render_document(renderer: &impl PairRenderer, pairs: &[NodePairResult]) -> Vec<u8> {
    let mut out = renderer.prologue();
    out.extend(render_pairs(renderer, pairs));
    out.extend(renderer.epilogue());
    out
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

fn push_line(out: &mut Vec<u8>, line: &str) {
    out.extend_from_slice(line.as_bytes());
    out.push(b'\n');
}

/// `Index: <path>` plus the separator.
fn write_index(out: &mut Vec<u8>, index: &str) {
    push_line(out, &format!("Index: {index}"));
    push_line(out, INDEX_SEPARATOR);
}

/// ` (.../<location>)` annotation, tab-separated.
fn annotation(location: &Option<String>) -> String {
    match location {
        Some(loc) => format!("\t(.../{loc})"),
        None => String::new(),
    }
}

/// `start,len` as printed in a hunk header; the length is omitted when it
/// is one.
fn hunk_range(start: usize, len: usize) -> String {
    if len == 1 {
        start.to_string()
    } else {
        format!("{start},{len}")
    }
}

fn write_hunks(out: &mut Vec<u8>, hunks: &[Hunk], marker: &str, no_newline: &str) {
    for hunk in hunks {
        push_line(
            out,
            &format!(
                "{marker} -{} +{} {marker}",
                hunk_range(hunk.old_start, hunk.old_len),
                hunk_range(hunk.new_start, hunk.new_len)
            ),
        );
        for line in &hunk.lines {
            out.push(match line.kind {
                LineKind::Context => b' ',
                LineKind::Added => b'+',
                LineKind::Deleted => b'-',
            });
            out.extend_from_slice(&line.text);
            match line.newline {
                Some(ending) => out.extend_from_slice(ending.as_bytes()),
                None => {
                    out.push(b'\n');
                    push_line(out, no_newline);
                }
            }
        }
    }
}

fn write_text_hunks(out: &mut Vec<u8>, hunks: &[Hunk]) {
    write_hunks(out, hunks, "@@", NO_NEWLINE_AT_END_OF_FILE);
}

fn write_binary_notice(out: &mut Vec<u8>, content: &ContentDiff) {
    let ContentDiff::Binary { old_mime, new_mime } = content else {
        return;
    };
    push_line(out, "Cannot display: file marked as a binary type.");
    let mime = match (old_mime, new_mime) {
        (Some(old), Some(new)) if old != new => format!("({old}, {new})"),
        (_, Some(mime)) | (Some(mime), None) => mime.clone(),
        (None, None) => return,
    };
    push_line(out, &format!("svn:mime-type = {mime}"));
}

/// The `Property changes on:` section. Writes nothing for an empty diff.
fn write_property_changes(out: &mut Vec<u8>, display_path: &str, props: &PropDiff) {
    if props.is_empty() {
        return;
    }
    out.push(b'\n');
    push_line(out, &format!("Property changes on: {display_path}"));
    push_line(out, PROPERTY_SEPARATOR);
    for change in &props.changes {
        push_line(out, &format!("{}: {}", change.kind.label(), change.name));
        write_hunks(out, &change.hunks(), "##", NO_NEWLINE_AT_END_OF_PROPERTY);
    }
}
