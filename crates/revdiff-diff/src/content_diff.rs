//! File content diff: binary detection, eol translation and line hunks.
//!
//! Lines are compared through the `similar` crate (Myers algorithm) on
//! comparison keys, while the hunks carry the original bytes of each line,
//! so whitespace- or eol-insensitive comparisons still emit what is in the
//! file.

use similar::{Algorithm, DiffOp, DiffTag};

use revdiff_store::NodeStore;
use revdiff_types::{EolStyle, NodeState};

use crate::error::{DiffError, DiffResult};
use crate::options::{DiffOptions, IgnoreSpace};

/// How a line was terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineEnding {
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
            Self::Cr => b"\r",
        }
    }
}

/// One line of a file, borrowed from its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    pub text: &'a [u8],
    /// `None` for a final line without terminator.
    pub ending: Option<LineEnding>,
}

/// Split content into lines on `\n`, `\r\n` and lone `\r`.
pub fn split_lines(data: &[u8]) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < data.len() {
        let ending = match data[i] {
            b'\n' => Some((LineEnding::Lf, 1)),
            b'\r' if data.get(i + 1) == Some(&b'\n') => Some((LineEnding::CrLf, 2)),
            b'\r' => Some((LineEnding::Cr, 1)),
            _ => None,
        };
        match ending {
            Some((ending, width)) => {
                lines.push(Line {
                    text: &data[start..i],
                    ending: Some(ending),
                });
                i += width;
                start = i;
            }
            None => i += 1,
        }
    }
    if start < data.len() {
        lines.push(Line {
            text: &data[start..],
            ending: None,
        });
    }
    lines
}

/// Rewrite every line terminator to the one `style` prescribes.
pub fn translate_eol(data: &[u8], style: EolStyle) -> Vec<u8> {
    let terminator = style.terminator();
    let mut out = Vec::with_capacity(data.len());
    for line in split_lines(data) {
        out.extend_from_slice(line.text);
        if line.ending.is_some() {
            out.extend_from_slice(terminator);
        }
    }
    out
}

/// Whether a line was kept, added or deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineKind {
    Context,
    Added,
    Deleted,
}

/// A single line in a hunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: Vec<u8>,
    pub newline: Option<LineEnding>,
}

/// A contiguous region of changes with surrounding context.
///
/// Starts are as printed in a hunk header: 1-based, or the line before the
/// hunk when the range is empty (`-0,0` for an added file).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<DiffLine>,
}

/// Line-level diff of two texts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextDiff {
    pub hunks: Vec<Hunk>,
}

impl TextDiff {
    /// Returns `true` if the texts compared equal.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn additions(&self) -> usize {
        self.count(LineKind::Added)
    }

    pub fn deletions(&self) -> usize {
        self.count(LineKind::Deleted)
    }

    fn count(&self, kind: LineKind) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| l.kind == kind)
            .count()
    }
}

/// Outcome of comparing the content of two file nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentDiff {
    Text(TextDiff),
    /// At least one side is binary; no hunks are produced.
    Binary {
        old_mime: Option<String>,
        new_mime: Option<String>,
    },
}

/// Returns `true` if the node's mime type marks it as binary.
pub fn is_binary(node: &NodeState) -> bool {
    match node.mime_type() {
        Some(mime) => {
            !mime.starts_with("text/") && mime != "image/x-xbitmap" && mime != "image/x-xpixmap"
        }
        None => false,
    }
}

/// Compare two texts line by line.
pub fn diff_lines(old: &[u8], new: &[u8], options: &DiffOptions) -> TextDiff {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let old_keys: Vec<Vec<u8>> = old_lines.iter().map(|l| line_key(l, options)).collect();
    let new_keys: Vec<Vec<u8>> = new_lines.iter().map(|l| line_key(l, options)).collect();
    if old_keys == new_keys {
        return TextDiff::default();
    }

    let ops = aligned_ops(&old_keys, &new_keys);
    let mut hunks = Vec::new();
    for group in similar::group_diff_ops(ops, options.context_lines) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        let mut lines = Vec::new();
        for op in &group {
            let (tag, old_ops, new_ops) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => {
                    lines.extend(old_ops.map(|i| to_diff_line(LineKind::Context, &old_lines[i])));
                }
                DiffTag::Delete => {
                    lines.extend(old_ops.map(|i| to_diff_line(LineKind::Deleted, &old_lines[i])));
                }
                DiffTag::Insert => {
                    lines.extend(new_ops.map(|i| to_diff_line(LineKind::Added, &new_lines[i])));
                }
                DiffTag::Replace => {
                    lines.extend(old_ops.map(|i| to_diff_line(LineKind::Deleted, &old_lines[i])));
                    lines.extend(new_ops.map(|i| to_diff_line(LineKind::Added, &new_lines[i])));
                }
            }
        }

        hunks.push(Hunk {
            old_start: header_start(old_range.start, old_range.len()),
            old_len: old_range.len(),
            new_start: header_start(new_range.start, new_range.len()),
            new_len: new_range.len(),
            lines,
        });
    }
    TextDiff { hunks }
}

/// Line alignment that does not depend on which side is old: the pair is
/// always diffed in one canonical order and mirrored when needed, so
/// swapping the endpoints yields the exact inverse hunks.
fn aligned_ops(old_keys: &[Vec<u8>], new_keys: &[Vec<u8>]) -> Vec<DiffOp> {
    if old_keys <= new_keys {
        return similar::capture_diff_slices(Algorithm::Myers, old_keys, new_keys);
    }
    similar::capture_diff_slices(Algorithm::Myers, new_keys, old_keys)
        .into_iter()
        .map(mirror_op)
        .collect()
}

fn mirror_op(op: DiffOp) -> DiffOp {
    match op {
        DiffOp::Equal {
            old_index,
            new_index,
            len,
        } => DiffOp::Equal {
            old_index: new_index,
            new_index: old_index,
            len,
        },
        DiffOp::Delete {
            old_index,
            old_len,
            new_index,
        } => DiffOp::Insert {
            old_index: new_index,
            new_index: old_index,
            new_len: old_len,
        },
        DiffOp::Insert {
            old_index,
            new_index,
            new_len,
        } => DiffOp::Delete {
            old_index: new_index,
            old_len: new_len,
            new_index: old_index,
        },
        DiffOp::Replace {
            old_index,
            old_len,
            new_index,
            new_len,
        } => DiffOp::Replace {
            old_index: new_index,
            old_len: new_len,
            new_index: old_index,
            new_len: old_len,
        },
    }
}

fn header_start(start: usize, len: usize) -> usize {
    if len == 0 {
        start
    } else {
        start + 1
    }
}

fn to_diff_line(kind: LineKind, line: &Line<'_>) -> DiffLine {
    DiffLine {
        kind,
        text: line.text.to_vec(),
        newline: line.ending,
    }
}

fn line_key(line: &Line<'_>, options: &DiffOptions) -> Vec<u8> {
    let mut key: Vec<u8> = match options.ignore_space {
        IgnoreSpace::None => line.text.to_vec(),
        IgnoreSpace::All => line
            .text
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect(),
        IgnoreSpace::Change => {
            let mut out = Vec::with_capacity(line.text.len());
            let mut in_space = false;
            for &b in line.text {
                if b.is_ascii_whitespace() {
                    in_space = true;
                } else {
                    if in_space && !out.is_empty() {
                        out.push(b' ');
                    }
                    in_space = false;
                    out.push(b);
                }
            }
            if in_space && out.is_empty() && !line.text.is_empty() {
                out.push(b' ');
            }
            out
        }
    };
    if !options.ignore_eol_style {
        if let Some(ending) = line.ending {
            key.extend_from_slice(ending.as_bytes());
        }
    }
    key
}

/// Content of a file node as the user sees it: translated to the node's
/// own eol style. Non-files read as empty.
fn load(store: &dyn NodeStore, node: &NodeState) -> DiffResult<Vec<u8>> {
    let Some(id) = node.content.filter(|_| node.is_file()) else {
        return Ok(Vec::new());
    };
    let data = store
        .read_content(&id)?
        .ok_or(DiffError::MissingContent(id))?;
    Ok(match node.eol_style() {
        Some(style) => translate_eol(&data, style),
        None => data,
    })
}

/// Compare the content of two nodes (either may be nonexistent).
///
/// Returns `None` when the two sides show the same bytes. Content is only
/// loaded when the content ids or eol styles differ.
pub fn diff_content(
    store: &dyn NodeStore,
    left: &NodeState,
    right: &NodeState,
    options: &DiffOptions,
) -> DiffResult<Option<ContentDiff>> {
    let left_file = left.is_file();
    let right_file = right.is_file();
    if !left_file && !right_file {
        return Ok(None);
    }
    if left_file && right_file && left.content == right.content && left.eol_style() == right.eol_style() {
        return Ok(None);
    }

    if !options.treats_binary_as_text() && (is_binary(left) || is_binary(right)) {
        return Ok(Some(ContentDiff::Binary {
            old_mime: left.mime_type().map(str::to_string),
            new_mime: right.mime_type().map(str::to_string),
        }));
    }

    let old = load(store, left)?;
    let new = load(store, right)?;
    let diff = diff_lines(&old, &new, options);
    if diff.is_empty() && left_file && right_file {
        return Ok(None);
    }
    Ok(Some(ContentDiff::Text(diff)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use revdiff_store::InMemoryNodeStore;
    use revdiff_types::{ContentId, Origin, PropMap, RelPath, PROP_EOL_STYLE, PROP_MIME_TYPE};

    fn opts() -> DiffOptions {
        DiffOptions::default()
    }

    fn texts(diff: &TextDiff) -> Vec<(LineKind, String)> {
        diff.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .map(|l| (l.kind, String::from_utf8_lossy(&l.text).into_owned()))
            .collect()
    }

    #[test]
    fn split_handles_all_terminators() {
        let lines = split_lines(b"a\nb\r\nc\rd");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].ending, Some(LineEnding::Lf));
        assert_eq!(lines[1].ending, Some(LineEnding::CrLf));
        assert_eq!(lines[2].ending, Some(LineEnding::Cr));
        assert_eq!(lines[3], Line { text: b"d", ending: None });
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn translate_rewrites_terminators() {
        assert_eq!(translate_eol(b"a\nb\r\nc", EolStyle::CrLf), b"a\r\nb\r\nc");
        assert_eq!(translate_eol(b"a\r\nb\r", EolStyle::Lf), b"a\nb\n");
    }

    #[test]
    fn identical_texts_have_no_hunks() {
        let diff = diff_lines(b"hello\nworld\n", b"hello\nworld\n", &opts());
        assert!(diff.is_empty());
    }

    #[test]
    fn appended_line() {
        let diff = diff_lines(b"This is the file 'iota'.\n", b"This is the file 'iota'.\nsecond line\n", &opts());
        assert_eq!(diff.hunks.len(), 1);
        let h = &diff.hunks[0];
        assert_eq!((h.old_start, h.old_len, h.new_start, h.new_len), (1, 1, 1, 2));
        assert_eq!(
            texts(&diff),
            vec![
                (LineKind::Context, "This is the file 'iota'.".to_string()),
                (LineKind::Added, "second line".to_string()),
            ]
        );
    }

    #[test]
    fn added_file_starts_at_zero() {
        let diff = diff_lines(b"", b"new\n", &opts());
        let h = &diff.hunks[0];
        assert_eq!((h.old_start, h.old_len, h.new_start, h.new_len), (0, 0, 1, 1));
        let diff = diff_lines(b"old\n", b"", &opts());
        let h = &diff.hunks[0];
        assert_eq!((h.old_start, h.old_len, h.new_start, h.new_len), (1, 1, 0, 0));
    }

    #[test]
    fn distant_changes_make_separate_hunks() {
        let old: String = (1..=20).map(|i| format!("line {i}\n")).collect();
        let new = old.replace("line 2\n", "line two\n").replace("line 18\n", "line eighteen\n");
        let diff = diff_lines(old.as_bytes(), new.as_bytes(), &opts());
        assert_eq!(diff.hunks.len(), 2);
        assert_eq!(diff.hunks[0].old_start, 1);
        assert_eq!(diff.hunks[0].old_len, 5);
        assert_eq!(diff.hunks[1].old_start, 15);

        // Close changes merge into one hunk.
        let near = old.replace("line 2\n", "line two\n").replace("line 6\n", "line six\n");
        assert_eq!(diff_lines(old.as_bytes(), near.as_bytes(), &opts()).hunks.len(), 1);
    }

    #[test]
    fn reversed_diff_mirrors_the_forward_one() {
        let a = b"x\ny\nshared\nz\n";
        let b = b"y\nx\nshared\n";
        let forward = diff_lines(a, b, &opts());
        let backward = diff_lines(b, a, &opts());
        assert_eq!(forward.hunks.len(), backward.hunks.len());
        for (f, r) in forward.hunks.iter().zip(&backward.hunks) {
            assert_eq!((f.old_start, f.old_len), (r.new_start, r.new_len));
            assert_eq!((f.new_start, f.new_len), (r.old_start, r.old_len));
            let side = |h: &Hunk, drop: LineKind| -> Vec<Vec<u8>> {
                h.lines.iter().filter(|l| l.kind != drop).map(|l| l.text.clone()).collect()
            };
            assert_eq!(side(f, LineKind::Added), side(r, LineKind::Deleted));
            assert_eq!(side(f, LineKind::Deleted), side(r, LineKind::Added));
        }
    }

    #[test]
    fn missing_final_newline_is_a_change() {
        let diff = diff_lines(b"a\nb\n", b"a\nb", &opts());
        let last = diff.hunks[0].lines.last().unwrap();
        assert_eq!(last.kind, LineKind::Added);
        assert_eq!(last.newline, None);
    }

    #[test]
    fn whitespace_options() {
        let change = DiffOptions {
            ignore_space: IgnoreSpace::Change,
            ..opts()
        };
        assert!(diff_lines(b"a  b \n", b"a b\n", &change).is_empty());
        assert!(!diff_lines(b"ab\n", b"a b\n", &change).is_empty());

        let all = DiffOptions {
            ignore_space: IgnoreSpace::All,
            ..opts()
        };
        assert!(diff_lines(b"ab\n", b" a b\n", &all).is_empty());

        let eol = DiffOptions {
            ignore_eol_style: true,
            ..opts()
        };
        assert!(diff_lines(b"a\r\nb\n", b"a\nb\r\n", &eol).is_empty());
        assert!(!diff_lines(b"a\r\nb\n", b"a\nb\r\n", &opts()).is_empty());
    }

    #[test]
    fn ignored_differences_still_emit_original_text() {
        let change = DiffOptions {
            ignore_space: IgnoreSpace::Change,
            ..opts()
        };
        let diff = diff_lines(b"a  b\nx\n", b"a b\ny\n", &change);
        assert_eq!(diff.hunks[0].lines[0].text, b"a  b");
        assert_eq!(diff.hunks[0].lines[0].kind, LineKind::Context);
    }

    #[test]
    fn mime_type_detection() {
        let node = |mime: &str| {
            let mut props = PropMap::new();
            props.insert(PROP_MIME_TYPE.into(), mime.into());
            NodeState::file(RelPath::root(), ContentId::from_bytes(b""), Origin::WorkingCopy).with_props(props)
        };
        assert!(is_binary(&node("application/octet-stream")));
        assert!(!is_binary(&node("text/plain")));
        assert!(!is_binary(&node("image/x-xbitmap")));
        assert!(is_binary(&node("image/png")));
    }

    fn file(store: &InMemoryNodeStore, data: &[u8], props: &[(&str, &str)]) -> NodeState {
        let id = store.put_content(data);
        let props: PropMap = props.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        NodeState::file(RelPath::parse("f").unwrap(), id, Origin::Revision(1)).with_props(props)
    }

    #[test]
    fn binary_pairs_produce_a_notice() {
        let store = InMemoryNodeStore::new();
        let left = file(&store, b"\x00\x01", &[(PROP_MIME_TYPE, "application/octet-stream")]);
        let right = file(&store, b"\x00\x02", &[(PROP_MIME_TYPE, "application/octet-stream")]);
        let diff = diff_content(&store, &left, &right, &opts()).unwrap().unwrap();
        assert_eq!(
            diff,
            ContentDiff::Binary {
                old_mime: Some("application/octet-stream".into()),
                new_mime: Some("application/octet-stream".into()),
            }
        );

        let force = DiffOptions { force: true, ..opts() };
        let diff = diff_content(&store, &left, &right, &force).unwrap().unwrap();
        assert!(matches!(diff, ContentDiff::Text(_)));
    }

    #[test]
    fn eol_style_translation_shows_user_bytes() {
        let store = InMemoryNodeStore::new();
        let left = file(&store, b"line\n", &[]);
        let right = file(&store, b"line\n", &[(PROP_EOL_STYLE, "CRLF")]);
        let Some(ContentDiff::Text(diff)) = diff_content(&store, &left, &right, &opts()).unwrap() else {
            panic!("expected a text diff");
        };
        let lines = &diff.hunks[0].lines;
        assert_eq!(lines[0].kind, LineKind::Deleted);
        assert_eq!(lines[0].newline, Some(LineEnding::Lf));
        assert_eq!(lines[1].kind, LineKind::Added);
        assert_eq!(lines[1].newline, Some(LineEnding::CrLf));
    }

    #[test]
    fn same_content_is_not_loaded() {
        let store = InMemoryNodeStore::new();
        // Content id is never stored; a lookup would fail.
        let id = ContentId::from_bytes(b"never stored");
        let left = NodeState::file(RelPath::root(), id, Origin::Revision(1));
        let right = NodeState::file(RelPath::root(), id, Origin::WorkingCopy);
        assert_eq!(diff_content(&store, &left, &right, &opts()).unwrap(), None);

        let other = NodeState::file(RelPath::root(), ContentId::from_bytes(b"x"), Origin::WorkingCopy);
        assert!(matches!(
            diff_content(&store, &left, &other, &opts()),
            Err(DiffError::MissingContent(_))
        ));
    }
}
