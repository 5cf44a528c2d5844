//! One status line per changed node, as text or as an XML document.

use revdiff_types::NodeKind;

use crate::result::NodePairResult;
use crate::tree_diff::ChangeKind;

use super::PairRenderer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryRenderer {
    xml: bool,
}

/// The two status columns of a summary line, or `None` if the pair is not
/// listed.
fn columns(pair: &NodePairResult) -> Option<(char, char)> {
    let (text, prop) = match pair.change {
        ChangeKind::Added | ChangeKind::Copied => ('A', ' '),
        ChangeKind::Deleted => ('D', ' '),
        ChangeKind::Modified => (
            if pair.text_changed { 'M' } else { ' ' },
            if pair.props_changed() { 'M' } else { ' ' },
        ),
        ChangeKind::Replaced | ChangeKind::Unchanged => return None,
    };
    (text != ' ' || prop != ' ').then_some((text, prop))
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

impl SummaryRenderer {
    pub fn new(xml: bool) -> Self {
        Self { xml }
    }

    fn xml_entry(pair: &NodePairResult, text: char) -> String {
        let kind = match pair.node_kind {
            NodeKind::Directory => "dir",
            _ => "file",
        };
        let item = match text {
            'A' => "added",
            'D' => "deleted",
            'M' => "modified",
            _ => "none",
        };
        let props = if pair.change == ChangeKind::Modified && pair.props_changed() {
            "modified"
        } else {
            "none"
        };
        format!(
            "<path\n   kind=\"{kind}\"\n   item=\"{item}\"\n   props=\"{props}\">{}</path>\n",
            escape_xml(&pair.display_path)
        )
    }
}

impl PairRenderer for SummaryRenderer {
    fn prologue(&self) -> Vec<u8> {
        if self.xml {
            b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<diff>\n<paths>\n".to_vec()
        } else {
            Vec::new()
        }
    }

    fn render(&self, pair: &NodePairResult) -> Vec<u8> {
        let Some((text, prop)) = columns(pair) else {
            return Vec::new();
        };
        if self.xml {
            Self::xml_entry(pair, text).into_bytes()
        } else {
            format!("{text}{prop}      {}\n", pair.display_path).into_bytes()
        }
    }

    fn epilogue(&self) -> Vec<u8> {
        if self.xml {
            b"</paths>\n</diff>\n".to_vec()
        } else {
            Vec::new()
        }
    }
}
