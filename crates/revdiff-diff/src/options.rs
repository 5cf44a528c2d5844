use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use revdiff_types::Origin;

use crate::error::{DiffError, DiffResult};

/// How far below the target the comparison descends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    /// The target itself only.
    Empty,
    /// The target and its file children.
    Files,
    /// The target and all of its direct children.
    Immediates,
    #[default]
    Infinity,
}

impl FromStr for Depth {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(Self::Empty),
            "files" => Ok(Self::Files),
            "immediates" => Ok(Self::Immediates),
            "infinity" => Ok(Self::Infinity),
            other => Err(DiffError::Usage(format!("'{other}' is not a valid depth"))),
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty",
            Self::Files => "files",
            Self::Immediates => "immediates",
            Self::Infinity => "infinity",
        })
    }
}

/// Whitespace handling when comparing lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreSpace {
    #[default]
    None,
    /// Treat runs of whitespace as a single space, ignore trailing space.
    Change,
    /// Ignore all whitespace.
    All,
}

/// Options controlling a comparison. Passed by value to every stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DiffOptions {
    /// Use copy/replace ancestry when pairing nodes.
    pub notice_ancestry: bool,
    /// Ignore copy relations and show copies as plain additions.
    pub show_copies_as_adds: bool,
    /// Diff binary files as text.
    pub force: bool,
    /// Ignore `svn:mime-type` when deciding if a file is binary.
    pub ignore_content_type: bool,
    /// Emit one status line per changed node instead of a patch.
    pub summarize_only: bool,
    /// Emit the summary as an XML document.
    pub xml: bool,
    /// Use git-style extended headers.
    pub git_style: bool,
    pub ignore_properties: bool,
    pub properties_only: bool,
    /// Suppress the body of added files.
    pub no_diff_added: bool,
    /// Suppress the body of deleted files.
    pub no_diff_deleted: bool,
    pub depth: Depth,
    /// Unchanged lines shown around each change.
    pub context_lines: usize,
    pub ignore_space: IgnoreSpace,
    /// Compare lines regardless of their terminators.
    pub ignore_eol_style: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            notice_ancestry: false,
            show_copies_as_adds: false,
            force: false,
            ignore_content_type: false,
            summarize_only: false,
            xml: false,
            git_style: false,
            ignore_properties: false,
            properties_only: false,
            no_diff_added: false,
            no_diff_deleted: false,
            depth: Depth::Infinity,
            context_lines: 3,
            ignore_space: IgnoreSpace::None,
            ignore_eol_style: false,
        }
    }
}

impl DiffOptions {
    /// Returns `true` if copied nodes read from `origin` are diffed against
    /// their source. Local copies always are; copies recorded in committed
    /// history only with `notice_ancestry`.
    pub fn tracks_copies(&self, origin: Origin) -> bool {
        !self.show_copies_as_adds && (self.notice_ancestry || origin == Origin::WorkingCopy)
    }

    /// Returns `true` if binary files are diffed as text.
    pub fn treats_binary_as_text(&self) -> bool {
        self.force || self.ignore_content_type
    }

    /// Reject incompatible option combinations.
    pub fn validate(&self) -> DiffResult<()> {
        if self.xml && !self.summarize_only {
            return Err(DiffError::Usage(
                "'--xml' option only valid with '--summarize' option".into(),
            ));
        }
        if self.git_style && self.summarize_only {
            return Err(DiffError::Usage(
                "'--git' option cannot be combined with '--summarize'".into(),
            ));
        }
        if self.properties_only && self.ignore_properties {
            return Err(DiffError::Usage(
                "'--properties-only' and '--ignore-properties' are mutually exclusive".into(),
            ));
        }
        Ok(())
    }

    /// Apply `svn diff -x`-style extension flags (`-b`, `-w`,
    /// `--ignore-eol-style`, `-U N`, `--unified=N`).
    pub fn apply_extensions(&mut self, args: &str) -> DiffResult<()> {
        let mut tokens = args.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "-b" | "--ignore-space-change" => self.ignore_space = IgnoreSpace::Change,
                "-w" | "--ignore-all-space" => self.ignore_space = IgnoreSpace::All,
                "--ignore-eol-style" => self.ignore_eol_style = true,
                "-u" | "--unified" => {}
                "-U" => {
                    let n = tokens
                        .next()
                        .ok_or_else(|| DiffError::Usage("'-U' needs a line count".into()))?;
                    self.context_lines = parse_context(n)?;
                }
                other => {
                    if let Some(n) = other
                        .strip_prefix("--unified=")
                        .or_else(|| other.strip_prefix("-U"))
                    {
                        self.context_lines = parse_context(n)?;
                    } else {
                        return Err(DiffError::Usage(format!(
                            "invalid diff extension option '{other}'"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse_context(n: &str) -> DiffResult<usize> {
    n.parse()
        .map_err(|_| DiffError::Usage(format!("'{n}' is not a valid line count")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let o = DiffOptions::default();
        assert_eq!(o.context_lines, 3);
        assert_eq!(o.depth, Depth::Infinity);
        assert!(!o.notice_ancestry);
        assert!(o.tracks_copies(Origin::WorkingCopy));
        assert!(!o.tracks_copies(Origin::Revision(1)));
        assert!(o.validate().is_ok());
    }

    #[test]
    fn xml_requires_summarize() {
        let o = DiffOptions {
            xml: true,
            ..Default::default()
        };
        let err = o.validate().unwrap_err();
        assert!(matches!(err, DiffError::Usage(_)));
        assert_eq!(
            err.to_string(),
            "'--xml' option only valid with '--summarize' option"
        );

        let ok = DiffOptions {
            xml: true,
            summarize_only: true,
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn conflicting_modes_are_usage_errors() {
        let git_summary = DiffOptions {
            git_style: true,
            summarize_only: true,
            ..Default::default()
        };
        assert!(matches!(git_summary.validate(), Err(DiffError::Usage(_))));

        let props = DiffOptions {
            properties_only: true,
            ignore_properties: true,
            ..Default::default()
        };
        assert!(matches!(props.validate(), Err(DiffError::Usage(_))));
    }

    #[test]
    fn copies_as_adds_disables_tracking() {
        let o = DiffOptions {
            notice_ancestry: true,
            show_copies_as_adds: true,
            ..Default::default()
        };
        assert!(!o.tracks_copies(Origin::WorkingCopy));
        assert!(!o.tracks_copies(Origin::Revision(1)));

        let ancestry = DiffOptions {
            notice_ancestry: true,
            ..Default::default()
        };
        assert!(ancestry.tracks_copies(Origin::Revision(1)));
    }

    #[test]
    fn extensions() {
        let mut o = DiffOptions::default();
        o.apply_extensions("-b --ignore-eol-style -U 5").unwrap();
        assert_eq!(o.ignore_space, IgnoreSpace::Change);
        assert!(o.ignore_eol_style);
        assert_eq!(o.context_lines, 5);

        o.apply_extensions("-w --unified=0").unwrap();
        assert_eq!(o.ignore_space, IgnoreSpace::All);
        assert_eq!(o.context_lines, 0);

        assert!(o.apply_extensions("-p").is_err());
    }

    #[test]
    fn kebab_case_config() {
        let o: DiffOptions =
            serde_json::from_str(r#"{"notice-ancestry": true, "context-lines": 1, "depth": "files"}"#)
                .unwrap();
        assert!(o.notice_ancestry);
        assert_eq!(o.context_lines, 1);
        assert_eq!(o.depth, Depth::Files);
        assert!(!o.force);
    }

    #[test]
    fn depth_parsing() {
        assert_eq!("immediates".parse::<Depth>().unwrap(), Depth::Immediates);
        assert!("deep".parse::<Depth>().is_err());
        assert_eq!(Depth::Files.to_string(), "files");
    }
}
