//! Revision numbers and keywords as given by a caller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// An unresolved revision: a number or one of the symbolic keywords.
///
/// `BASE`, `COMMITTED`, `PREV` and `WORKING` are only meaningful for
/// working-copy targets; they resolve against the working copy's recorded
/// state. `HEAD` is the youngest revision of the repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevisionSpec {
    Number(u64),
    Head,
    Base,
    Committed,
    Prev,
    Working,
}

impl RevisionSpec {
    /// Returns `true` for keywords that need working-copy metadata.
    pub fn needs_working_copy(&self) -> bool {
        matches!(self, Self::Base | Self::Committed | Self::Prev | Self::Working)
    }
}

impl FromStr for RevisionSpec {
    type Err = TypeError;

    /// Accepts `N`, `rN` and the keywords in any letter case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('r')
            .or_else(|| trimmed.strip_prefix('R'))
            .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(trimmed);
        if let Ok(rev) = digits.parse::<u64>() {
            return Ok(Self::Number(rev));
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "HEAD" => Ok(Self::Head),
            "BASE" => Ok(Self::Base),
            "COMMITTED" => Ok(Self::Committed),
            "PREV" => Ok(Self::Prev),
            "WORKING" => Ok(Self::Working),
            _ => Err(TypeError::InvalidRevision(s.to_string())),
        }
    }
}

impl fmt::Display for RevisionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(rev) => write!(f, "{rev}"),
            Self::Head => write!(f, "HEAD"),
            Self::Base => write!(f, "BASE"),
            Self::Committed => write!(f, "COMMITTED"),
            Self::Prev => write!(f, "PREV"),
            Self::Working => write!(f, "WORKING"),
        }
    }
}
