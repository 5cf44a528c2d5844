use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use revdiff_diff::DiffOptions;

/// Contents of a `--config` file. Command-line flags override it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub diff: DiffOptions,
    /// Extension options applied before any `-x` on the command line.
    pub extensions: Option<String>,
}

impl CliConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("invalid config file")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_toml_str(&text)
    }
}
