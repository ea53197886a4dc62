//! Gate configuration
//!
//! Configuration is read from `.pullgate.yaml` at a repository root:
//!
//! ```yaml
//! enabled: true
//! fetch_args: ["--all", "--prune"]
//! pull_args: ["--rebase"]
//! non_interactive: commit_anyway
//! ```
//!
//! Every key is optional. A missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::gate::SyncDecision;

/// File name looked up at a repository root
pub const CONFIG_FILE_NAME: &str = ".pullgate.yaml";

/// Environment variable that bypasses the gate for a single run
pub const SKIP_ENV_VAR: &str = "PULLGATE_SKIP";

/// Environment variable that forces the non-interactive decision
pub const NON_INTERACTIVE_ENV_VAR: &str = "PULLGATE_NON_INTERACTIVE";

/// Settings for one gate invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GateConfig {
    /// When false the gate always proceeds
    pub enabled: bool,
    /// Arguments passed after `git fetch`
    pub fetch_args: Vec<String>,
    /// Arguments passed after `git pull`
    pub pull_args: Vec<String>,
    /// Decision taken when no terminal is attached
    pub non_interactive: SyncDecision,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fetch_args: vec!["--all".to_string()],
            pull_args: Vec::new(),
            non_interactive: SyncDecision::CommitAnyway,
        }
    }
}

impl GateConfig {
    /// Load the config from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load `.pullgate.yaml` from a repository root, falling back to defaults
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path_in(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Parse config from YAML text; an empty document yields the defaults
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Location of the config file for a repository root
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Apply environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if env_flag_set(SKIP_ENV_VAR) {
            tracing::info!("{} is set, gate disabled for this run", SKIP_ENV_VAR);
            self.enabled = false;
        }
        self
    }
}

/// True when `PULLGATE_NON_INTERACTIVE` asks for no prompting
pub fn non_interactive_requested() -> bool {
    env_flag_set(NON_INTERACTIVE_ENV_VAR)
}

fn env_flag_set(name: &str) -> bool {
    flag_value_set(std::env::var(name).ok().as_deref())
}

fn flag_value_set(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if !v.is_empty() && v != "0")
}
