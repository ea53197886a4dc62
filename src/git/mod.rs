//! Git layer for pullgate
//!
//! The gate never talks to git directly. It goes through [`VcsClient`],
//! which exposes the handful of commands it needs (fetch, rev-list count,
//! pull) plus a metadata refresh.
//!
//! # Metadata Model
//!
//! A [`Repository`] caches its current branch and that branch's tracked
//! remote branch. The cache is read with libgit2 when the repository is
//! opened and must be refreshed after any command that moves refs
//! (fetch, pull), so later reads in the same run see fresh state.

use git2::{Branch, ErrorCode, Repository as Git2Repo};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

mod cli;
mod discover;

pub use cli::GitCli;
pub use discover::{discover_participating, discover_repositories};

/// A remote-tracking branch, e.g. `origin/main`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteBranch {
    pub name: String,
}

impl RemoteBranch {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A local branch and the remote branch it tracks, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalBranch {
    pub name: String,
    pub tracked: Option<RemoteBranch>,
}

impl LocalBranch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracked: None,
        }
    }

    /// Set the tracked remote branch
    pub fn tracking(mut self, remote: impl Into<String>) -> Self {
        self.tracked = Some(RemoteBranch::new(remote));
        self
    }

    /// The remote branch this branch compares against for push/pull
    pub fn tracked_branch(&self) -> Option<&RemoteBranch> {
        self.tracked.as_ref()
    }
}

/// A git working copy taking part in a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    root: PathBuf,
    head: Option<LocalBranch>,
}

impl Repository {
    /// Build a repository handle from already-known metadata
    pub fn new(root: impl Into<PathBuf>, head: Option<LocalBranch>) -> Self {
        Self {
            root: root.into(),
            head,
        }
    }

    /// Open the working copy at `root` and read its branch metadata
    pub fn open(root: &Path) -> Result<Self> {
        let head = read_head(root)?;
        Ok(Self::new(root, head))
    }

    /// Root of the working copy
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Short display name (the root directory's name)
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    /// The checked-out branch, if HEAD is on one
    pub fn current_branch(&self) -> Option<&LocalBranch> {
        self.head.as_ref()
    }

    /// Replace the cached branch metadata
    pub fn set_head(&mut self, head: Option<LocalBranch>) {
        self.head = head;
    }
}

/// Read the current branch and its upstream with libgit2
///
/// Detached and unborn HEADs have no current branch.
pub fn read_head(root: &Path) -> Result<Option<LocalBranch>> {
    let repo = Git2Repo::open(root).map_err(|e| match e.code() {
        ErrorCode::NotFound => Error::NotARepository {
            path: root.to_path_buf(),
        },
        _ => e.into(),
    })?;

    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            return Ok(None)
        }
        Err(e) => return Err(e.into()),
    };

    if !head.is_branch() {
        return Ok(None);
    }

    let name = match head.shorthand() {
        Some(name) => name.to_string(),
        None => return Ok(None),
    };

    let tracked = match Branch::wrap(head).upstream() {
        Ok(upstream) => upstream.name()?.map(RemoteBranch::new),
        Err(e) if e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    Ok(Some(LocalBranch { name, tracked }))
}

/// Result of running a git command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub output: String,
    pub error_output: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error_output: String::new(),
        }
    }

    pub fn failed(error_output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error_output: error_output.into(),
        }
    }
}

/// The commands the gate needs from a version-control backend
///
/// `Err` means the command could not be executed at all; a command that
/// ran and failed comes back as `Ok` with `success == false`.
pub trait VcsClient: Send + Sync {
    /// Update all remotes of the repository
    fn run_fetch_all(&self, repository: &Repository) -> Result<CommandOutput>;

    /// Count commits in `range` (`local..remote`)
    fn run_rev_list_count(&self, repository: &Repository, range: &str) -> Result<CommandOutput>;

    /// Pull the current branch from its tracked remote
    fn run_pull(&self, repository: &Repository) -> Result<CommandOutput>;

    /// Re-read cached branch and tracking metadata
    fn refresh_metadata(&self, repository: &mut Repository) -> Result<()>;
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.display())
    }
}
