//! Repository discovery
//!
//! Repositories are returned sorted by root path. The gate walks them in
//! that order, so the branch pair shown to the operator is the one from the
//! last behind repository in path order.

use git2::{ErrorCode, Repository as Git2Repo};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::Repository;
use crate::error::{Error, Result};

/// Find the repositories taking part in a commit
///
/// Each path resolves to its enclosing working copy. With `recursive`,
/// nested working copies below each path are included as well.
pub fn discover_repositories(paths: &[PathBuf], recursive: bool) -> Result<Vec<Repository>> {
    collect(paths, recursive, false)
}

/// Like [`discover_repositories`], but a path outside any working copy is
/// skipped with a warning instead of failing the whole lookup
///
/// The gate uses this: a commit with no repositories to check proceeds.
pub fn discover_participating(paths: &[PathBuf], recursive: bool) -> Result<Vec<Repository>> {
    collect(paths, recursive, true)
}

fn collect(paths: &[PathBuf], recursive: bool, skip_outside: bool) -> Result<Vec<Repository>> {
    let mut roots = BTreeSet::new();

    for path in paths {
        match enclosing_root(path) {
            Ok(root) => {
                roots.insert(root);
            }
            Err(e @ (Error::NotARepository { .. } | Error::BareRepository { .. }))
                if skip_outside =>
            {
                tracing::warn!("Skipping {}: {}", path.display(), e);
            }
            Err(e) => return Err(e),
        }

        if recursive {
            for nested in nested_roots(path) {
                roots.insert(nested);
            }
        }
    }

    roots.into_iter().map(|root| Repository::open(&root)).collect()
}

fn enclosing_root(path: &Path) -> Result<PathBuf> {
    let repo = Git2Repo::discover(path).map_err(|e| match e.code() {
        ErrorCode::NotFound => Error::NotARepository {
            path: path.to_path_buf(),
        },
        _ => e.into(),
    })?;

    let workdir = repo.workdir().ok_or_else(|| Error::BareRepository {
        path: repo.path().to_path_buf(),
    })?;

    normalize(workdir)
}

/// Working copies below `path`, found by their `.git` entry
fn nested_roots(path: &Path) -> Vec<PathBuf> {
    let mut roots = Vec::new();

    let walker = WalkDir::new(path)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git" || e.depth() == 0);

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_dir() {
            continue;
        }
        if !entry.path().join(".git").exists() {
            continue;
        }
        match normalize(entry.path()) {
            Ok(root) => roots.push(root),
            Err(e) => tracing::warn!("Skipping {:?}: {}", entry.path(), e),
        }
    }

    roots
}

fn normalize(path: &Path) -> Result<PathBuf> {
    Ok(std::fs::canonicalize(path)?)
}
