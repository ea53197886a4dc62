//! Pre-commit hook installation
//!
//! The hook runs `pullgate check --hook` from git's pre-commit stage. Git
//! gives hooks no stdin, so the script re-attaches the terminal when one
//! exists; without one the gate falls back to its non-interactive decision.
//!
//! `git commit` holds the index lock while the hook runs, so the hook never
//! pulls. Choosing to pull stops the commit; `pullgate sync` then pulls
//! outside of git and the commit is retried.

use git2::Repository as Git2Repo;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Marker identifying hooks written by pullgate
pub const HOOK_MARKER: &str = "# managed by pullgate";

const HOOK_NAME: &str = "pre-commit";

/// Render the hook script for the given pullgate executable
pub fn hook_script(program: &str) -> String {
    format!(
        "#!/bin/sh\n\
         {marker}\n\
         if (exec < /dev/tty) 2>/dev/null; then\n\
         \texec < /dev/tty\n\
         fi\n\
         exec {program} check --hook \"$(git rev-parse --show-toplevel)\"\n",
        marker = HOOK_MARKER,
        program = shell_quote(program)
    )
}

/// Quote a word for `/bin/sh` so it is taken literally
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', "'\\''"))
}

/// Where the pre-commit hook lives, honouring `core.hooksPath`
pub fn hook_path(root: &Path) -> Result<PathBuf> {
    let repo = Git2Repo::open(root).map_err(|_| Error::NotARepository {
        path: root.to_path_buf(),
    })?;

    let hooks_dir = match repo.config()?.get_path("core.hooksPath") {
        Ok(dir) if dir.is_absolute() => dir,
        Ok(dir) => repo.workdir().unwrap_or_else(|| repo.path()).join(dir),
        Err(_) => repo.path().join("hooks"),
    };

    Ok(hooks_dir.join(HOOK_NAME))
}

/// Write the pre-commit hook; returns its path
///
/// An existing hook not written by pullgate is kept unless `force` is set.
pub fn install(root: &Path, program: &str, force: bool) -> Result<PathBuf> {
    let path = hook_path(root)?;

    if !force && path.exists() && !is_managed(&path) {
        return Err(Error::ForeignHook { path });
    }

    let write_err = |source| Error::HookWrite {
        path: path.clone(),
        source,
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    std::fs::write(&path, hook_script(program)).map_err(write_err)?;
    make_executable(&path).map_err(write_err)?;

    tracing::info!("Installed pre-commit hook at {}", path.display());
    Ok(path)
}

/// Remove the pre-commit hook if pullgate wrote it; returns whether it did
pub fn uninstall(root: &Path) -> Result<bool> {
    let path = hook_path(root)?;

    if !path.exists() {
        return Ok(false);
    }
    if !is_managed(&path) {
        return Err(Error::ForeignHook { path });
    }

    std::fs::remove_file(&path)?;
    tracing::info!("Removed pre-commit hook at {}", path.display());
    Ok(true)
}

fn is_managed(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .map(|content| content.contains(HOOK_MARKER))
        .unwrap_or(false)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
