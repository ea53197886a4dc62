//! [`VcsClient`] backed by the `git` binary

use std::path::Path;
use std::process::Command;

use super::{read_head, CommandOutput, Repository, VcsClient};
use crate::config::GateConfig;
use crate::error::{Error, Result};

/// Variables git exports to hooks that would redirect child commands away
/// from the repository they run in. Inside a pre-commit hook
/// `GIT_INDEX_FILE` names the commit's locked index.
const INHERITED_REPOSITORY_ENV: &[&str] = &[
    "GIT_INDEX_FILE",
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_PREFIX",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
];

/// Runs git commands in each repository's working directory
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    fetch_args: Vec<String>,
    pull_args: Vec<String>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::from_config(&GateConfig::default())
    }
}

impl GitCli {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            program: "git".to_string(),
            fetch_args: config.fetch_args.clone(),
            pull_args: config.pull_args.clone(),
        }
    }

    /// Use a different git executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, root: &Path, args: &[&str]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(root)
            .env("GIT_TERMINAL_PROMPT", "0");
        for name in INHERITED_REPOSITORY_ENV {
            command.env_remove(name);
        }
        command
    }

    fn run(&self, root: &Path, args: &[&str]) -> Result<CommandOutput> {
        let command = args.join(" ");
        tracing::debug!("running '{} {}' in {}", self.program, command, root.display());

        let output = self
            .command(root, args)
            .output()
            .map_err(|source| Error::CommandSpawn {
                command,
                root: root.to_path_buf(),
                source,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            output: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            error_output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl VcsClient for GitCli {
    fn run_fetch_all(&self, repository: &Repository) -> Result<CommandOutput> {
        let mut args = vec!["fetch"];
        args.extend(self.fetch_args.iter().map(String::as_str));
        self.run(repository.root(), &args)
    }

    fn run_rev_list_count(&self, repository: &Repository, range: &str) -> Result<CommandOutput> {
        self.run(repository.root(), &["rev-list", "--count", range, "--"])
    }

    fn run_pull(&self, repository: &Repository) -> Result<CommandOutput> {
        let mut args = vec!["pull"];
        args.extend(self.pull_args.iter().map(String::as_str));
        self.run(repository.root(), &args)
    }

    fn refresh_metadata(&self, repository: &mut Repository) -> Result<()> {
        let head = read_head(repository.root())?;
        repository.set_head(head);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use tempfile::TempDir;

    #[test]
    fn test_missing_program_is_a_fault() {
        let tmp = TempDir::new().unwrap();
        let cli = GitCli::default().with_program("pullgate-no-such-git");
        let repo = Repository::new(tmp.path(), None);

        let err = cli.run_fetch_all(&repo).unwrap_err();
        assert!(matches!(err, Error::CommandSpawn { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_hook_environment_is_cleared() {
        let cli = GitCli::default();
        let command = cli.command(Path::new("."), &["pull"]);
        let envs: Vec<_> = command.get_envs().collect();

        for name in ["GIT_INDEX_FILE", "GIT_DIR", "GIT_WORK_TREE"] {
            assert!(
                envs.contains(&(OsStr::new(name), None)),
                "{} should be removed",
                name
            );
        }
        assert!(envs.contains(&(OsStr::new("GIT_TERMINAL_PROMPT"), Some(OsStr::new("0")))));
    }

    #[test]
    fn test_args_follow_config() {
        let config = GateConfig {
            fetch_args: vec!["--all".into(), "--prune".into()],
            pull_args: vec!["--rebase".into()],
            ..GateConfig::default()
        };
        let cli = GitCli::from_config(&config);
        assert_eq!(cli.fetch_args, vec!["--all", "--prune"]);
        assert_eq!(cli.pull_args, vec!["--rebase"]);
        assert_eq!(cli.program, "git");
    }
}
