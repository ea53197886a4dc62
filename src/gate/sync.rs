//! Pulling every repository before the commit
//!
//! The batch is sequential and fail-fast. The first repository that fails
//! stops the batch; repositories pulled before it stay pulled. A pull only
//! integrates remote commits, so there is nothing to roll back.

use std::path::PathBuf;
use std::sync::Arc;

use super::cancel::CancellationFlag;
use super::progress::ProgressReporter;
use super::prompt::UserPrompt;
use crate::git::{Repository, VcsClient};

pub const PULL_ERROR_TITLE: &str = "Git Pull Error";
pub const PULL_DONE_TITLE: &str = "Git Pull Complete";
pub const PULL_DONE_MESSAGE: &str = "Pull succeeded. You can continue committing.";
pub const PULL_DEFERRED_MESSAGE: &str =
    "Commit stopped so the pull can run outside git's commit. Run `pullgate sync`, then commit again.";

/// How a pull batch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Every repository was pulled
    Completed { synced: Vec<PathBuf> },
    /// Cancellation stopped the batch before every repository was pulled
    Cancelled { synced: Vec<PathBuf> },
    /// Pulling `repository` failed with `message`
    Failed {
        synced: Vec<PathBuf>,
        repository: PathBuf,
        message: String,
    },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Completed { .. })
    }

    /// Repositories pulled before the batch ended
    pub fn synced(&self) -> &[PathBuf] {
        match self {
            SyncOutcome::Completed { synced }
            | SyncOutcome::Cancelled { synced }
            | SyncOutcome::Failed { synced, .. } => synced,
        }
    }

    /// Tell the operator how the batch went; cancellation is silent
    pub fn notify(&self, prompt: &dyn UserPrompt) {
        match self {
            SyncOutcome::Completed { .. } => prompt.show_info(PULL_DONE_TITLE, PULL_DONE_MESSAGE),
            SyncOutcome::Failed { message, .. } => {
                prompt.show_error(PULL_ERROR_TITLE, &format!("Pull failed:\n{}", message))
            }
            SyncOutcome::Cancelled { .. } => {}
        }
    }
}

/// Pulls repositories one after another
pub struct SyncExecutor {
    vcs: Arc<dyn VcsClient>,
}

impl SyncExecutor {
    pub fn new(vcs: Arc<dyn VcsClient>) -> Self {
        Self { vcs }
    }

    pub fn sync_all(
        &self,
        repositories: &mut [Repository],
        cancel: &CancellationFlag,
        progress: &dyn ProgressReporter,
    ) -> SyncOutcome {
        let mut synced = Vec::new();

        for repository in repositories.iter_mut() {
            if cancel.is_cancelled() {
                tracing::info!("Pull cancelled after {} repository(ies)", synced.len());
                return SyncOutcome::Cancelled { synced };
            }

            progress.set_text(&format!("Pulling: {}", repository.name()));

            let message = match self.vcs.run_pull(repository) {
                Ok(result) if result.success => None,
                Ok(result) => {
                    tracing::warn!("Pull failed for {}: {}", repository, result.error_output);
                    Some(result.error_output)
                }
                Err(e) => {
                    tracing::error!("Pull failed for {}: {}", repository, e);
                    Some(e.to_string())
                }
            };

            if let Some(message) = message {
                return SyncOutcome::Failed {
                    synced,
                    repository: repository.root().to_path_buf(),
                    message,
                };
            }

            if let Err(e) = self.vcs.refresh_metadata(repository) {
                tracing::warn!("Failed to refresh metadata for {}: {}", repository, e);
            }
            synced.push(repository.root().to_path_buf());
        }

        SyncOutcome::Completed { synced }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::progress::TracingProgress;
    use crate::gate::testing::{Call, ScriptedPrompt, ScriptedVcs};
    use crate::gate::PromptResponse;

    #[test]
    fn test_all_pulled_in_order() {
        let vcs = Arc::new(ScriptedVcs::new());
        let mut repos = vec![vcs.repository("a", None), vcs.repository("b", None)];

        let outcome = SyncExecutor::new(vcs.clone()).sync_all(
            &mut repos,
            &CancellationFlag::new(),
            &TracingProgress,
        );

        assert!(outcome.is_success());
        assert_eq!(outcome.synced().len(), 2);
        assert_eq!(
            vcs.calls(),
            vec![
                Call::Pull("a".into()),
                Call::Refresh("a".into()),
                Call::Pull("b".into()),
                Call::Refresh("b".into()),
            ]
        );
    }

    #[test]
    fn test_stops_at_first_failure() {
        let vcs = Arc::new(ScriptedVcs::new());
        let mut repos = vec![
            vcs.repository("a", None),
            vcs.repository("b", None),
            vcs.repository("c", None),
        ];
        vcs.fail_pull("b", "CONFLICT (content): Merge conflict in lib.rs");

        let outcome = SyncExecutor::new(vcs.clone()).sync_all(
            &mut repos,
            &CancellationFlag::new(),
            &TracingProgress,
        );

        match &outcome {
            SyncOutcome::Failed { synced, repository, message } => {
                assert_eq!(synced, &vec![PathBuf::from("a")]);
                assert_eq!(repository, &PathBuf::from("b"));
                assert!(message.contains("Merge conflict"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
        assert!(!vcs.calls().contains(&Call::Pull("c".into())));
    }

    #[test]
    fn test_fault_message_is_reported() {
        let vcs = Arc::new(ScriptedVcs::new());
        let mut repos = vec![vcs.repository("a", None)];
        vcs.fault_pull("a");

        let outcome = SyncExecutor::new(vcs).sync_all(
            &mut repos,
            &CancellationFlag::new(),
            &TracingProgress,
        );
        assert!(matches!(outcome, SyncOutcome::Failed { ref message, .. } if message.contains("scripted fault")));
    }

    #[test]
    fn test_cancelled_before_start() {
        let vcs = Arc::new(ScriptedVcs::new());
        let mut repos = vec![vcs.repository("a", None)];
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let outcome = SyncExecutor::new(vcs.clone()).sync_all(&mut repos, &cancel, &TracingProgress);
        assert_eq!(outcome, SyncOutcome::Cancelled { synced: vec![] });
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn test_cancelled_between_repositories() {
        let vcs = Arc::new(ScriptedVcs::new());
        let mut repos = vec![vcs.repository("a", None), vcs.repository("b", None)];
        let cancel = CancellationFlag::new();
        vcs.cancel_on_pull("a", cancel.clone());

        let outcome = SyncExecutor::new(vcs.clone()).sync_all(&mut repos, &cancel, &TracingProgress);

        assert_eq!(
            outcome,
            SyncOutcome::Cancelled {
                synced: vec![PathBuf::from("a")]
            }
        );
        assert!(!vcs.calls().contains(&Call::Pull("b".into())));
    }

    #[test]
    fn test_notifications() {
        let prompt = ScriptedPrompt::answering(PromptResponse::Yes);
        SyncOutcome::Failed {
            synced: vec![],
            repository: PathBuf::from("b"),
            message: "boom".into(),
        }
        .notify(&prompt);
        SyncOutcome::Completed { synced: vec![] }.notify(&prompt);
        SyncOutcome::Cancelled { synced: vec![] }.notify(&prompt);

        assert_eq!(prompt.errors(), vec![(PULL_ERROR_TITLE.to_string(), "Pull failed:\nboom".to_string())]);
        assert_eq!(prompt.infos().len(), 1);
    }
}
