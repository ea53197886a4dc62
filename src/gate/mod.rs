//! The pre-commit gate
//!
//! Before a commit is finalized the gate checks whether any tracked remote
//! branch has commits the local branch lacks, and if so asks the operator
//! whether to pull first.
//!
//! # Flow
//!
//! ```text
//! Idle ──(no repositories)──────────────────────────────▶ Proceed
//!  │
//!  ▼
//! Fetching ──(cancelled)────────────────────────────────▶ Abort
//!  │   fetch + divergence per repository, in order
//!  ├──(nothing behind)──▶ NoRemoteCommits ──────────────▶ Proceed
//!  ▼
//! RemoteCommitsFound ──▶ Prompting
//!                          ├──(commit anyway)───────────▶ Proceed
//!                          ├──(cancel / dismissed)──────▶ Abort
//!                          ├──(pull deferred)───────────▶ Abort
//!                          ▼
//!                        Syncing ──(all pulled)─────────▶ Proceed
//!                                 └─(failed / cancelled)▶ Abort
//! ```
//!
//! # Threading
//!
//! The fetch and sync phases run on a blocking worker; the caller awaits
//! the worker and only then reads its result. Each phase hands back one
//! value, so nothing is shared while the worker runs except the
//! cancellation flag. Repositories are processed one at a time.
//!
//! Remote commands have no timeout. A hung fetch or pull holds the gate.
//!
//! # Running inside git's pre-commit hook
//!
//! `git commit` holds the index lock while its hooks run, so a pull from
//! inside the hook cannot update the index or HEAD. Hosts in that position
//! use [`PreCommitGate::with_deferred_sync`]: choosing to pull then stops
//! the commit and asks the operator to pull and commit again.

use serde::Serialize;
use std::sync::Arc;

mod cancel;
mod divergence;
mod fetch;
mod progress;
mod prompt;
mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::CancellationFlag;
pub use divergence::{AggregateState, BranchPair, DivergenceCalculator, DivergenceResult};
pub use fetch::RemoteStateFetcher;
pub use progress::{ProgressReporter, TracingProgress};
pub use prompt::{
    build_request, FixedPrompt, PromptRequest, PromptResponse, SyncDecision, SyncDecisionPrompt,
    TerminalPrompt, UserPrompt, PROMPT_TITLE,
};
pub use sync::{SyncExecutor, SyncOutcome, PULL_DEFERRED_MESSAGE};

use crate::config::GateConfig;
use crate::git::{Repository, VcsClient};

/// Whether the pending commit may continue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GateVerdict {
    Proceed,
    Abort,
}

impl GateVerdict {
    pub fn is_proceed(self) -> bool {
        self == GateVerdict::Proceed
    }
}

/// Why the gate reached its verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Gate switched off by config or environment
    Disabled,
    NoRepositories,
    NoRemoteCommits,
    CancelledDuringFetch,
    CommitAnyway,
    /// Operator cancelled or dismissed the prompt
    Declined,
    /// Cancellation was requested while the prompt was open
    CancelledAtPrompt,
    /// Operator chose to pull but the host cannot pull mid-commit
    SyncDeferred,
    Synced(SyncOutcome),
    SyncCancelled(SyncOutcome),
    SyncFailed(SyncOutcome),
    /// A worker phase panicked
    WorkerFailed,
}

impl GateOutcome {
    pub fn verdict(&self) -> GateVerdict {
        match self {
            GateOutcome::Disabled
            | GateOutcome::NoRepositories
            | GateOutcome::NoRemoteCommits
            | GateOutcome::CommitAnyway
            | GateOutcome::Synced(_) => GateVerdict::Proceed,
            GateOutcome::CancelledDuringFetch
            | GateOutcome::Declined
            | GateOutcome::CancelledAtPrompt
            | GateOutcome::SyncDeferred
            | GateOutcome::SyncCancelled(_)
            | GateOutcome::SyncFailed(_)
            | GateOutcome::WorkerFailed => GateVerdict::Abort,
        }
    }
}

/// Full result of one gate run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    pub outcome: GateOutcome,
    pub aggregate: AggregateState,
}

impl GateReport {
    fn new(outcome: GateOutcome, aggregate: AggregateState) -> Self {
        Self { outcome, aggregate }
    }

    pub fn verdict(&self) -> GateVerdict {
        self.outcome.verdict()
    }
}

/// Result of the fetch phase
enum FetchPhase {
    Completed {
        repositories: Vec<Repository>,
        aggregate: AggregateState,
    },
    Cancelled,
}

/// Sequences fetch, divergence, prompt and sync for one commit attempt
pub struct PreCommitGate {
    vcs: Arc<dyn VcsClient>,
    prompt: Arc<dyn UserPrompt>,
    progress: Arc<dyn ProgressReporter>,
    cancel: CancellationFlag,
    enabled: bool,
    defer_sync: bool,
}

impl PreCommitGate {
    pub fn new(vcs: Arc<dyn VcsClient>, prompt: Arc<dyn UserPrompt>) -> Self {
        Self {
            vcs,
            prompt,
            progress: Arc::new(TracingProgress),
            cancel: CancellationFlag::new(),
            enabled: true,
            defer_sync: false,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_config(mut self, config: &GateConfig) -> Self {
        self.enabled = config.enabled;
        self
    }

    /// Stop the commit instead of pulling when the operator chooses to pull
    pub fn with_deferred_sync(mut self, defer: bool) -> Self {
        self.defer_sync = defer;
        self
    }

    /// Flag that cancels this gate's fetch and sync phases
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Run the gate over the repositories of a commit, in the given order
    pub async fn run(&self, repositories: Vec<Repository>) -> GateVerdict {
        self.run_with_report(repositories).await.verdict()
    }

    pub async fn run_with_report(&self, repositories: Vec<Repository>) -> GateReport {
        let report = self.evaluate(repositories).await;
        tracing::info!(
            "Gate finished: {:?} ({:?}, {} commit(s) behind)",
            report.verdict(),
            report.outcome,
            report.aggregate.total_behind
        );
        report
    }

    async fn evaluate(&self, repositories: Vec<Repository>) -> GateReport {
        if !self.enabled {
            return GateReport::new(GateOutcome::Disabled, AggregateState::default());
        }
        if repositories.is_empty() {
            return GateReport::new(GateOutcome::NoRepositories, AggregateState::default());
        }

        let (repositories, aggregate) = match self.fetch_phase(repositories).await {
            Some(FetchPhase::Completed {
                repositories,
                aggregate,
            }) => (repositories, aggregate),
            Some(FetchPhase::Cancelled) => {
                return GateReport::new(GateOutcome::CancelledDuringFetch, AggregateState::default())
            }
            None => return GateReport::new(GateOutcome::WorkerFailed, AggregateState::default()),
        };

        if !aggregate.any_behind {
            return GateReport::new(GateOutcome::NoRemoteCommits, aggregate);
        }

        tracing::info!("Remote is ahead by {} commit(s)", aggregate.total_behind);

        if self.cancel.is_cancelled() {
            return GateReport::new(GateOutcome::CancelledAtPrompt, aggregate);
        }

        let decision = SyncDecisionPrompt::new(self.prompt.clone())
            .decide(aggregate.total_behind, aggregate.representative_branch_pair.as_ref());

        // A blocking prompt cannot be interrupted; honour a cancel raised
        // while it was open before acting on the answer.
        if self.cancel.is_cancelled() {
            tracing::info!("Gate cancelled at the prompt");
            return GateReport::new(GateOutcome::CancelledAtPrompt, aggregate);
        }

        let outcome = match decision {
            SyncDecision::CommitAnyway => GateOutcome::CommitAnyway,
            SyncDecision::Abort => GateOutcome::Declined,
            SyncDecision::SyncThenCommit if self.defer_sync => {
                self.prompt.show_info(PROMPT_TITLE, PULL_DEFERRED_MESSAGE);
                GateOutcome::SyncDeferred
            }
            SyncDecision::SyncThenCommit => match self.sync_phase(repositories).await {
                Some(outcome) => {
                    outcome.notify(self.prompt.as_ref());
                    match outcome {
                        SyncOutcome::Completed { .. } => GateOutcome::Synced(outcome),
                        SyncOutcome::Cancelled { .. } => GateOutcome::SyncCancelled(outcome),
                        SyncOutcome::Failed { .. } => GateOutcome::SyncFailed(outcome),
                    }
                }
                None => GateOutcome::WorkerFailed,
            },
        };

        GateReport::new(outcome, aggregate)
    }

    async fn fetch_phase(&self, repositories: Vec<Repository>) -> Option<FetchPhase> {
        let vcs = self.vcs.clone();
        let progress = self.progress.clone();
        let cancel = self.cancel.clone();

        let worker = tokio::task::spawn_blocking(move || {
            scan_repositories(vcs, repositories, &cancel, progress.as_ref())
        });

        match worker.await {
            Ok(phase) => Some(phase),
            Err(e) => {
                tracing::error!("Fetch worker failed: {}", e);
                None
            }
        }
    }

    async fn sync_phase(&self, mut repositories: Vec<Repository>) -> Option<SyncOutcome> {
        let executor = SyncExecutor::new(self.vcs.clone());
        let progress = self.progress.clone();
        let cancel = self.cancel.clone();

        let worker = tokio::task::spawn_blocking(move || {
            executor.sync_all(&mut repositories, &cancel, progress.as_ref())
        });

        match worker.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!("Pull worker failed: {}", e);
                None
            }
        }
    }
}

/// Fetch every repository and total up how far behind they are
fn scan_repositories(
    vcs: Arc<dyn VcsClient>,
    mut repositories: Vec<Repository>,
    cancel: &CancellationFlag,
    progress: &dyn ProgressReporter,
) -> FetchPhase {
    let fetcher = RemoteStateFetcher::new(vcs.clone());
    let calculator = DivergenceCalculator::new(vcs);
    let mut aggregate = AggregateState::default();

    progress.set_text("Fetching latest remote state...");

    for repository in repositories.iter_mut() {
        if cancel.is_cancelled() {
            tracing::info!("Gate cancelled while fetching");
            return FetchPhase::Cancelled;
        }

        progress.set_detail(&format!("Fetching: {}", repository.name()));
        if !fetcher.fetch(repository) {
            continue;
        }

        progress.set_detail(&format!("Checking branch divergence: {}", repository.name()));
        let result = calculator.divergence(repository);
        if result.behind_count > 0 {
            tracing::info!("{} is {} commit(s) behind", repository, result.behind_count);
        }
        aggregate.record(&result);
    }

    FetchPhase::Completed {
        repositories,
        aggregate,
    }
}
