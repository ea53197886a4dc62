//! Divergence between a local branch and its tracked remote branch

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::git::{Repository, VcsClient};

/// A local branch and the remote branch it tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchPair {
    pub local: String,
    pub remote: String,
}

impl fmt::Display for BranchPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.local, self.remote)
    }
}

/// How far one repository is behind its tracked remote
///
/// `behind_count` is 0 whenever `branch_pair` is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DivergenceResult {
    pub behind_count: u32,
    pub branch_pair: Option<BranchPair>,
}

impl DivergenceResult {
    pub fn not_behind() -> Self {
        Self::default()
    }
}

/// Totals accumulated over the repositories of one gate run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateState {
    pub total_behind: u64,
    pub any_behind: bool,
    /// Branch pair of the last behind repository in iteration order
    pub representative_branch_pair: Option<BranchPair>,
}

impl AggregateState {
    pub fn record(&mut self, result: &DivergenceResult) {
        if result.behind_count == 0 {
            return;
        }
        self.any_behind = true;
        self.total_behind += u64::from(result.behind_count);
        if let Some(pair) = &result.branch_pair {
            self.representative_branch_pair = Some(pair.clone());
        }
    }
}

/// Counts commits on the tracked remote branch missing locally
pub struct DivergenceCalculator {
    vcs: Arc<dyn VcsClient>,
}

impl DivergenceCalculator {
    pub fn new(vcs: Arc<dyn VcsClient>) -> Self {
        Self { vcs }
    }

    /// Number of commits the current branch is behind its tracked branch
    pub fn behind_count(&self, repository: &Repository) -> u32 {
        self.divergence(repository).behind_count
    }

    /// Behind count together with the branch pair it was computed for
    ///
    /// No branch, no tracked branch, a failed query and unparsable output
    /// all yield zero.
    pub fn divergence(&self, repository: &Repository) -> DivergenceResult {
        let Some(local) = repository.current_branch() else {
            return DivergenceResult::not_behind();
        };
        let Some(remote) = local.tracked_branch() else {
            return DivergenceResult::not_behind();
        };

        let range = format!("{}..{}", local.name, remote.name);
        let behind_count = match self.vcs.run_rev_list_count(repository, &range) {
            Ok(result) if result.success => match parse_count(&result.output) {
                Some(count) => count,
                None => {
                    tracing::warn!(
                        "Unexpected rev-list output for {} in {}: {:?}",
                        range,
                        repository,
                        result.output
                    );
                    0
                }
            },
            Ok(result) => {
                tracing::warn!(
                    "Failed to check behind count for {}: {}",
                    repository,
                    result.error_output
                );
                0
            }
            Err(e) => {
                tracing::warn!("Failed to check behind count for {}: {}", repository, e);
                0
            }
        };

        if behind_count == 0 {
            return DivergenceResult::not_behind();
        }

        DivergenceResult {
            behind_count,
            branch_pair: Some(BranchPair {
                local: local.name.clone(),
                remote: remote.name.clone(),
            }),
        }
    }
}

fn parse_count(output: &str) -> Option<u32> {
    output.trim().parse().ok()
}
