//! Remote state fetching

use std::sync::Arc;

use crate::git::{Repository, VcsClient};

/// Updates all remotes of a repository and refreshes its metadata
pub struct RemoteStateFetcher {
    vcs: Arc<dyn VcsClient>,
}

impl RemoteStateFetcher {
    pub fn new(vcs: Arc<dyn VcsClient>) -> Self {
        Self { vcs }
    }

    /// Fetch all remotes; returns false on any failure
    ///
    /// Failures are logged and never propagated. A repository whose fetch
    /// failed counts as not behind.
    pub fn fetch(&self, repository: &mut Repository) -> bool {
        match self.vcs.run_fetch_all(repository) {
            Ok(result) if result.success => {}
            Ok(result) => {
                tracing::warn!("Fetch failed for {}: {}", repository, result.error_output);
                return false;
            }
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", repository, e);
                return false;
            }
        }

        if let Err(e) = self.vcs.refresh_metadata(repository) {
            tracing::warn!("Failed to refresh metadata for {}: {}", repository, e);
        }

        true
    }
}
