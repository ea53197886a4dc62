//! pullgate - pull before you commit
//!
//! A pre-commit gate that checks whether the branches of a commit's
//! repositories are behind their tracked remote branches, and if so lets
//! the operator pull first to avoid needless merge conflicts.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        PreCommitGate                            │
//! │        (sequences the phases, yields Proceed / Abort)           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌───────────────┐  │
//! │  │ RemoteState      │  │ Divergence       │  │ SyncDecision  │  │
//! │  │ Fetcher          │─▶│ Calculator       │─▶│ Prompt        │  │
//! │  └────────┬─────────┘  └────────┬─────────┘  └───────┬───────┘  │
//! │           │                     │                    ▼          │
//! │           │                     │            ┌───────────────┐  │
//! │           │                     │            │ SyncExecutor  │  │
//! │           │                     │            └───────┬───────┘  │
//! │           ▼                     ▼                    ▼          │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │                  VcsClient (git CLI + libgit2)              ││
//! │  │        fetch --all · rev-list --count · pull · refresh      ││
//! │  └─────────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gate is advisory. Fetch and divergence failures count as "not
//! behind"; only a failed pull or an operator's cancel stops a commit.

pub mod config;
pub mod error;
pub mod gate;
pub mod git;
pub mod hook;

pub use config::GateConfig;
pub use error::{Error, Result};
pub use gate::{GateOutcome, GateReport, GateVerdict, PreCommitGate};
pub use git::{discover_participating, discover_repositories, GitCli, Repository, VcsClient};
