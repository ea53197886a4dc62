//! Operator decision prompt
//!
//! [`SyncDecisionPrompt`] only builds the question and interprets the
//! answer. Rendering belongs to a [`UserPrompt`] implementation.

use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use super::divergence::BranchPair;

pub const PROMPT_TITLE: &str = "Git Pull Reminder";
pub const PULL_THEN_COMMIT_LABEL: &str = "Pull then commit";
pub const COMMIT_ANYWAY_LABEL: &str = "Commit anyway";
pub const CANCEL_LABEL: &str = "Cancel";

/// What the operator wants to do about remote commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDecision {
    /// Pull every repository, then continue with the commit
    SyncThenCommit,
    /// Continue with the commit without pulling
    CommitAnyway,
    /// Stop the commit
    Abort,
}

/// A three-way question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub title: String,
    pub message: String,
    pub yes_label: String,
    pub no_label: String,
    pub cancel_label: String,
}

/// The operator's answer; closing the prompt is a dismissal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResponse {
    Yes,
    No,
    Dismissed,
}

/// Renders questions and notifications to the operator
pub trait UserPrompt: Send + Sync {
    fn ask(&self, request: &PromptRequest) -> PromptResponse;

    /// Blocking error notification
    fn show_error(&self, title: &str, message: &str);

    fn show_info(&self, title: &str, message: &str);
}

/// Asks the operator whether to pull before committing
pub struct SyncDecisionPrompt {
    prompt: Arc<dyn UserPrompt>,
}

impl SyncDecisionPrompt {
    pub fn new(prompt: Arc<dyn UserPrompt>) -> Self {
        Self { prompt }
    }

    pub fn decide(&self, total_behind: u64, branch_pair: Option<&BranchPair>) -> SyncDecision {
        let request = build_request(total_behind, branch_pair);
        match self.prompt.ask(&request) {
            PromptResponse::Yes => SyncDecision::SyncThenCommit,
            PromptResponse::No => SyncDecision::CommitAnyway,
            PromptResponse::Dismissed => SyncDecision::Abort,
        }
    }
}

/// Build the question shown when remote commits were found
pub fn build_request(total_behind: u64, branch_pair: Option<&BranchPair>) -> PromptRequest {
    let branch_info = branch_pair.map(ToString::to_string).unwrap_or_default();
    let message = format!(
        "The remote has {} new commit(s) that have not been pulled.\n\n\
         Branch: {}\n\n\
         Pulling first is recommended to avoid merge conflicts.\n\n\
         Pull now?",
        total_behind, branch_info
    );

    PromptRequest {
        title: PROMPT_TITLE.to_string(),
        message,
        yes_label: PULL_THEN_COMMIT_LABEL.to_string(),
        no_label: COMMIT_ANYWAY_LABEL.to_string(),
        cancel_label: CANCEL_LABEL.to_string(),
    }
}

// =============================================================================
// Terminal prompt
// =============================================================================

/// Line-based prompt over a reader/writer pair
///
/// Reads one answer. End of input or an answer that matches no option is a
/// dismissal.
pub struct TerminalPrompt<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl TerminalPrompt<io::BufReader<io::Stdin>, io::Stderr> {
    /// Prompt on stdin, writing to stderr
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stderr())
    }
}

impl<R, W> TerminalPrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Recover the writer, e.g. to inspect what was printed
    pub fn into_output(self) -> W {
        match self.output.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_block(&self, text: &str) {
        let mut out = match self.output.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{}", text).and_then(|_| out.flush()) {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }

    fn read_answer(&self) -> Option<String> {
        let mut input = match self.input.lock() {
            Ok(input) => input,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_lowercase()),
            Err(e) => {
                tracing::warn!("Failed to read answer: {}", e);
                None
            }
        }
    }
}

impl<R, W> UserPrompt for TerminalPrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn ask(&self, request: &PromptRequest) -> PromptResponse {
        self.write_block(&format!(
            "\n== {} ==\n{}\n\n  [p] {}\n  [c] {}\n  [a] {}\n\nChoice [p/c/a]:",
            request.title,
            request.message,
            request.yes_label,
            request.no_label,
            request.cancel_label
        ));

        match self.read_answer().as_deref() {
            Some("p") | Some("pull") | Some("y") | Some("yes") => PromptResponse::Yes,
            Some("c") | Some("commit") | Some("n") | Some("no") => PromptResponse::No,
            _ => PromptResponse::Dismissed,
        }
    }

    fn show_error(&self, title: &str, message: &str) {
        self.write_block(&format!("\n== {} ==\n{}", title, message));
    }

    fn show_info(&self, title: &str, message: &str) {
        self.write_block(&format!("\n{}: {}", title, message));
    }
}

// =============================================================================
// Non-interactive prompt
// =============================================================================

/// Answers every question with a fixed decision
///
/// Used when no terminal is attached. Notifications become log events.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt {
    decision: SyncDecision,
}

impl FixedPrompt {
    pub fn new(decision: SyncDecision) -> Self {
        Self { decision }
    }
}

impl UserPrompt for FixedPrompt {
    fn ask(&self, request: &PromptRequest) -> PromptResponse {
        tracing::warn!("{}", request.message.replace("\n\n", " "));
        tracing::info!("No terminal attached, answering {:?}", self.decision);
        match self.decision {
            SyncDecision::SyncThenCommit => PromptResponse::Yes,
            SyncDecision::CommitAnyway => PromptResponse::No,
            SyncDecision::Abort => PromptResponse::Dismissed,
        }
    }

    fn show_error(&self, title: &str, message: &str) {
        tracing::error!("{}: {}", title, message);
    }

    fn show_info(&self, title: &str, message: &str) {
        tracing::info!("{}: {}", title, message);
    }
}
