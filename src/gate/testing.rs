//! Scripted collaborators for gate tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::cancel::CancellationFlag;
use super::prompt::{PromptRequest, PromptResponse, UserPrompt};
use crate::error::{Error, Result};
use crate::git::{CommandOutput, LocalBranch, Repository, VcsClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(String),
    RevList(String, String),
    Pull(String),
    Refresh(String),
}

#[derive(Debug, Clone)]
enum Script {
    Fail(String),
    Fault,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    fetch: HashMap<String, Script>,
    pull: HashMap<String, Script>,
    rev_list: HashMap<String, std::result::Result<String, ()>>,
    refreshed: HashMap<String, Option<LocalBranch>>,
    cancel_on_fetch: HashMap<String, CancellationFlag>,
    cancel_on_pull: HashMap<String, CancellationFlag>,
}

/// A [`VcsClient`] whose results are set up per repository name
///
/// Repositories are rooted at a relative path equal to their name.
/// Unscripted commands succeed; unscripted rev-list counts are `0`.
#[derive(Default)]
pub struct ScriptedVcs {
    state: Mutex<State>,
}

impl ScriptedVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(&self, name: &str, head: Option<LocalBranch>) -> Repository {
        Repository::new(name, head)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fail_fetch(&self, name: &str, stderr: &str) {
        self.state.lock().unwrap().fetch.insert(name.into(), Script::Fail(stderr.into()));
    }

    pub fn fault_fetch(&self, name: &str) {
        self.state.lock().unwrap().fetch.insert(name.into(), Script::Fault);
    }

    pub fn fail_pull(&self, name: &str, stderr: &str) {
        self.state.lock().unwrap().pull.insert(name.into(), Script::Fail(stderr.into()));
    }

    pub fn fault_pull(&self, name: &str) {
        self.state.lock().unwrap().pull.insert(name.into(), Script::Fault);
    }

    pub fn set_behind(&self, name: &str, output: &str) {
        self.state.lock().unwrap().rev_list.insert(name.into(), Ok(output.into()));
    }

    pub fn fail_rev_list(&self, name: &str) {
        self.state.lock().unwrap().rev_list.insert(name.into(), Err(()));
    }

    pub fn set_refreshed_head(&self, name: &str, head: Option<LocalBranch>) {
        self.state.lock().unwrap().refreshed.insert(name.into(), head);
    }

    /// Raise `flag` while `name` is being fetched
    pub fn cancel_on_fetch(&self, name: &str, flag: CancellationFlag) {
        self.state.lock().unwrap().cancel_on_fetch.insert(name.into(), flag);
    }

    /// Raise `flag` while `name` is being pulled; the pull still succeeds
    pub fn cancel_on_pull(&self, name: &str, flag: CancellationFlag) {
        self.state.lock().unwrap().cancel_on_pull.insert(name.into(), flag);
    }

    fn key(repository: &Repository) -> String {
        repository.root().to_string_lossy().into_owned()
    }

    fn scripted(script: Option<Script>, root: &Path) -> Result<CommandOutput> {
        match script {
            None => Ok(CommandOutput::ok("")),
            Some(Script::Fail(stderr)) => Ok(CommandOutput::failed(stderr)),
            Some(Script::Fault) => Err(Error::CommandSpawn {
                command: "scripted".into(),
                root: PathBuf::from(root),
                source: std::io::Error::new(std::io::ErrorKind::Other, "scripted fault"),
            }),
        }
    }
}

impl VcsClient for ScriptedVcs {
    fn run_fetch_all(&self, repository: &Repository) -> Result<CommandOutput> {
        let key = Self::key(repository);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Fetch(key.clone()));
        if let Some(flag) = state.cancel_on_fetch.get(&key) {
            flag.cancel();
        }
        Self::scripted(state.fetch.get(&key).cloned(), repository.root())
    }

    fn run_rev_list_count(&self, repository: &Repository, range: &str) -> Result<CommandOutput> {
        let key = Self::key(repository);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::RevList(key.clone(), range.into()));
        match state.rev_list.get(&key) {
            Some(Ok(output)) => Ok(CommandOutput::ok(output.clone())),
            Some(Err(())) => Ok(CommandOutput::failed("fatal: bad revision")),
            None => Ok(CommandOutput::ok("0")),
        }
    }

    fn run_pull(&self, repository: &Repository) -> Result<CommandOutput> {
        let key = Self::key(repository);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Pull(key.clone()));
        if let Some(flag) = state.cancel_on_pull.get(&key) {
            flag.cancel();
        }
        Self::scripted(state.pull.get(&key).cloned(), repository.root())
    }

    fn refresh_metadata(&self, repository: &mut Repository) -> Result<()> {
        let key = Self::key(repository);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Refresh(key.clone()));
        if let Some(head) = state.refreshed.get(&key) {
            repository.set_head(head.clone());
        }
        Ok(())
    }
}

/// A [`UserPrompt`] that gives one fixed answer and records everything
pub struct ScriptedPrompt {
    response: PromptResponse,
    asked: Mutex<Vec<PromptRequest>>,
    errors: Mutex<Vec<(String, String)>>,
    infos: Mutex<Vec<(String, String)>>,
    cancel_on_ask: Option<CancellationFlag>,
}

impl ScriptedPrompt {
    pub fn answering(response: PromptResponse) -> Self {
        Self {
            response,
            asked: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            infos: Mutex::new(Vec::new()),
            cancel_on_ask: None,
        }
    }

    /// Raise `flag` while the question is open, then answer as usual
    pub fn cancelling(mut self, flag: CancellationFlag) -> Self {
        self.cancel_on_ask = Some(flag);
        self
    }

    pub fn asked(&self) -> Vec<PromptRequest> {
        self.asked.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<(String, String)> {
        self.infos.lock().unwrap().clone()
    }
}

impl UserPrompt for ScriptedPrompt {
    fn ask(&self, request: &PromptRequest) -> PromptResponse {
        self.asked.lock().unwrap().push(request.clone());
        if let Some(flag) = &self.cancel_on_ask {
            flag.cancel();
        }
        self.response
    }

    fn show_error(&self, title: &str, message: &str) {
        self.errors.lock().unwrap().push((title.into(), message.into()));
    }

    fn show_info(&self, title: &str, message: &str) {
        self.infos.lock().unwrap().push((title.into(), message.into()));
    }
}
