//! pullgate CLI - check the remote before committing

use clap::{Parser, Subcommand};
use pullgate::config::non_interactive_requested;
use pullgate::gate::{
    CancellationFlag, DivergenceCalculator, FixedPrompt, RemoteStateFetcher, SyncExecutor,
    SyncOutcome, TerminalPrompt, TracingProgress, UserPrompt, PULL_DEFERRED_MESSAGE,
};
use pullgate::{
    discover_participating, discover_repositories, GateConfig, GateOutcome, GitCli,
    PreCommitGate, Repository,
};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pullgate")]
#[command(about = "Check whether the remote is ahead before committing", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gate; exits non-zero when the commit should not proceed
    Check {
        /// Repositories taking part in the commit (defaults to current directory)
        paths: Vec<PathBuf>,

        /// Also check repositories nested below the given paths
        #[arg(short, long)]
        recursive: bool,

        /// Config file (defaults to .pullgate.yaml in the first repository)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Never prompt; use the configured non-interactive decision
        #[arg(long)]
        non_interactive: bool,

        /// Running inside git's pre-commit hook: never pull, stop the commit instead
        #[arg(long)]
        hook: bool,
    },

    /// Pull every repository, stopping at the first failure
    Sync {
        paths: Vec<PathBuf>,

        #[arg(short, long)]
        recursive: bool,
    },

    /// Show how far each repository is behind its tracked branch
    Status {
        paths: Vec<PathBuf>,

        #[arg(short, long)]
        recursive: bool,

        /// Use the remote state already known locally
        #[arg(long)]
        no_fetch: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Install the pre-commit hook
    InstallHook {
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Replace an existing hook not written by pullgate
        #[arg(short, long)]
        force: bool,
    },

    /// Remove the pre-commit hook written by pullgate
    UninstallHook {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check {
            paths,
            recursive,
            config,
            non_interactive,
            hook,
        } => {
            let mode = CheckMode {
                non_interactive: non_interactive || non_interactive_requested(),
                hook,
            };
            check(&paths, recursive, config.as_deref(), mode).await
        }
        Commands::Sync { paths, recursive } => sync(&paths, recursive).await,
        Commands::Status {
            paths,
            recursive,
            no_fetch,
            json,
        } => status(&paths, recursive, no_fetch, json).await,
        Commands::InstallHook { path, force } => install_hook(&path, force),
        Commands::UninstallHook { path } => uninstall_hook(&path),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn default_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    }
}

fn load_config(explicit: Option<&Path>, repositories: &[Repository]) -> anyhow::Result<GateConfig> {
    let config = match (explicit, repositories.first()) {
        (Some(path), _) => GateConfig::from_file(path)?,
        (None, Some(first)) => GateConfig::load(first.root())?,
        (None, None) => GateConfig::default(),
    };
    Ok(config.with_env_overrides())
}

struct CheckMode {
    non_interactive: bool,
    hook: bool,
}

async fn check(
    paths: &[PathBuf],
    recursive: bool,
    config: Option<&Path>,
    mode: CheckMode,
) -> anyhow::Result<ExitCode> {
    let repositories = discover_participating(&default_paths(paths), recursive)?;
    let config = load_config(config, &repositories)?;

    let interactive = !mode.non_interactive && std::io::stdin().is_terminal();
    let prompt: Arc<dyn UserPrompt> = if interactive {
        Arc::new(TerminalPrompt::stdio())
    } else {
        Arc::new(FixedPrompt::new(config.non_interactive))
    };

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling; the commit will be aborted");
            on_interrupt.cancel();
        }
    });

    let gate = PreCommitGate::new(Arc::new(GitCli::from_config(&config)), prompt)
        .with_config(&config)
        .with_cancellation(cancel)
        .with_deferred_sync(mode.hook);

    let report = gate.run_with_report(repositories).await;
    if report.verdict().is_proceed() {
        return Ok(ExitCode::SUCCESS);
    }

    if report.outcome == GateOutcome::SyncDeferred && !interactive {
        eprintln!("pullgate: {}", PULL_DEFERRED_MESSAGE);
    }
    eprintln!("pullgate: commit aborted");
    Ok(ExitCode::FAILURE)
}

async fn sync(paths: &[PathBuf], recursive: bool) -> anyhow::Result<ExitCode> {
    let mut repositories = discover_repositories(&default_paths(paths), recursive)?;
    let config = load_config(None, &repositories)?;
    let executor = SyncExecutor::new(Arc::new(GitCli::from_config(&config)));

    let outcome = tokio::task::spawn_blocking(move || {
        executor.sync_all(&mut repositories, &CancellationFlag::new(), &TracingProgress)
    })
    .await?;

    for root in outcome.synced() {
        println!("Pulled {}", root.display());
    }

    match outcome {
        SyncOutcome::Failed {
            repository,
            message,
            ..
        } => {
            eprintln!("Pull failed in {}:\n{}", repository.display(), message);
            Ok(ExitCode::FAILURE)
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}

#[derive(Serialize)]
struct StatusLine {
    path: PathBuf,
    branch: Option<String>,
    tracking: Option<String>,
    fetched: bool,
    behind: u32,
}

async fn status(
    paths: &[PathBuf],
    recursive: bool,
    no_fetch: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let repositories = discover_repositories(&default_paths(paths), recursive)?;
    let config = load_config(None, &repositories)?;
    let vcs: Arc<GitCli> = Arc::new(GitCli::from_config(&config));

    let lines = tokio::task::spawn_blocking(move || {
        let fetcher = RemoteStateFetcher::new(vcs.clone());
        let calculator = DivergenceCalculator::new(vcs);

        repositories
            .into_iter()
            .map(|mut repository| {
                let fetched = !no_fetch && fetcher.fetch(&mut repository);
                let behind = calculator.behind_count(&repository);
                let branch = repository.current_branch();
                StatusLine {
                    path: repository.root().to_path_buf(),
                    branch: branch.map(|b| b.name.clone()),
                    tracking: branch
                        .and_then(|b| b.tracked_branch())
                        .map(|r| r.name.clone()),
                    fetched,
                    behind,
                }
            })
            .collect::<Vec<_>>()
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(ExitCode::SUCCESS);
    }

    for line in &lines {
        let branch = match (&line.branch, &line.tracking) {
            (Some(local), Some(remote)) => format!("{} <- {}", local, remote),
            (Some(local), None) => format!("{} (no tracked branch)", local),
            (None, _) => "(no branch)".to_string(),
        };
        let note = if !no_fetch && !line.fetched { " [fetch failed]" } else { "" };
        println!("{}: {}, {} behind{}", line.path.display(), branch, line.behind, note);
    }

    Ok(ExitCode::SUCCESS)
}

fn install_hook(path: &Path, force: bool) -> anyhow::Result<ExitCode> {
    let repositories = discover_repositories(&[path.to_path_buf()], false)?;
    let program = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.to_str().map(str::to_string))
        .unwrap_or_else(|| "pullgate".to_string());

    for repository in &repositories {
        match pullgate::hook::install(repository.root(), &program, force) {
            Ok(hook) => println!("Installed {}", hook.display()),
            Err(e) => {
                if let Some(hint) = e.suggestion() {
                    eprintln!("{}\n  hint: {}", e, hint);
                    return Ok(ExitCode::FAILURE);
                }
                return Err(e.into());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn uninstall_hook(path: &Path) -> anyhow::Result<ExitCode> {
    let repositories = discover_repositories(&[path.to_path_buf()], false)?;

    for repository in &repositories {
        if pullgate::hook::uninstall(repository.root())? {
            println!("Removed pre-commit hook from {}", repository.root().display());
        } else {
            println!("No pullgate hook in {}", repository.root().display());
        }
    }

    Ok(ExitCode::SUCCESS)
}
