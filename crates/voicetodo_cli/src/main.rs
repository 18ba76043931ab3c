//! Command-line front end for the voicetodo task list.
//!
//! # Responsibility
//! - Map subcommands onto `TaskService` operations over the configured store.
//! - Keep output line-oriented and deterministic for scripting.
//!
//! # Invariants
//! - Every mutating command loads the full collection first and writes it
//!   back through the repository before exiting.
//! - A write that the store rejected is reported as a failure.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::io::Write;
use std::path::PathBuf;
use voicetodo_core::{
    init_logging_from, open_repository, CoreConfig, StorageBackend, Task, TaskId,
    TaskRepository, TaskService,
};

const DEFAULT_DATA_DIR_NAME: &str = ".voicetodo";

/// Task list with voice transcripts.
#[derive(Parser, Debug)]
#[command(name = "voicetodo", version, about = "Task list with voice transcripts")]
struct Cli {
    /// JSON config file; built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage location (directory for `file`, directory or DB file for `sqlite`).
    #[arg(long, global = true, env = "VOICETODO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Storage backend (overrides the config file).
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Memory,
    File,
    Sqlite,
}

impl From<BackendArg> for StorageBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Memory => Self::Memory,
            BackendArg::File => Self::File,
            BackendArg::Sqlite => Self::Sqlite,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every task in insertion order.
    List,
    /// Create a task.
    Add { title: String },
    /// Print one task as JSON.
    Show { id: String },
    /// Flip the completion flag.
    Toggle { id: String },
    /// Replace a task title.
    Rename { id: String, title: String },
    /// Delete a task.
    Delete { id: String },
    /// Manage the voice transcript of a task.
    Transcript {
        #[command(subcommand)]
        action: TranscriptAction,
    },
    /// Remove the whole stored collection.
    Clear,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Add { .. } => "add",
            Self::Show { .. } => "show",
            Self::Toggle { .. } => "toggle",
            Self::Rename { .. } => "rename",
            Self::Delete { .. } => "delete",
            Self::Transcript {
                action: TranscriptAction::Attach { .. },
            } => "transcript_attach",
            Self::Transcript {
                action: TranscriptAction::Detach { .. },
            } => "transcript_detach",
            Self::Clear => "clear",
        }
    }
}

#[derive(Subcommand, Debug)]
enum TranscriptAction {
    /// Attach recognized text, replacing any previous transcript.
    Attach { id: String, text: String },
    /// Remove the transcript.
    Detach { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = resolve_config(&cli)?;
    if let Err(err) = init_logging_from(&config.logging) {
        eprintln!("voicetodo: logging disabled: {err}");
    }

    let repo = open_repository(&config.storage).context("failed to open task store")?;
    let mut service = TaskService::with_policy(repo, config.persistence);
    service.load();

    let command = cli.command.name();
    match cli.command {
        Command::List => {
            for task in service.get_all() {
                writeln!(out, "{}", summary_line(&task))?;
            }
        }
        Command::Add { title } => {
            let task = service.create(title.as_str())?;
            ensure_saved(&service)?;
            writeln!(out, "{}", summary_line(&task))?;
        }
        Command::Show { id } => {
            let id = TaskId::from(id);
            let task = service
                .get_by_id(&id)
                .ok_or_else(|| anyhow!("Task not found: {id}"))?;
            writeln!(out, "{:#}", task.to_record())?;
        }
        Command::Toggle { id } => {
            let task = service.toggle_completed(&TaskId::from(id))?;
            ensure_saved(&service)?;
            writeln!(out, "{}", summary_line(&task))?;
        }
        Command::Rename { id, title } => {
            let task = service.rename(&TaskId::from(id), title.as_str())?;
            ensure_saved(&service)?;
            writeln!(out, "{}", summary_line(&task))?;
        }
        Command::Delete { id } => {
            let id = TaskId::from(id);
            service.delete(&id)?;
            ensure_saved(&service)?;
            writeln!(out, "deleted id={id}")?;
        }
        Command::Transcript { action } => {
            let task = match action {
                TranscriptAction::Attach { id, text } => {
                    service.attach_transcript(&TaskId::from(id), text)?
                }
                TranscriptAction::Detach { id } => service.detach_transcript(&TaskId::from(id))?,
            };
            ensure_saved(&service)?;
            writeln!(out, "{}", summary_line(&task))?;
        }
        Command::Clear => {
            if !service.clear_storage() {
                bail!("failed to clear task store");
            }
            writeln!(out, "cleared")?;
        }
    }
    info!(
        "event=cli_command module=cli status=ok command={command} backend={:?}",
        config.storage.backend
    );
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.storage.backend = backend.into();
    }
    if let Some(dir) = &cli.data_dir {
        config.storage.path = Some(dir.clone());
    }
    if config.storage.backend != StorageBackend::Memory && config.storage.path.is_none() {
        config.storage.path = Some(default_data_dir());
    }
    config.validate()?;
    Ok(config)
}

fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(DEFAULT_DATA_DIR_NAME)
}

fn ensure_saved<R: TaskRepository>(service: &TaskService<R>) -> Result<()> {
    if !service.last_save_succeeded() {
        bail!("change applied but the task store rejected the write");
    }
    Ok(())
}

fn summary_line(task: &Task) -> String {
    format!(
        "id={} completed={} transcript={} title={}",
        task.id(),
        task.is_completed(),
        task.transcript().is_some(),
        task.title()
    )
}
