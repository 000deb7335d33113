#![forbid(unsafe_code)]

mod cli;
mod commands;
mod config;
mod logging;
mod prompt;

use clap::Parser;
use cli::{Cli, Command};
use commands::{CommandError, Context, prompt_for};
use config::{ConfigError, RetagConfig};
use rt_storage::{FsVault, StoreError};
use rt_workflow::{EventBus, JsonLinesEventBus, TagEvent};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl CliError {
    fn exit_status(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Store(_) => 2,
            Self::Command(err) => err.exit_status(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "retag failed");
            eprintln!("retag: {err}");
            ExitCode::from(err.exit_status())
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let root = cli.vault.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = RetagConfig::load(cli.config.as_deref(), &root)?;
    logging::init(cli.log.as_deref().or(config.log_filter.as_deref()));

    let vault = FsVault::open(&root, config.vault.clone())?;
    tracing::debug!(root = %vault.root().display(), "vault opened");
    let context = Context {
        vault,
        config,
        json: cli.json,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let finalized = match cli.command {
        Command::Tags => context.tags(&mut out).map(|()| true)?,
        Command::Scan { tag } => context.scan(&tag, &mut out).map(|()| true)?,
        Command::Rename { old, new, yes } => {
            let mut prompt = prompt_for(yes);
            let mut events = event_bus(cli.json);
            context.rename(&old, &new, prompt.as_mut(), events.as_mut(), &mut out)?
        }
        Command::Delete { tag, yes } => {
            let mut prompt = prompt_for(yes);
            let mut events = event_bus(cli.json);
            context.delete(&tag, prompt.as_mut(), events.as_mut(), &mut out)?
        }
        Command::Meta(command) => context.meta(command, &mut out).map(|()| true)?,
        Command::Shortcut(command) => context.shortcut(command, &mut out).map(|()| true)?,
    };
    out.flush().map_err(CommandError::from)?;
    // A batch that left notes behind exits non-zero.
    Ok(if finalized {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// Events go to stdout as JSON lines in `--json` mode and are dropped
/// otherwise.
fn event_bus(json: bool) -> Box<dyn EventBus> {
    if json {
        Box::new(JsonLinesEventBus::new(std::io::stdout()))
    } else {
        Box::new(Vec::<TagEvent>::new())
    }
}
