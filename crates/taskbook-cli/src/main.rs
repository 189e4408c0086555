mod commands;
mod config;
mod logging;
mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{handle_task_command, TaskCommand};
use config::{default_config_path, load_config, Overrides, Settings, DATA_DIR_ENV, LOG_LEVEL_ENV};
use std::io;
use std::path::PathBuf;
use taskbook_storage::StoreSession;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "taskbook", version, about = "Categorised task list kept as JSON on disk")]
struct Cli {
    /// Directory holding data.json and index.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Also append log output to taskbook.log in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    debug: bool,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<TaskCommand>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    let config_path = cli.config.clone().or_else(default_config_path);
    let config = load_config(config_path.as_deref())?;
    let settings = Settings::resolve(
        Overrides {
            data_dir: cli.data_dir,
            log_dir: cli.log_dir,
            debug: cli.debug,
            env_data_dir: std::env::var(DATA_DIR_ENV).ok(),
            env_log_level: std::env::var(LOG_LEVEL_ENV).ok(),
        },
        config,
        &cwd,
    );
    let _log_guard = logging::init_logging(&settings.log_level, settings.log_dir.as_deref());

    let mut session = StoreSession::open_dir(&settings.data_dir).with_context(|| {
        format!("Failed to open task store in {}", settings.data_dir.display())
    })?;
    info!(
        data_dir = %settings.data_dir.display(),
        records = session.len(),
        "store opened"
    );

    let outcome = match cli.command {
        None | Some(TaskCommand::Shell) => {
            let stdin = io::stdin();
            shell::Shell::new(stdin.lock(), io::stdout()).run(&mut session)
        }
        Some(command) => handle_task_command(&mut session, command, &mut io::stdout()),
    };

    session.close().context("Failed to save task store")?;
    outcome
}
