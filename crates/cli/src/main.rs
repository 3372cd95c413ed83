//! `frontdown` — versioned, hardlink-capable file-tree backups.
//!
//! Two entry points: `backup <config>` runs the full pipeline from a
//! configuration file; `apply-actions <instance-dir>` executes a previously
//! persisted plan. Exit codes: 0 success, 1 error budget exceeded, 2 fatal,
//! 130 cancelled.

mod html;
mod open;
mod progress;
mod prompt;
mod signal;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use engine::config::LogLevel;
use engine::{BackupConfig, BackupError, BackupJob, ACTIONS_FILENAME, ACTIONS_HTML_FILENAME, LOG_FILENAME};
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: u8 = 0;
const EXIT_BUDGET_EXCEEDED: u8 = 1;
const EXIT_FATAL: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "frontdown", version, about = "Versioned, hardlink-capable file-tree backups")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full backup described by a configuration file.
    Backup {
        /// Path to the (commented-)JSON configuration file.
        config: PathBuf,
    },
    /// Execute a previously persisted action record.
    ApplyActions {
        /// Backup instance directory containing `actions.json`.
        instance_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Backup { config } => run_backup(&config),
        Command::ApplyActions { instance_dir } => run_apply(&instance_dir),
    };
    ExitCode::from(code)
}

fn run_backup(config_path: &Path) -> u8 {
    let config = match BackupConfig::load(config_path) {
        Ok(config) => config,
        Err(config_error) => {
            eprintln!("frontdown: {config_error}");
            return EXIT_FATAL;
        }
    };
    let log_level = config.log_level;
    let open_actionfile = config.open_actionfile;
    let save_actionhtml = config.save_actionhtml;
    let open_actionhtml = config.open_actionhtml;
    let excluded_html_actions = config.exclude_actionhtml_actions.clone();

    let mut job = match BackupJob::new(config) {
        Ok(job) => job,
        Err(backup_error) => {
            eprintln!("frontdown: {backup_error}");
            return EXIT_FATAL;
        }
    };
    init_logging(log_level, job.instance_dir());

    let cancel = signal::install();
    let mut handler = prompt::ConsolePrompts;
    let mut progress = progress::TerminalProgress::new();
    match job.run(&mut handler, &mut progress, &cancel) {
        Ok(report) => {
            if save_actionhtml {
                let html_path = report.instance_dir.join(ACTIONS_HTML_FILENAME);
                match html::write_action_html(&report.record, &excluded_html_actions, &html_path) {
                    Ok(()) => {
                        if open_actionhtml {
                            open::open_file(&html_path);
                        }
                    }
                    Err(io_error) => {
                        error!("could not write '{}': {io_error}", html_path.display());
                    }
                }
            }
            if open_actionfile {
                open::open_file(&report.instance_dir.join(ACTIONS_FILENAME));
            }
            if report.successful {
                EXIT_SUCCESS
            } else {
                EXIT_BUDGET_EXCEEDED
            }
        }
        Err(BackupError::Cancelled) => {
            error!("the backup was cancelled");
            EXIT_CANCELLED
        }
        Err(backup_error) => {
            error!("{backup_error}");
            EXIT_FATAL
        }
    }
}

fn run_apply(instance_dir: &Path) -> u8 {
    if !instance_dir.is_dir() {
        eprintln!(
            "frontdown: '{}' is not a backup instance directory",
            instance_dir.display()
        );
        return EXIT_FATAL;
    }
    init_logging(LogLevel::Info, instance_dir);

    let cancel = signal::install();
    let mut handler = prompt::ConsolePrompts;
    let mut progress = progress::TerminalProgress::new();
    match BackupJob::apply_recorded(instance_dir, &mut handler, &mut progress, &cancel) {
        Ok(report) if report.successful => EXIT_SUCCESS,
        Ok(_) => EXIT_BUDGET_EXCEEDED,
        Err(BackupError::Cancelled) => {
            error!("the backup was cancelled");
            EXIT_CANCELLED
        }
        Err(backup_error) => {
            error!("{backup_error}");
            EXIT_FATAL
        }
    }
}

/// Routes diagnostics to stderr and to `log.txt` inside the instance
/// directory. `RUST_LOG` overrides the configured level when set.
fn init_logging(level: LogLevel, instance_dir: &Path) {
    let directive = match level {
        LogLevel::Critical | LogLevel::Error => "error",
        LogLevel::Warning => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    match std::fs::File::create(instance_dir.join(LOG_FILENAME)) {
        Ok(log_file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Arc::new(log_file))
                .with_ansi(false)
                .with_target(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        Err(io_error) => {
            eprintln!("frontdown: could not create the log file: {io_error}");
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
        }
    }
}
