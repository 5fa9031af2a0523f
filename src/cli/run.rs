//! CLI entry point and dispatch
//!
//! `run()` parses arguments, discovers configuration, builds the tokio
//! runtime, dispatches to a command and owns all error output.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;
use crate::error::render_for_user;
use crate::{CliArgs, CloneError, Config, ExitCode, ProgressStore};

/// Main CLI execution function.
///
/// Returns `Ok(())` after printing any output. On error the report is
/// printed to stderr and the matching [`ExitCode`] is returned; `main` only
/// calls `std::process::exit`.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = cli_args_from(&cli);
    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = CloneError::from(err);
            eprintln!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    if let Err(e) = crate::logging::init_tracing(config.verbose()) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let operation = cli.command.name();
    let store = ProgressStore::filesystem(&config.state_dir());
    tracing::debug!(state_dir = %config.state_dir(), operation, "Dispatching command");

    let result = rt.block_on(async {
        match cli.command {
            Commands::Status { slug, json } => {
                commands::execute_status_command(&store, &slug, json).await
            }
            Commands::List { archived, json } => {
                commands::execute_list_command(&store, archived, json).await
            }
            Commands::Classify {
                message,
                phase,
                url,
                json,
            } => commands::execute_classify_command(
                &message,
                phase.as_deref(),
                url.as_deref(),
                json,
            ),
            Commands::Archive { slug } => commands::execute_archive_command(&store, &slug).await,
            Commands::Ack { slug, resolution } => {
                commands::execute_ack_command(&store, &slug, resolution.as_deref()).await
            }
        }
    });

    result.map_err(|err| {
        let (report, code) = report_error(&err);
        eprintln!("{operation} failed\n\n{report}");
        code
    })
}

/// Overrides carried from flags into configuration discovery.
pub(crate) fn cli_args_from(cli: &Cli) -> CliArgs {
    CliArgs {
        config_path: cli.config.clone(),
        state_dir: cli.state_dir.clone(),
        // An absent flag must not override `verbose = true` from a file.
        verbose: cli.verbose.then_some(true),
        ..CliArgs::default()
    }
}

/// Render an error for the terminal and pick its exit code.
///
/// Library errors keep their own report and exit code; anything else is an
/// internal failure reported with its full context chain.
pub(crate) fn report_error(err: &anyhow::Error) -> (String, ExitCode) {
    match err.downcast_ref::<CloneError>() {
        Some(clone_err) => (render_for_user(clone_err), clone_err.to_exit_code()),
        None => (format!("Error: {err:#}\n"), ExitCode::INTERNAL),
    }
}
