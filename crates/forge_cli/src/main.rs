//! `forge`: preview generated UI components from the command line.

use clap::Parser;
use forge_preview::{ForgeConfig, RunReport};
use std::io::{self, IsTerminal};
use tracing::warn;

mod cli;
mod commands;
mod logging;
mod openai;

use crate::cli::{Cli, Command, LogFormatArg};
use crate::commands::{CliError, run_catalog, run_generate, run_preview};
use crate::logging::{LogConfig, LogFormat, init_logging};

/// Mounted previews exit 0, failed ones 2, anything else 1.
const EXIT_FAILED_PREVIEW: i32 = 2;

/// The interpreter and the renderer recurse on the native stack; the
/// configured call depth needs more than the platform default.
const WORKER_STACK_SIZE: usize = 64 * 1024 * 1024;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let config = match ForgeConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };

    let worker = std::thread::Builder::new()
        .name("forge-worker".to_string())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || run_command(cli.command, &config));
    let exit_code = match worker {
        Ok(handle) => handle.join().unwrap_or(1),
        Err(error) => {
            eprintln!("error: failed to start worker thread: {error}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run_command(command: Command, config: &ForgeConfig) -> i32 {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("error: failed to start async runtime: {error}");
            return 1;
        }
    };
    match command {
        Command::Preview(args) => exit_code(run_preview(&args, config)),
        Command::Generate(args) => exit_code(runtime.block_on(run_generate(&args, config))),
        Command::Catalog => {
            run_catalog(config);
            0
        }
    }
}

fn exit_code(result: Result<RunReport, CliError>) -> i32 {
    match result {
        Ok(report) => match &report.failure {
            None => 0,
            Some(failure) => {
                eprintln!("preview failed: {failure}");
                EXIT_FAILED_PREVIEW
            }
        },
        Err(error) => {
            eprintln!("error: {}", error_message(&error));
            1
        }
    }
}

/// Generation failures show the short user-facing text; the details go to
/// the log.
fn error_message(error: &CliError) -> String {
    match error {
        CliError::Generation(source) => {
            warn!(error = %source, "component generation failed");
            source.user_message().to_string()
        }
        other => other.to_string(),
    }
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        with_ansi: cli.log_file.is_none() && io::stderr().is_terminal(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
        log_file: cli.log_file.clone(),
        ..LogConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_preview::GenerationError;

    #[test]
    fn test_generation_errors_show_the_user_message() {
        let error = CliError::Generation(GenerationError::Status {
            status: 500,
            body: "upstream exploded".to_string(),
        });
        let message = error_message(&error);
        assert_eq!(message, GenerationError::Transport(String::new()).user_message());
        assert!(!message.contains("upstream exploded"));
    }

    #[test]
    fn test_other_errors_keep_their_display_text() {
        let error = CliError::NoSuchElement("button".to_string());
        assert_eq!(error_message(&error), "cannot click <button>: no such element in the preview");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(Err(CliError::MissingApiKey("KEY".to_string()))), 1);
    }
}
