//! # regtoken
//!
//! Transfer-restriction engine for regulated tokens.
//!
//! ```bash
//! # Write ~/.regtoken/config.toml
//! regtoken init
//!
//! # Would this transfer go through?
//! regtoken check --token 0x..aa --from 0x..01 --to 0x..02 --amount 1000000000000000000
//!
//! # Explain a restriction code
//! regtoken message 5
//!
//! # Verify the audit journal
//! regtoken audit verify
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use clap::Parser;
use regtoken::cli::commands::exit_codes::{EXIT_ERROR, EXIT_RESTRICTED, EXIT_SUCCESS};
use regtoken::cli::commands::{
    resolve_loader, AuditVerifyCommand, CheckCommand, CodesCommand, InitCommand, MessageCommand,
};
use regtoken::cli::{AuditCommands, Cli, Commands};
use regtoken::logging::{init_logging, verbosity_to_level, LogConfig, LogError, LogGuard};
use regtoken_core::config::LoggingConfig;
use regtoken_core::config_loader::ConfigLoader;
use regtoken_core::error::ConfigError;

/// Set up logging from the config file, with `-v` taking precedence.
///
/// An unreadable config falls back to default settings here; the command
/// itself reports the config error.
fn setup_logging(loader: Option<&ConfigLoader>, verbose: u8) -> Result<LogGuard, LogError> {
    let settings = loader
        .and_then(|l| l.load().ok())
        .map(|config| config.logging)
        .unwrap_or_default();
    let settings = LogConfig::from_settings(&settings)
        .or_else(|_| LogConfig::from_settings(&LoggingConfig::default()))?;

    let config = match verbosity_to_level(verbose) {
        Some(level) => settings.with_level(level),
        None => settings,
    };
    init_logging(&config)
}

/// Main entry point for the `regtoken` application.
fn main() {
    let cli = Cli::parse();
    let loader = resolve_loader(cli.config.as_deref());

    let guard = match setup_logging(loader.as_ref().ok(), cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };

    let code = dispatch(cli.command, loader).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        EXIT_ERROR
    });

    // Flush the file writer; `exit` skips destructors.
    drop(guard);
    std::process::exit(code);
}

/// Run a command and map its result to an exit code.
///
/// # Exit Codes
///
/// - 0: success (for `check`, the transfer is allowed)
/// - 1: the transfer is restricted, or the audit chain is broken
/// - 2: any other error
fn dispatch(command: Commands, loader: Result<ConfigLoader, ConfigError>) -> Result<i32, String> {
    match command {
        Commands::Message { code } => {
            MessageCommand::new(code).run();
            Ok(EXIT_SUCCESS)
        }
        Commands::Codes => {
            CodesCommand::new().run();
            Ok(EXIT_SUCCESS)
        }
        Commands::Init { force } => InitCommand::new(force, loader.map_err(|e| e.to_string())?)
            .run()
            .map(|_| EXIT_SUCCESS)
            .map_err(|e| e.to_string()),
        Commands::Check(args) => CheckCommand::new(args, loader.map_err(|e| e.to_string())?)
            .run()
            .map(|outcome| outcome.exit_code())
            .map_err(|e| e.to_string()),
        Commands::Audit {
            command: AuditCommands::Verify { key_hex },
        } => AuditVerifyCommand::new(key_hex, loader.map_err(|e| e.to_string())?)
            .run()
            .map(|result| {
                if result.valid {
                    EXIT_SUCCESS
                } else {
                    EXIT_RESTRICTED
                }
            })
            .map_err(|e| e.to_string()),
    }
}
