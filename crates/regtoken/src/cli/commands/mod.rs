//! # CLI Command Handlers
//!
//! Each handler validates its arguments, loads configuration as needed and
//! returns a typed result. `main` maps results to exit codes from
//! [`exit_codes`].

pub mod audit;
pub mod check;
pub mod codes;
pub mod exit_codes;
pub mod init;
pub mod message;

use std::path::Path;

use regtoken_core::config_loader::ConfigLoader;
use regtoken_core::error::ConfigError;

pub use audit::{AuditVerifyCommand, AuditVerifyError};
pub use check::{CheckCommand, CheckError, CheckOutcome};
pub use codes::CodesCommand;
pub use init::{InitCommand, InitError};
pub use message::MessageCommand;

/// Loader for `--config`, or for `~/.regtoken/config.toml`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the path is not a `config.toml` or the home
/// directory is unknown.
pub fn resolve_loader(config: Option<&Path>) -> Result<ConfigLoader, ConfigError> {
    config.map_or_else(ConfigLoader::new, ConfigLoader::for_file)
}
