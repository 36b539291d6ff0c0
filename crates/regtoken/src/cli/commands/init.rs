//! # Init Command
//!
//! `regtoken init` writes the commented default configuration to
//! `~/.regtoken/config.toml` (or the `--config` path).

use std::path::PathBuf;

use regtoken_core::config_loader::ConfigLoader;
use regtoken_core::error::ConfigError;

/// Errors that can occur during initialization.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// A configuration exists and `--force` was not given.
    #[error("Configuration already exists at {0}. Use --force to overwrite.")]
    AlreadyInitialized(PathBuf),

    /// Writing the configuration failed.
    #[error("Failed to write config: {0}")]
    ConfigWrite(#[from] ConfigError),
}

/// The `regtoken init` command handler.
#[derive(Debug, Clone)]
pub struct InitCommand {
    /// Overwrite an existing configuration.
    pub force: bool,
    loader: ConfigLoader,
}

impl InitCommand {
    /// Create a new `InitCommand` writing through `loader`.
    #[must_use]
    pub const fn new(force: bool, loader: ConfigLoader) -> Self {
        Self { force, loader }
    }

    /// Write the default configuration and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::AlreadyInitialized`] when a configuration exists and
    /// `force` is not set, or [`InitError::ConfigWrite`] on I/O failure.
    pub fn run(&self) -> Result<PathBuf, InitError> {
        let path = self.loader.config_path();
        if self.loader.exists() && !self.force {
            return Err(InitError::AlreadyInitialized(path));
        }

        self.loader.write_default()?;
        tracing::info!(path = %path.display(), "Configuration written");
        println!("Wrote default configuration to {}", path.display());
        Ok(path)
    }
}
