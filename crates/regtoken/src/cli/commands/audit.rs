//! `regtoken audit verify`.

use std::path::PathBuf;

use regtoken_core::config_loader::{expand_path, ConfigLoader};
use regtoken_core::error::ConfigError;

use crate::audit::{parse_key, resolve_key, verify_chain, AuditError, VerifyResult};

/// Errors that prevent verification.
#[derive(Debug, thiserror::Error)]
pub enum AuditVerifyError {
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The key is missing or the journal is unreadable.
    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Recomputes the journal's HMAC chain.
#[derive(Debug, Clone)]
pub struct AuditVerifyCommand {
    key_hex: Option<String>,
    loader: ConfigLoader,
}

impl AuditVerifyCommand {
    /// Create a new command; `key_hex` overrides the configured key.
    #[must_use]
    pub const fn new(key_hex: Option<String>, loader: ConfigLoader) -> Self {
        Self { key_hex, loader }
    }

    /// Verify and return the journal path with the result.
    ///
    /// # Errors
    ///
    /// Returns [`AuditVerifyError`] when the key cannot be resolved or the
    /// journal cannot be parsed. A broken chain is reported in the result.
    pub fn verify(&self) -> Result<(PathBuf, VerifyResult), AuditVerifyError> {
        let config = self.loader.load()?;
        let key = match self.key_hex.as_deref() {
            Some(hex_key) => parse_key(hex_key)?,
            None => resolve_key(config.audit.key_hex.as_deref())?,
        };
        let path = expand_path(&config.audit.path)?;
        let result = verify_chain(&path, &key)?;
        Ok((path, result))
    }

    /// Print the verdict.
    ///
    /// # Errors
    ///
    /// See [`AuditVerifyCommand::verify`].
    pub fn run(&self) -> Result<VerifyResult, AuditVerifyError> {
        let (path, result) = self.verify()?;
        if result.valid {
            println!(
                "{}: chain intact, {} entries verified",
                path.display(),
                result.entries_checked
            );
        } else {
            tracing::warn!(
                path = %path.display(),
                seq = ?result.first_invalid_seq,
                "Audit chain broken"
            );
            println!(
                "{}: chain BROKEN at seq {} after {} good entries: {}",
                path.display(),
                result.first_invalid_seq.unwrap_or_default(),
                result.entries_checked,
                result.error_message.as_deref().unwrap_or("unknown failure"),
            );
        }
        Ok(result)
    }
}
