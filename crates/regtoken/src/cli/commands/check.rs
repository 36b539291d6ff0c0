//! # Check Command
//!
//! `regtoken check` deploys the configured genesis state, pre-flights one
//! transfer and reports the restriction code. With `--execute` the transfer
//! is then attempted as the sender, and when auditing is enabled every event
//! of the run is journaled.

use std::sync::Arc;

use regtoken_core::config::Config;
use regtoken_core::config_loader::{expand_path, ConfigLoader};
use regtoken_core::error::{AssetError, ConfigError, RegTokenError};
use regtoken_core::{FanoutSink, RestrictionCode};
use regtoken_policy::{Clock, ManualClock, SystemClock};

use super::exit_codes::{EXIT_RESTRICTED, EXIT_SUCCESS};
use crate::audit::{resolve_key, AuditError, AuditJournal};
use crate::cli::args::{CheckArgs, OutputFormat};
use crate::genesis::Genesis;
use crate::logging::{redact_sensitive, TracingSink};

/// Errors that prevent a verdict.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The audit journal could not be opened.
    #[error("Audit journal unavailable: {0}")]
    Audit(#[from] AuditError),

    /// Genesis or evaluation failed.
    #[error(transparent)]
    System(#[from] RegTokenError),
}

/// Verdict of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Restriction code of the pre-flight.
    pub code: RestrictionCode,
    /// Whether `--execute` moved the tokens.
    pub executed: bool,
}

impl CheckOutcome {
    /// [`EXIT_SUCCESS`] when allowed, [`EXIT_RESTRICTED`] otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.code.is_success() {
            EXIT_SUCCESS
        } else {
            EXIT_RESTRICTED
        }
    }

    /// Render for stdout.
    #[must_use]
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => format!("{} {}", self.code.code(), self.code.message()),
            OutputFormat::Json => serde_json::json!({
                "code": self.code.code(),
                "name": self.code.name(),
                "message": self.code.message(),
                "executed": self.executed,
            })
            .to_string(),
        }
    }
}

/// The `regtoken check` command handler.
#[derive(Debug, Clone)]
pub struct CheckCommand {
    args: CheckArgs,
    loader: ConfigLoader,
}

impl CheckCommand {
    /// Create a new `CheckCommand`.
    #[must_use]
    pub const fn new(args: CheckArgs, loader: ConfigLoader) -> Self {
        Self { args, loader }
    }

    /// Evaluate (and optionally execute) the transfer.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError`] when no verdict can be produced. A restricted
    /// transfer is an outcome, not an error.
    pub fn execute(&self) -> Result<CheckOutcome, CheckError> {
        let config = self.loader.load_required()?;
        let clock: Arc<dyn Clock> = match self.args.at {
            Some(at) => Arc::new(ManualClock::new(at)),
            None => Arc::new(SystemClock),
        };

        let system = Genesis::new(&config)
            .with_clock(clock)
            .with_sink(Arc::new(self.sink(&config)?))
            .build()?;

        let CheckArgs {
            token,
            from,
            to,
            amount,
            ..
        } = self.args;
        let code = system.check(token, from, to, amount)?;
        tracing::debug!(%token, %from, %to, %amount, code = code.code(), "Pre-flight complete");

        let mut executed = false;
        if self.args.execute {
            match system.require_asset(token)?.transfer(from, to, amount) {
                Ok(()) => executed = true,
                Err(AssetError::Restricted { .. }) => {}
                Err(e) => return Err(RegTokenError::from(e).into()),
            }
        }

        Ok(CheckOutcome { code, executed })
    }

    /// Print the outcome.
    ///
    /// # Errors
    ///
    /// See [`CheckCommand::execute`].
    pub fn run(&self) -> Result<CheckOutcome, CheckError> {
        let outcome = self.execute()?;
        println!("{}", outcome.render(self.args.format));
        Ok(outcome)
    }

    /// Events always reach the log; executed runs also reach the audit journal when enabled.
    fn sink(&self, config: &Config) -> Result<FanoutSink, CheckError> {
        let sink = FanoutSink::new().with(Arc::new(TracingSink));
        if !(self.args.execute && config.audit.enabled) {
            return Ok(sink);
        }
        let key = resolve_key(config.audit.key_hex.as_deref())?;
        let path = expand_path(&config.audit.path)?;
        tracing::info!(
            path = %path.display(),
            key = %redact_sensitive(&hex::encode(key)),
            "Journaling events"
        );
        Ok(sink.with(Arc::new(AuditJournal::open(&path, &key)?)))
    }
}
