//! # Logging Infrastructure
//!
//! Structured logging with `tracing`. Output goes to stderr, so command results
//! on stdout stay machine readable, and optionally to a file as well.
//!
//! ```no_run
//! use regtoken::logging::{init_logging, LogConfig};
//!
//! let _guard = init_logging(&LogConfig::default()).expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use regtoken_core::config::LoggingConfig;
use regtoken_core::config_loader::expand_path;
use regtoken_core::events::{ComplianceEvent, EventSink};
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log file or its directory could not be created.
    #[error("Failed to create log file: {0}")]
    FileCreation(String),

    /// A global subscriber is already installed.
    #[error("Failed to initialize logging: {0}")]
    SubscriberInit(String),

    /// Level, format or path is not usable.
    #[error("Invalid log configuration: {0}")]
    InvalidConfig(String),
}

/// Minimum severity to record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Every evaluation.
    Trace,
    /// Compliance flag and ledger changes.
    Debug,
    /// Role changes, store replacement, lock changes.
    Info,
    /// Rejected mutations and restricted transfers.
    #[default]
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// The equivalent `tracing` level.
    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }

    /// Lowercase name, as accepted by `EnvFilter`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LogError::InvalidConfig(format!("unknown level '{other}'"))),
        }
    }
}

/// Line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human oriented.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
    /// Single line, human oriented.
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(LogError::InvalidConfig(format!("unknown format '{other}'"))),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum severity.
    pub level: LogLevel,
    /// Line format.
    pub format: LogFormat,
    /// Also append to this file.
    pub file_path: Option<PathBuf>,
}

impl LogConfig {
    /// Resolve the `[logging]` section of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] for an unknown level or format, or a
    /// file path whose `~` cannot be expanded.
    pub fn from_settings(settings: &LoggingConfig) -> Result<Self, LogError> {
        let file_path = settings
            .file
            .as_deref()
            .map(expand_path)
            .transpose()
            .map_err(|e| LogError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            level: settings.level.parse()?,
            format: settings.format.parse()?,
            file_path,
        })
    }

    /// Replace the level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

/// Keeps the background file writer alive; drop it last.
pub struct LogGuard {
    guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl std::fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGuard")
            .field("has_file_guard", &self.guard.is_some())
            .finish()
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`LogError`] if the file cannot be opened, the filter is invalid,
/// or a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.as_str()))
        .map_err(|e| LogError::InvalidConfig(e.to_string()))?;

    let mut layers: Vec<BoxedLayer> = vec![stderr_layer(config.format)];

    let guard = match config.file_path {
        Some(ref path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = match config.format {
                LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
                LogFormat::Pretty | LogFormat::Compact => {
                    fmt::layer().with_writer(writer).with_ansi(false).boxed()
                }
            };
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::SubscriberInit(e.to_string()))?;

    Ok(LogGuard { guard })
}

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
    }
}

fn file_writer(
    path: &Path,
) -> Result<
    (
        tracing_appender::non_blocking::NonBlocking,
        tracing_appender::non_blocking::WorkerGuard,
    ),
    LogError,
> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| LogError::FileCreation(format!("{}: {e}", dir.display())))?;
    let filename = path
        .file_name()
        .ok_or_else(|| LogError::InvalidConfig("Invalid log file name".to_string()))?;

    let appender = tracing_appender::rolling::never(dir, filename);
    Ok(tracing_appender::non_blocking(appender))
}

/// Map `-v` repetitions to a level; `None` keeps the configured level.
#[must_use]
pub const fn verbosity_to_level(verbosity: u8) -> Option<LogLevel> {
    match verbosity {
        0 => None,
        1 => Some(LogLevel::Info),
        2 => Some(LogLevel::Debug),
        _ => Some(LogLevel::Trace),
    }
}

/// Event sink that mirrors every compliance event into the log at `trace` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ComplianceEvent) {
        match serde_json::to_string(&event) {
            Ok(fields) => tracing::trace!(event = event.name(), %fields, "Compliance event"),
            Err(e) => tracing::warn!(event = event.name(), error = %e, "Unserializable compliance event"),
        }
    }
}

/// Mask all but the edges of a secret before it is logged.
#[must_use]
pub fn redact_sensitive(value: &str) -> String {
    const MIN_LENGTH_FOR_PARTIAL: usize = 12;
    const VISIBLE_CHARS: usize = 4;

    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len < MIN_LENGTH_FOR_PARTIAL {
        return "***".to_string();
    }

    let prefix: String = chars.iter().take(VISIBLE_CHARS).collect();
    let suffix: String = chars.iter().skip(len - VISIBLE_CHARS).collect();
    format!("{prefix}***{suffix}")
}
