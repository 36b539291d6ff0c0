//! # CLI Argument Definitions
//!
//! - `regtoken init` - Write the default configuration
//! - `regtoken check` - Pre-flight a transfer against the genesis state
//! - `regtoken message <CODE>` - Print the message for a restriction code
//! - `regtoken codes` - List every restriction code
//! - `regtoken audit verify` - Verify the audit journal
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level
//! - `-c, --config <PATH>` - Path to configuration file

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use regtoken_core::{Address, U256};

/// Transfer-restriction engine for regulated tokens.
#[derive(Debug, Parser)]
#[command(name = "regtoken")]
#[command(author, version, about = "Transfer-restriction engine for regulated tokens")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    ///
    /// Defaults to `~/.regtoken/config.toml`. The file must be named `config.toml`.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Pre-flight a transfer against the configured genesis state
    ///
    /// Exits 0 when the transfer would succeed, 1 when it is restricted
    /// and 2 on any other error.
    Check(CheckArgs),

    /// Print the message for a restriction code
    Message {
        /// Restriction code (0-255)
        code: u8,
    },

    /// List every restriction code and its message
    Codes,

    /// Audit journal commands
    Audit {
        /// Audit command to execute
        #[command(subcommand)]
        command: AuditCommands,
    },
}

/// Arguments of `regtoken check`.
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Token address
    #[arg(long, value_parser = parse_address)]
    pub token: Address,

    /// Sender address
    #[arg(long, value_parser = parse_address)]
    pub from: Address,

    /// Receiver address
    #[arg(long, value_parser = parse_address)]
    pub to: Address,

    /// Amount in base units (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_amount)]
    pub amount: U256,

    /// Evaluate at this unix time instead of now
    #[arg(long, value_name = "UNIX_SECS")]
    pub at: Option<u64>,

    /// Execute the transfer as the sender after the pre-flight
    ///
    /// Runtime state is not persisted; with auditing enabled the genesis
    /// events and the outcome are journaled.
    #[arg(long)]
    pub execute: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Audit journal commands.
#[derive(Debug, Subcommand)]
pub enum AuditCommands {
    /// Recompute the HMAC chain of the journal
    Verify {
        /// Hex-encoded 32-byte key; overrides `REGTOKEN_AUDIT_KEY` and the config
        #[arg(long, value_name = "HEX")]
        key_hex: Option<String>,
    },
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `<code> <message>`
    #[default]
    Text,

    /// One JSON object
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

fn parse_address(s: &str) -> Result<Address, String> {
    s.parse::<Address>()
        .map_err(|e| format!("invalid address '{s}': {e}"))
}

fn parse_amount(s: &str) -> Result<U256, String> {
    s.parse::<U256>()
        .map_err(|e| format!("invalid amount '{s}': {e}"))
}
