//! # CLI Module
//!
//! Command-line interface for `regtoken`.
//!
//! - [`args`] - Argument parsing and CLI structure definitions
//! - [`commands`] - Command handler implementations
//!
//! ## Commands
//!
//! - `regtoken init [--force]` - Write the default configuration
//! - `regtoken check --token T --from A --to B --amount N [--at SECS] [--execute]`
//! - `regtoken message <CODE>` - Print the message for a restriction code
//! - `regtoken codes` - List every restriction code
//! - `regtoken audit verify [--key-hex HEX]` - Verify the audit journal

pub mod args;
pub mod commands;

pub use args::{AuditCommands, CheckArgs, Cli, Commands, OutputFormat};
