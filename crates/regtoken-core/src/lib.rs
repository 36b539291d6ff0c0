//! # regtoken-core
//!
//! Types, events, errors and configuration shared by the regtoken crates.
//!
//! ## Modules
//!
//! - [`types`] - [`RestrictionCode`], [`Permission`], [`TransferRequest`], [`Role`]
//! - [`events`] - [`ComplianceEvent`] and the [`EventSink`] observers receive them through
//! - [`error`] - Error types and result aliases
//! - [`config`] - TOML configuration, including the genesis deployment
//! - [`config_loader`] - Reading and writing `~/.regtoken/config.toml`
//!
//! ## Restriction codes
//!
//! ```rust
//! use regtoken_core::RestrictionCode;
//!
//! for code in RestrictionCode::ALL {
//!     assert!(!code.message().is_empty());
//! }
//! assert_eq!(RestrictionCode::message_for(42), "Unknown restriction code");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod types;

pub use alloy_primitives::{Address, U256};

pub use error::{
    AccessError, AssetError, ConfigError, LedgerError, PolicyError, RegTokenError,
};
pub use events::{ComplianceEvent, EventLog, EventSink, FanoutSink, NullSink};
pub use types::{Permission, RestrictionCode, Role, TransferRequest};
