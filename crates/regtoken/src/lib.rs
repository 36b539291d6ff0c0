//! # regtoken
//!
//! Operator surface of the transfer-restriction engine: logging setup, the
//! HMAC-chained audit journal, genesis bootstrap from configuration and the
//! command-line interface.
//!
//! ## Modules
//!
//! - [`audit`] - Tamper-evident event journal
//! - [`cli`] - Command-line interface definitions and handlers
//! - [`genesis`] - Deploy store, registry and assets from a [`Config`](regtoken_core::config::Config)
//! - [`logging`] - `tracing` subscriber setup and a sink that mirrors events into the log
//!
//! ```no_run
//! use regtoken::genesis::Genesis;
//! use regtoken_core::config::Config;
//! use regtoken_core::{Address, U256};
//!
//! let config = Config::default();
//! let system = Genesis::new(&config).build()?;
//! let code = system.check(
//!     Address::with_last_byte(0x10),
//!     Address::with_last_byte(0xa1),
//!     Address::with_last_byte(0xb2),
//!     U256::from(1u64),
//! );
//! # Ok::<(), regtoken_core::RegTokenError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod cli;
pub mod genesis;
pub mod logging;

pub use audit::{verify_chain, AuditError, AuditJournal, VerifyResult};
pub use genesis::{Genesis, System};
pub use logging::{
    init_logging, redact_sensitive, verbosity_to_level, LogConfig, LogError, LogFormat, LogGuard,
    LogLevel, TracingSink,
};
