//! # regtoken-policy
//!
//! Transfer-restriction policy for regulated tokens.
//!
//! ## Modules
//!
//! - [`store`] - The [`PolicyStore`] contract and [`DefaultPolicyStore`]
//! - [`registry`] - [`PolicyRegistry`], the upgradeable pointer tokens bind to
//! - [`clock`] - Time sources for holding-period checks
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use regtoken_policy::{DefaultPolicyStore, PolicyRegistry, PolicyStore};
//! use regtoken_core::Address;
//!
//! let operator = Address::with_last_byte(1);
//! let store = Arc::new(DefaultPolicyStore::new(Address::with_last_byte(2), operator));
//! let registry = PolicyRegistry::new(Address::with_last_byte(3), operator, store).unwrap();
//!
//! let v2 = Arc::new(DefaultPolicyStore::new(Address::with_last_byte(4), operator));
//! registry.replace_store(operator, v2).unwrap();
//! assert_eq!(registry.current_store_address().unwrap(), Address::with_last_byte(4));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod registry;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::PolicyRegistry;
pub use store::{DefaultPolicyStore, PolicyStore};
