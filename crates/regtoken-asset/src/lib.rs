//! # regtoken-asset
//!
//! Restricted fungible tokens.
//!
//! - [`ledger`] - [`Ledger`], plain balance and allowance bookkeeping
//! - [`asset`] - [`RestrictedAsset`], the ledger behind a policy gate

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod asset;
pub mod ledger;

pub use asset::RestrictedAsset;
pub use ledger::{Ledger, DEFAULT_DECIMALS};
