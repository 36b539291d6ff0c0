//! Error types for the regtoken compliance engine.
//!
//! Errors are organized by domain:
//!
//! - [`AccessError`] - Role checks and null-identity guards
//! - [`PolicyError`] - Policy store and registry failures
//! - [`LedgerError`] - Fungible ledger bookkeeping failures
//! - [`AssetError`] - Restricted asset failures, including compliance aborts
//! - [`ConfigError`] - Configuration failures
//! - [`RegTokenError`] - Top-level error that wraps all error types
//!
//! Compliance restrictions are not authorization failures. The policy store
//! returns them as plain [`RestrictionCode`] values; only a state-changing
//! transfer turns a non-success code into [`AssetError::Restricted`].
//!
//! # Example
//!
//! ```rust
//! use regtoken_core::error::{AccessError, PolicyError, RegTokenError};
//! use regtoken_core::types::Role;
//! use alloy_primitives::Address;
//!
//! fn set_flag(caller: Address, owner: Address) -> Result<(), RegTokenError> {
//!     if caller != owner {
//!         return Err(PolicyError::from(AccessError::unauthorized(caller, Role::Owner)).into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(set_flag(Address::ZERO, Address::repeat_byte(1)).is_err());
//! ```

use alloy_primitives::{Address, U256};

use crate::types::{RestrictionCode, Role};

/// Top-level error type for the regtoken workspace.
#[derive(Debug, thiserror::Error)]
pub enum RegTokenError {
    /// Policy store or registry operation failed.
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Ledger bookkeeping failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Restricted asset operation failed.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RegTokenError {
    /// Returns the restriction code if this error is a compliance abort.
    #[must_use]
    pub const fn restriction(&self) -> Option<RestrictionCode> {
        match self {
            Self::Asset(AssetError::Restricted { code }) => Some(*code),
            _ => None,
        }
    }
}

// ============================================================================
// AccessError
// ============================================================================

/// Role-gate and null-identity failures shared by every owned component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The immediate caller does not hold the required role.
    #[error("caller {caller} is not authorized: requires {required} role")]
    Unauthorized {
        /// The identity that attempted the call.
        caller: Address,
        /// The weakest role that would have been accepted.
        required: Role,
    },

    /// A role was about to be handed to the null identity.
    #[error("{role} cannot be set to the null address")]
    NullIdentity {
        /// The role whose new holder was null.
        role: Role,
    },
}

impl AccessError {
    /// Create an `Unauthorized` error.
    #[must_use]
    pub const fn unauthorized(caller: Address, required: Role) -> Self {
        Self::Unauthorized { caller, required }
    }

    /// Create a `NullIdentity` error.
    #[must_use]
    pub const fn null_identity(role: Role) -> Self {
        Self::NullIdentity { role }
    }
}

// ============================================================================
// PolicyError
// ============================================================================

/// Errors raised by policy stores and the policy registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Role check or null-identity guard failed.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The registry was pointed at a store with the null address.
    #[error("policy store address cannot be null")]
    NullStore,

    /// The candidate store did not answer the policy query interface.
    #[error("store {address} does not behave as a policy store: {reason}")]
    NonConformingStore {
        /// Address of the rejected store.
        address: Address,
        /// Why the canary call failed.
        reason: String,
    },

    /// A lock guarding compliance state was poisoned by a panicking writer.
    #[error("policy state unavailable: {context}")]
    StatePoisoned {
        /// Which piece of state was being accessed.
        context: String,
    },
}

impl PolicyError {
    /// Create a `NonConformingStore` error.
    #[must_use]
    pub fn non_conforming(address: Address, reason: impl Into<String>) -> Self {
        Self::NonConformingStore {
            address,
            reason: reason.into(),
        }
    }

    /// Create a `StatePoisoned` error.
    #[must_use]
    pub fn poisoned(context: impl Into<String>) -> Self {
        Self::StatePoisoned {
            context: context.into(),
        }
    }
}

// ============================================================================
// LedgerError
// ============================================================================

/// Errors raised by the fungible ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Owner-only operation or null owner.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The debited account holds less than the requested amount.
    #[error("insufficient balance for {account}: balance={balance}, required={required}")]
    InsufficientBalance {
        /// The debited account.
        account: Address,
        /// Its current balance.
        balance: U256,
        /// The requested amount.
        required: U256,
    },

    /// The spender's allowance is smaller than the requested amount.
    #[error("insufficient allowance for {spender}: allowance={allowance}, required={required}")]
    InsufficientAllowance {
        /// The spender.
        spender: Address,
        /// Its remaining allowance.
        allowance: U256,
        /// The requested amount.
        required: U256,
    },

    /// Tokens cannot be sent to, or approved for, the null address.
    #[error("the null address cannot be used as {context}")]
    ZeroAddress {
        /// Which argument was null.
        context: &'static str,
    },

    /// Minting was permanently closed.
    #[error("minting is finished")]
    MintingFinished,

    /// Supply, balance or allowance would exceed 256 bits.
    #[error("arithmetic overflow in {context}")]
    Overflow {
        /// Operation that overflowed.
        context: &'static str,
    },

    /// The ledger lock was poisoned.
    #[error("ledger state unavailable: {context}")]
    StatePoisoned {
        /// Which operation observed the poisoned lock.
        context: String,
    },
}

impl LedgerError {
    /// Create a `ZeroAddress` error.
    #[must_use]
    pub const fn zero_address(context: &'static str) -> Self {
        Self::ZeroAddress { context }
    }

    /// Create an `Overflow` error.
    #[must_use]
    pub const fn overflow(context: &'static str) -> Self {
        Self::Overflow { context }
    }

    /// Create a `StatePoisoned` error.
    #[must_use]
    pub fn poisoned(context: impl Into<String>) -> Self {
        Self::StatePoisoned {
            context: context.into(),
        }
    }
}

// ============================================================================
// AssetError
// ============================================================================

/// Errors raised by a restricted asset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// The policy store refused the transfer. The ledger is unchanged.
    #[error("transfer restricted ({}): {}", code.code(), code.message())]
    Restricted {
        /// The restriction code returned by the policy store.
        code: RestrictionCode,
    },

    /// The underlying ledger rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The policy layer could not be consulted.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// No asset is issued at this address.
    #[error("no asset issued at {token}")]
    UnknownToken {
        /// The requested token address.
        token: Address,
    },
}

impl AssetError {
    /// Create a `Restricted` error.
    #[must_use]
    pub const fn restricted(code: RestrictionCode) -> Self {
        Self::Restricted { code }
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Failed to read or write a file.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {context}")]
    ParseFailed {
        /// Context about the parsing failure.
        context: String,
    },

    /// A configuration value is invalid.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field name with the invalid value.
        field: String,
        /// The invalid value.
        value: String,
    },

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDirectory,
}

impl ConfigError {
    /// Create a `FileNotFound` error.
    #[must_use]
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a `ParseFailed` error.
    #[must_use]
    pub fn parse_failed(context: impl Into<String>) -> Self {
        Self::ParseFailed {
            context: context.into(),
        }
    }

    /// Create an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an `Io` error.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a `NoHomeDirectory` error.
    #[must_use]
    pub const fn no_home_directory() -> Self {
        Self::NoHomeDirectory
    }
}

// ============================================================================
// Result type aliases
// ============================================================================

/// A `Result` type alias using [`RegTokenError`] as the error type.
pub type Result<T> = std::result::Result<T, RegTokenError>;

/// A `Result` type alias for policy operations.
pub type PolicyResult<T> = std::result::Result<T, PolicyError>;

/// A `Result` type alias for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// A `Result` type alias for asset operations.
pub type AssetResult<T> = std::result::Result<T, AssetError>;

/// A `Result` type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Unit Tests
// ============================================================================
