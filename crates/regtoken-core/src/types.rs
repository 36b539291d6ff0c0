//! Core types for the regtoken compliance engine.
//!
//! - [`RestrictionCode`] - Stable ERC-1404 style verdict of a transfer evaluation
//! - [`Permission`] - Per-participant SEND/RECEIVE bit-field
//! - [`TransferRequest`] - Everything the policy store needs to judge one transfer
//! - [`Role`] - Owner/admin role names used in authorization errors
//!
//! # Examples
//!
//! ```
//! use regtoken_core::types::{Permission, RestrictionCode};
//!
//! let perm = Permission::SEND;
//! assert!(perm.can_send());
//! assert!(!perm.can_receive());
//!
//! assert_eq!(RestrictionCode::from_code(3), Some(RestrictionCode::SendNotAllowed));
//! assert_eq!(RestrictionCode::Locked.message(), "Token is locked");
//! ```

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned for code values outside the enumerated contract.
pub const UNKNOWN_RESTRICTION_MESSAGE: &str = "Unknown restriction code";

// ============================================================================
// RestrictionCode
// ============================================================================

/// Outcome of a compliance evaluation.
///
/// The integer values are a compatibility surface shared with wallets and
/// exchanges that pre-flight transfers, and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum RestrictionCode {
    /// The transfer is permitted.
    Success = 0,
    /// Every transfer of the token is frozen.
    Locked = 1,
    /// The amount is not a whole number of token units.
    NotDivisible = 2,
    /// The sender lacks the SEND permission bit.
    SendNotAllowed = 3,
    /// The receiver lacks the RECEIVE permission bit.
    ReceiveNotAllowed = 4,
    /// The sender is still inside its lock-up window.
    HoldingPeriodActive = 5,
    /// The non-zero amount is below the minimal transfer denomination.
    BelowMinimumDenomination = 6,
}

impl RestrictionCode {
    /// Every code in ascending numeric order.
    pub const ALL: [Self; 7] = [
        Self::Success,
        Self::Locked,
        Self::NotDivisible,
        Self::SendNotAllowed,
        Self::ReceiveNotAllowed,
        Self::HoldingPeriodActive,
        Self::BelowMinimumDenomination,
    ];

    /// The stable integer value.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a code by its integer value.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Locked),
            2 => Some(Self::NotDivisible),
            3 => Some(Self::SendNotAllowed),
            4 => Some(Self::ReceiveNotAllowed),
            5 => Some(Self::HoldingPeriodActive),
            6 => Some(Self::BelowMinimumDenomination),
            _ => None,
        }
    }

    /// The fixed human-readable sentence for this code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Locked => "Token is locked",
            Self::NotDivisible => "Token can not trade partial amounts",
            Self::SendNotAllowed => "Sender is not allowed to send the token",
            Self::ReceiveNotAllowed => "Receiver is not allowed to receive the token",
            Self::HoldingPeriodActive => "Sender is still in 12 months holding period",
            Self::BelowMinimumDenomination => {
                "Transfer amount is below the minimal transfer denomination"
            }
        }
    }

    /// Message for a raw integer, falling back to [`UNKNOWN_RESTRICTION_MESSAGE`].
    #[must_use]
    pub const fn message_for(code: u8) -> &'static str {
        match Self::from_code(code) {
            Some(known) => known.message(),
            None => UNKNOWN_RESTRICTION_MESSAGE,
        }
    }

    /// Short machine name, e.g. `SEND_NOT_ALLOWED`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Locked => "LOCKED",
            Self::NotDivisible => "NOT_DIVISIBLE",
            Self::SendNotAllowed => "SEND_NOT_ALLOWED",
            Self::ReceiveNotAllowed => "RECEIVE_NOT_ALLOWED",
            Self::HoldingPeriodActive => "HOLDING_PERIOD_ACTIVE",
            Self::BelowMinimumDenomination => "BELOW_MINIMUM_DENOMINATION",
        }
    }

    /// Returns `true` only for [`RestrictionCode::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for RestrictionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl From<RestrictionCode> for u8 {
    fn from(code: RestrictionCode) -> Self {
        code.code()
    }
}

/// A raw integer that is not part of the restriction-code contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown restriction code: {0}")]
pub struct UnknownRestrictionCode(pub u8);

impl TryFrom<u8> for RestrictionCode {
    type Error = UnknownRestrictionCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_code(value).ok_or(UnknownRestrictionCode(value))
    }
}

// ============================================================================
// Permission
// ============================================================================

/// Two independent eligibility bits for one participant of one token.
///
/// A missing record is [`Permission::NONE`]. The raw mask is stored as given,
/// bits above `RECEIVE` are kept but never consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u8);

impl Permission {
    /// No eligibility.
    pub const NONE: Self = Self(0);
    /// May send.
    pub const SEND: Self = Self(0x1);
    /// May receive.
    pub const RECEIVE: Self = Self(0x2);
    /// May send and receive.
    pub const TRANSFER: Self = Self(0x3);

    /// Wrap a raw bitmask.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// The raw bitmask.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether the SEND bit is set.
    #[must_use]
    pub const fn can_send(self) -> bool {
        self.0 & Self::SEND.0 != 0
    }

    /// Whether the RECEIVE bit is set.
    #[must_use]
    pub const fn can_receive(self) -> bool {
        self.0 & Self::RECEIVE.0 != 0
    }

    /// Union of two masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl From<u8> for Permission {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.can_send(), self.can_receive()) {
            (true, true) => write!(f, "send+receive"),
            (true, false) => write!(f, "send"),
            (false, true) => write!(f, "receive"),
            (false, false) => write!(f, "none"),
        }
    }
}

// ============================================================================
// Role
// ============================================================================

/// Roles held on a policy store, registry or ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including role reassignment.
    Owner,
    /// Day-to-day mutations (permissions, holding periods). The owner also qualifies.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

// ============================================================================
// TransferRequest
// ============================================================================

/// One attempted movement of `amount` base units of `token`.
///
/// `initiator` is the immediate caller of the transfer (the sender itself for
/// `transfer`, the spender for `transfer_from`). `decimals` comes from the
/// token's ledger and defines one whole unit as `10^decimals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// The token being moved.
    pub token: Address,
    /// Decimal places of the token.
    pub decimals: u8,
    /// Identity that submitted the transfer.
    pub initiator: Address,
    /// Debited participant.
    pub from: Address,
    /// Credited participant.
    pub to: Address,
    /// Amount in base units.
    pub amount: U256,
}

impl TransferRequest {
    /// Build a request where the sender initiates its own transfer.
    #[must_use]
    pub const fn new(token: Address, decimals: u8, from: Address, to: Address, amount: U256) -> Self {
        Self {
            token,
            decimals,
            initiator: from,
            from,
            to,
            amount,
        }
    }

    /// Replace the initiator.
    #[must_use]
    pub const fn with_initiator(mut self, initiator: Address) -> Self {
        self.initiator = initiator;
        self
    }

    /// One whole token unit in base units, `None` when `10^decimals` exceeds 256 bits.
    #[must_use]
    pub fn whole_unit(&self) -> Option<U256> {
        whole_unit(self.decimals)
    }
}

/// `10^decimals`, or `None` on overflow.
#[must_use]
pub fn whole_unit(decimals: u8) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(decimals))
}
