//! Structured records emitted by every committed state change.
//!
//! Event names and field sets are part of the compatibility surface for
//! off-chain observers. Components receive an [`EventSink`] at construction
//! and emit only after a mutation has been applied, so a rejected call never
//! produces a record.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::{Permission, RestrictionCode};

/// A single observable state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ComplianceEvent {
    /// A token was frozen or unfrozen.
    LockStateChanged {
        /// Token address.
        token: Address,
        /// Previous lock flag.
        old: bool,
        /// New lock flag.
        locked: bool,
        /// Caller that made the change.
        actor: Address,
    },
    /// Partial-unit transfers were enabled or disabled for a token.
    PartialTransferStateChanged {
        /// Token address.
        token: Address,
        /// Previous flag.
        old: bool,
        /// New flag.
        enabled: bool,
        /// Caller that made the change.
        actor: Address,
    },
    /// A participant's permission bitmask was overwritten.
    PermissionChanged {
        /// Token address.
        token: Address,
        /// Affected participant.
        participant: Address,
        /// Previous mask.
        old: Permission,
        /// New mask.
        new: Permission,
        /// Caller that made the change.
        actor: Address,
    },
    /// A participant's holding-period anchor was set.
    HoldingPeriodChanged {
        /// Token address.
        token: Address,
        /// Affected participant.
        participant: Address,
        /// Previous anchor, if any.
        old: Option<u64>,
        /// New anchor in unix seconds.
        start: u64,
        /// Caller that made the change.
        actor: Address,
    },
    /// The policy store admin changed.
    AdminChanged {
        /// Previous admin.
        old: Address,
        /// New admin.
        new: Address,
    },
    /// Ownership of a store, registry or asset changed.
    OwnershipTransferred {
        /// The component whose owner changed.
        contract: Address,
        /// Previous owner.
        old: Address,
        /// New owner.
        new: Address,
    },
    /// The registry now points at a different policy store.
    StoreReplaced {
        /// Previous store.
        old: Address,
        /// New store.
        new: Address,
    },
    /// A transfer was refused by the policy store.
    RestrictionDetected {
        /// Token address.
        token: Address,
        /// Debited participant.
        from: Address,
        /// Credited participant.
        to: Address,
        /// Requested amount.
        amount: U256,
        /// Why the transfer was refused.
        code: RestrictionCode,
    },
    /// Balance moved between two accounts.
    Transfer {
        /// Token address.
        token: Address,
        /// Debited account, null for mints.
        from: Address,
        /// Credited account, null for burns.
        to: Address,
        /// Amount in base units.
        amount: U256,
    },
    /// An allowance was set.
    Approval {
        /// Token address.
        token: Address,
        /// Account granting the allowance.
        owner: Address,
        /// Account allowed to spend.
        spender: Address,
        /// New allowance.
        amount: U256,
    },
    /// New supply was created.
    Mint {
        /// Token address.
        token: Address,
        /// Recipient.
        to: Address,
        /// Amount minted.
        amount: U256,
    },
    /// Minting was permanently closed.
    MintFinished {
        /// Token address.
        token: Address,
    },
    /// Supply was destroyed.
    Burn {
        /// Token address.
        token: Address,
        /// Account whose balance was burned.
        burner: Address,
        /// Amount burned.
        amount: U256,
    },
}

impl ComplianceEvent {
    /// Stable event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LockStateChanged { .. } => "lock-state-changed",
            Self::PartialTransferStateChanged { .. } => "partial-transfer-state-changed",
            Self::PermissionChanged { .. } => "permission-changed",
            Self::HoldingPeriodChanged { .. } => "holding-period-changed",
            Self::AdminChanged { .. } => "admin-changed",
            Self::OwnershipTransferred { .. } => "ownership-transferred",
            Self::StoreReplaced { .. } => "store-replaced",
            Self::RestrictionDetected { .. } => "restriction-detected",
            Self::Transfer { .. } => "transfer",
            Self::Approval { .. } => "approval",
            Self::Mint { .. } => "mint",
            Self::MintFinished { .. } => "mint-finished",
            Self::Burn { .. } => "burn",
        }
    }
}

/// Destination for emitted events.
///
/// Implementations must not call back into the emitting component: events are
/// delivered while that component still holds its state lock.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn emit(&self, event: ComplianceEvent);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ComplianceEvent) {}
}

/// In-memory event log; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ComplianceEvent>>>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<ComplianceEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of every recorded event, oldest first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(ComplianceEvent::name)
            .collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every recorded event.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: ComplianceEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Fan one event out to several sinks.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Create an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of attached sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no sink is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: ComplianceEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}
