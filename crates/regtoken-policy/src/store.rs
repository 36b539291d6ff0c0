//! Per-token compliance state and the transfer-restriction decision function.
//!
//! # Rule Evaluation Order
//!
//! [`PolicyStore::evaluate`] checks a transfer in a fixed order. The first rule
//! that matches decides the verdict and every later rule is skipped:
//!
//! 1. **Lock** - The token is frozen: [`RestrictionCode::Locked`].
//! 2. **Sender** - `from` lacks the SEND bit: [`RestrictionCode::SendNotAllowed`].
//! 3. **Receiver** - `to` lacks the RECEIVE bit: [`RestrictionCode::ReceiveNotAllowed`].
//! 4. **Divisibility** - Partial transfers are disabled and `amount` is not a
//!    multiple of `10^decimals`: [`RestrictionCode::NotDivisible`].
//! 5. **Holding period** - `from` has a lock-up anchor and
//!    `now < anchor + holding_period_secs`: [`RestrictionCode::HoldingPeriodActive`].
//! 6. **Minimum** - `0 < amount < minimal_transfer`:
//!    [`RestrictionCode::BelowMinimumDenomination`].
//! 7. Otherwise [`RestrictionCode::Success`].
//!
//! # Roles
//!
//! The deployer starts as both owner and admin. Permissions and holding periods
//! may be set by either role; lock and partial-transfer flags and both role
//! transfers are owner-only. Every mutator checks the immediate `caller`
//! argument and rejects the call before touching state.
//!
//! # Thread Safety
//!
//! [`DefaultPolicyStore`] keeps all of its state behind one `RwLock`. A mutation
//! takes the write lock for role check, update and event emission, so readers
//! see either the state before it or the state after it.
//!
//! # Example
//!
//! ```
//! use regtoken_policy::store::{DefaultPolicyStore, PolicyStore};
//! use regtoken_core::{Address, Permission, RestrictionCode, TransferRequest, U256};
//!
//! let owner = Address::with_last_byte(1);
//! let alice = Address::with_last_byte(2);
//! let token = Address::with_last_byte(0xaa);
//! let store = DefaultPolicyStore::new(Address::with_last_byte(0x50), owner);
//!
//! let one = U256::from(10u64).pow(U256::from(18u8));
//! let request = TransferRequest::new(token, 18, owner, alice, one);
//! assert_eq!(store.evaluate(&request).unwrap(), RestrictionCode::SendNotAllowed);
//!
//! store.set_permission(owner, token, owner, Permission::SEND).unwrap();
//! store.set_permission(owner, token, alice, Permission::RECEIVE).unwrap();
//! assert_eq!(store.evaluate(&request).unwrap(), RestrictionCode::Success);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use regtoken_core::config::PolicyConfig;
use regtoken_core::error::{AccessError, PolicyError, PolicyResult};
use regtoken_core::events::{ComplianceEvent, EventSink, NullSink};
use regtoken_core::types::{Permission, RestrictionCode, Role, TransferRequest};
use regtoken_core::{Address, U256};

use crate::clock::{Clock, SystemClock};

/// A policy implementation that a registry can point at.
///
/// Mutators take the identity of the immediate caller; implementations must
/// authorize against it and must leave state untouched when they return an
/// error. `evaluate` must be free of side effects.
pub trait PolicyStore: Send + Sync {
    /// Address this store is deployed at.
    fn address(&self) -> Address;

    /// Current owner.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable.
    fn owner(&self) -> PolicyResult<Address>;

    /// Current admin.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable.
    fn admin(&self) -> PolicyResult<Address>;

    /// Judge one transfer. Never mutates state.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable. Every
    /// restriction is an `Ok` value.
    fn evaluate(&self, request: &TransferRequest) -> PolicyResult<RestrictionCode>;

    /// Overwrite the permission bitmask of `participant` for `token`. Owner or admin.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthorized`] for any other caller.
    fn set_permission(
        &self,
        caller: Address,
        token: Address,
        participant: Address,
        permission: Permission,
    ) -> PolicyResult<()>;

    /// Freeze or unfreeze `token`. Owner only.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthorized`] for any other caller.
    fn set_locked(&self, caller: Address, token: Address, locked: bool) -> PolicyResult<()>;

    /// Allow or forbid fractional-unit transfers of `token`. Owner only.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthorized`] for any other caller.
    fn set_partial_transfers(
        &self,
        caller: Address,
        token: Address,
        enabled: bool,
    ) -> PolicyResult<()>;

    /// Anchor the lock-up of `participant` at `start` (unix seconds). Owner or admin.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthorized`] for any other caller.
    fn set_holding_period(
        &self,
        caller: Address,
        token: Address,
        participant: Address,
        start: u64,
    ) -> PolicyResult<()>;

    /// Hand the admin role to `new_admin`. Owner only.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthorized`] for any other caller and
    /// [`AccessError::NullIdentity`] when `new_admin` is the null address.
    fn transfer_admin(&self, caller: Address, new_admin: Address) -> PolicyResult<()>;

    /// Hand the owner role to `new_owner`. Owner only.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthorized`] for any other caller and
    /// [`AccessError::NullIdentity`] when `new_owner` is the null address.
    fn transfer_ownership(&self, caller: Address, new_owner: Address) -> PolicyResult<()>;

    /// Whether `token` is frozen.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable.
    fn is_locked(&self, token: Address) -> PolicyResult<bool>;

    /// Whether fractional-unit transfers of `token` are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable.
    fn partial_transfers_enabled(&self, token: Address) -> PolicyResult<bool>;

    /// Permission of `participant` for `token`, [`Permission::NONE`] when unset.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable.
    fn permission(&self, token: Address, participant: Address) -> PolicyResult<Permission>;

    /// Lock-up anchor of `participant` for `token`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable.
    fn holding_period_start(&self, token: Address, participant: Address)
        -> PolicyResult<Option<u64>>;

    /// Canary call used by the registry before it commits to this store.
    ///
    /// The default evaluates an empty request and only requires that it
    /// answers. Override to add implementation-specific self checks.
    ///
    /// # Errors
    ///
    /// Any error means the store must not be installed.
    fn probe(&self) -> PolicyResult<RestrictionCode> {
        self.evaluate(&TransferRequest::new(
            Address::ZERO,
            0,
            Address::ZERO,
            Address::ZERO,
            U256::ZERO,
        ))
    }
}

// ============================================================================
// State
// ============================================================================

/// Compliance record of one token, created on first mutation.
#[derive(Debug, Clone, Default)]
struct TokenCompliance {
    locked: bool,
    partial_transfers: bool,
    permissions: HashMap<Address, Permission>,
    holding_period_start: HashMap<Address, u64>,
}

#[derive(Debug)]
struct StoreState {
    owner: Address,
    admin: Address,
    tokens: HashMap<Address, TokenCompliance>,
}

impl StoreState {
    fn authorize(&self, caller: Address, required: Role) -> Result<(), AccessError> {
        let allowed = match required {
            Role::Owner => caller == self.owner,
            Role::Admin => caller == self.owner || caller == self.admin,
        };
        if allowed {
            Ok(())
        } else {
            Err(AccessError::unauthorized(caller, required))
        }
    }

    fn token_mut(&mut self, token: Address) -> &mut TokenCompliance {
        self.tokens.entry(token).or_default()
    }
}

// ============================================================================
// DefaultPolicyStore
// ============================================================================

/// The reference policy store.
///
/// Construct with [`DefaultPolicyStore::new`] and adjust with the `with_*`
/// builders before sharing it.
pub struct DefaultPolicyStore {
    address: Address,
    config: PolicyConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    state: RwLock<StoreState>,
}

impl std::fmt::Debug for DefaultPolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultPolicyStore")
            .field("address", &self.address)
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl DefaultPolicyStore {
    /// Deploy a store at `address`; `deployer` becomes owner and admin.
    ///
    /// Uses the default [`PolicyConfig`], the system clock and no event sink.
    #[must_use]
    pub fn new(address: Address, deployer: Address) -> Self {
        Self {
            address,
            config: PolicyConfig::default(),
            clock: Arc::new(SystemClock),
            sink: Arc::new(NullSink),
            state: RwLock::new(StoreState {
                owner: deployer,
                admin: deployer,
                tokens: HashMap::new(),
            }),
        }
    }

    /// Replace the holding period and minimal transfer constants.
    #[must_use]
    pub fn with_config(mut self, config: PolicyConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Deliver events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The active constants.
    #[must_use]
    pub const fn config(&self) -> &PolicyConfig {
        &self.config
    }

    fn read_state(&self, context: &str) -> PolicyResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| PolicyError::poisoned(format!("policy store read lock ({context})")))
    }

    fn write_state(&self, context: &str) -> PolicyResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| PolicyError::poisoned(format!("policy store write lock ({context})")))
    }

    /// Take the write lock, authorize `caller`, then apply `apply`.
    ///
    /// `apply` returns the event to emit; it is delivered before the lock is
    /// released so observers see events in commit order.
    fn mutate<F>(&self, caller: Address, required: Role, context: &str, apply: F) -> PolicyResult<()>
    where
        F: FnOnce(&mut StoreState) -> Result<ComplianceEvent, AccessError>,
    {
        let mut state = self.write_state(context)?;
        if let Err(e) = state.authorize(caller, required) {
            tracing::warn!(%caller, operation = context, error = %e, "Rejected policy mutation");
            return Err(e.into());
        }
        let event = apply(&mut state)?;
        self.sink.emit(event);
        Ok(())
    }

    fn check_lock(record: Option<&TokenCompliance>) -> Option<RestrictionCode> {
        record
            .filter(|r| r.locked)
            .map(|_| RestrictionCode::Locked)
    }

    fn check_sender(record: Option<&TokenCompliance>, from: Address) -> Option<RestrictionCode> {
        let permission = Self::permission_in(record, from);
        (!permission.can_send()).then_some(RestrictionCode::SendNotAllowed)
    }

    fn check_receiver(record: Option<&TokenCompliance>, to: Address) -> Option<RestrictionCode> {
        let permission = Self::permission_in(record, to);
        (!permission.can_receive()).then_some(RestrictionCode::ReceiveNotAllowed)
    }

    fn check_divisibility(
        record: Option<&TokenCompliance>,
        request: &TransferRequest,
    ) -> Option<RestrictionCode> {
        if record.is_some_and(|r| r.partial_transfers) {
            return None;
        }
        let divisible = match request.whole_unit() {
            Some(unit) => (request.amount % unit).is_zero(),
            // No amount but zero is a multiple of a unit wider than 256 bits.
            None => request.amount.is_zero(),
        };
        (!divisible).then_some(RestrictionCode::NotDivisible)
    }

    fn check_holding_period(
        &self,
        record: Option<&TokenCompliance>,
        from: Address,
    ) -> Option<RestrictionCode> {
        let start = *record?.holding_period_start.get(&from)?;
        let ends = start.saturating_add(self.config.holding_period_secs);
        (self.clock.now() < ends).then_some(RestrictionCode::HoldingPeriodActive)
    }

    fn check_minimum(&self, amount: U256) -> Option<RestrictionCode> {
        (!amount.is_zero() && amount < self.config.minimal_transfer)
            .then_some(RestrictionCode::BelowMinimumDenomination)
    }

    fn permission_in(record: Option<&TokenCompliance>, participant: Address) -> Permission {
        record
            .and_then(|r| r.permissions.get(&participant).copied())
            .unwrap_or_default()
    }
}

impl PolicyStore for DefaultPolicyStore {
    fn address(&self) -> Address {
        self.address
    }

    fn owner(&self) -> PolicyResult<Address> {
        Ok(self.read_state("owner")?.owner)
    }

    fn admin(&self) -> PolicyResult<Address> {
        Ok(self.read_state("admin")?.admin)
    }

    fn evaluate(&self, request: &TransferRequest) -> PolicyResult<RestrictionCode> {
        let state = self.read_state("evaluate")?;
        let record = state.tokens.get(&request.token);

        let code = Self::check_lock(record)
            .or_else(|| Self::check_sender(record, request.from))
            .or_else(|| Self::check_receiver(record, request.to))
            .or_else(|| Self::check_divisibility(record, request))
            .or_else(|| self.check_holding_period(record, request.from))
            .or_else(|| self.check_minimum(request.amount))
            .unwrap_or(RestrictionCode::Success);

        tracing::trace!(
            token = %request.token,
            from = %request.from,
            to = %request.to,
            amount = %request.amount,
            code = code.code(),
            "Evaluated transfer"
        );
        Ok(code)
    }

    fn set_permission(
        &self,
        caller: Address,
        token: Address,
        participant: Address,
        permission: Permission,
    ) -> PolicyResult<()> {
        self.mutate(caller, Role::Admin, "set_permission", |state| {
            let old = state
                .token_mut(token)
                .permissions
                .insert(participant, permission)
                .unwrap_or_default();
            tracing::debug!(%token, %participant, %permission, "Permission set");
            Ok(ComplianceEvent::PermissionChanged {
                token,
                participant,
                old,
                new: permission,
                actor: caller,
            })
        })
    }

    fn set_locked(&self, caller: Address, token: Address, locked: bool) -> PolicyResult<()> {
        self.mutate(caller, Role::Owner, "set_locked", |state| {
            let old = std::mem::replace(&mut state.token_mut(token).locked, locked);
            tracing::info!(%token, old, locked, "Token lock state changed");
            Ok(ComplianceEvent::LockStateChanged {
                token,
                old,
                locked,
                actor: caller,
            })
        })
    }

    fn set_partial_transfers(
        &self,
        caller: Address,
        token: Address,
        enabled: bool,
    ) -> PolicyResult<()> {
        self.mutate(caller, Role::Owner, "set_partial_transfers", |state| {
            let old = std::mem::replace(&mut state.token_mut(token).partial_transfers, enabled);
            tracing::debug!(%token, old, enabled, "Partial transfers changed");
            Ok(ComplianceEvent::PartialTransferStateChanged {
                token,
                old,
                enabled,
                actor: caller,
            })
        })
    }

    fn set_holding_period(
        &self,
        caller: Address,
        token: Address,
        participant: Address,
        start: u64,
    ) -> PolicyResult<()> {
        self.mutate(caller, Role::Admin, "set_holding_period", |state| {
            let old = state
                .token_mut(token)
                .holding_period_start
                .insert(participant, start);
            tracing::debug!(%token, %participant, start, "Holding period set");
            Ok(ComplianceEvent::HoldingPeriodChanged {
                token,
                participant,
                old,
                start,
                actor: caller,
            })
        })
    }

    fn transfer_admin(&self, caller: Address, new_admin: Address) -> PolicyResult<()> {
        self.mutate(caller, Role::Owner, "transfer_admin", |state| {
            if new_admin == Address::ZERO {
                return Err(AccessError::null_identity(Role::Admin));
            }
            let old = std::mem::replace(&mut state.admin, new_admin);
            tracing::info!(old = %old, new = %new_admin, "Policy store admin changed");
            Ok(ComplianceEvent::AdminChanged {
                old,
                new: new_admin,
            })
        })
    }

    fn transfer_ownership(&self, caller: Address, new_owner: Address) -> PolicyResult<()> {
        let contract = self.address;
        self.mutate(caller, Role::Owner, "transfer_ownership", |state| {
            if new_owner == Address::ZERO {
                return Err(AccessError::null_identity(Role::Owner));
            }
            let old = std::mem::replace(&mut state.owner, new_owner);
            tracing::info!(old = %old, new = %new_owner, "Policy store ownership transferred");
            Ok(ComplianceEvent::OwnershipTransferred {
                contract,
                old,
                new: new_owner,
            })
        })
    }

    fn is_locked(&self, token: Address) -> PolicyResult<bool> {
        let state = self.read_state("is_locked")?;
        Ok(state.tokens.get(&token).is_some_and(|r| r.locked))
    }

    fn partial_transfers_enabled(&self, token: Address) -> PolicyResult<bool> {
        let state = self.read_state("partial_transfers_enabled")?;
        Ok(state.tokens.get(&token).is_some_and(|r| r.partial_transfers))
    }

    fn permission(&self, token: Address, participant: Address) -> PolicyResult<Permission> {
        let state = self.read_state("permission")?;
        Ok(Self::permission_in(state.tokens.get(&token), participant))
    }

    fn holding_period_start(
        &self,
        token: Address,
        participant: Address,
    ) -> PolicyResult<Option<u64>> {
        let state = self.read_state("holding_period_start")?;
        Ok(state
            .tokens
            .get(&token)
            .and_then(|r| r.holding_period_start.get(&participant).copied()))
    }
}
