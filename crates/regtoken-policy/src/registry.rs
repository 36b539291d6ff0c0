//! Stable indirection to the active policy store.
//!
//! Tokens bind to a [`PolicyRegistry`] once and resolve the store on every
//! call, so the owner can upgrade the policy implementation without touching
//! any issued token.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use regtoken_core::error::{AccessError, PolicyError, PolicyResult};
use regtoken_core::events::{ComplianceEvent, EventSink, NullSink};
use regtoken_core::types::Role;
use regtoken_core::Address;

use crate::store::PolicyStore;

struct RegistryState {
    owner: Address,
    store: Arc<dyn PolicyStore>,
}

/// Holds the single current-store pointer.
pub struct PolicyRegistry {
    address: Address,
    sink: Arc<dyn EventSink>,
    state: RwLock<RegistryState>,
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.current_store_address().ok();
        f.debug_struct("PolicyRegistry")
            .field("address", &self.address)
            .field("store", &store)
            .finish_non_exhaustive()
    }
}

impl PolicyRegistry {
    /// Deploy a registry pointing at `initial`; `deployer` becomes owner.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::NullStore`] or [`PolicyError::NonConformingStore`]
    /// when `initial` would be rejected by [`PolicyRegistry::replace_store`].
    pub fn new(
        address: Address,
        deployer: Address,
        initial: Arc<dyn PolicyStore>,
    ) -> PolicyResult<Self> {
        validate_store(initial.as_ref())?;
        Ok(Self {
            address,
            sink: Arc::new(NullSink),
            state: RwLock::new(RegistryState {
                owner: deployer,
                store: initial,
            }),
        })
    }

    /// Deliver events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Address this registry is deployed at.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Current owner.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable.
    pub fn owner(&self) -> PolicyResult<Address> {
        Ok(self.read_state()?.owner)
    }

    /// The store every query should be routed to right now.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable.
    pub fn current_store(&self) -> PolicyResult<Arc<dyn PolicyStore>> {
        Ok(Arc::clone(&self.read_state()?.store))
    }

    /// Address of the active store.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StatePoisoned`] if state is unavailable.
    pub fn current_store_address(&self) -> PolicyResult<Address> {
        Ok(self.read_state()?.store.address())
    }

    /// Point the registry at `new_store`. Owner only.
    ///
    /// The candidate must have a non-null address and answer its canary
    /// [`PolicyStore::probe`] before the swap is committed.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthorized`], [`PolicyError::NullStore`] or
    /// [`PolicyError::NonConformingStore`]; the previous store stays active.
    pub fn replace_store(&self, caller: Address, new_store: Arc<dyn PolicyStore>) -> PolicyResult<()> {
        let mut state = self.write_state()?;
        if caller != state.owner {
            tracing::warn!(%caller, "Rejected store replacement from non-owner");
            return Err(AccessError::unauthorized(caller, Role::Owner).into());
        }
        if let Err(e) = validate_store(new_store.as_ref()) {
            tracing::warn!(store = %new_store.address(), error = %e, "Rejected policy store");
            return Err(e);
        }

        let old = state.store.address();
        let new = new_store.address();
        state.store = new_store;
        tracing::info!(old = %old, new = %new, "Policy store replaced");
        self.sink.emit(ComplianceEvent::StoreReplaced { old, new });
        Ok(())
    }

    /// Hand the owner role to `new_owner`. Owner only.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthorized`] for any other caller and
    /// [`AccessError::NullIdentity`] when `new_owner` is the null address.
    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> PolicyResult<()> {
        let mut state = self.write_state()?;
        if caller != state.owner {
            return Err(AccessError::unauthorized(caller, Role::Owner).into());
        }
        if new_owner == Address::ZERO {
            return Err(AccessError::null_identity(Role::Owner).into());
        }
        let old = std::mem::replace(&mut state.owner, new_owner);
        tracing::info!(old = %old, new = %new_owner, "Registry ownership transferred");
        self.sink.emit(ComplianceEvent::OwnershipTransferred {
            contract: self.address,
            old,
            new: new_owner,
        });
        Ok(())
    }

    fn read_state(&self) -> PolicyResult<RwLockReadGuard<'_, RegistryState>> {
        self.state
            .read()
            .map_err(|_| PolicyError::poisoned("registry read lock"))
    }

    fn write_state(&self) -> PolicyResult<RwLockWriteGuard<'_, RegistryState>> {
        self.state
            .write()
            .map_err(|_| PolicyError::poisoned("registry write lock"))
    }
}

fn validate_store(store: &dyn PolicyStore) -> PolicyResult<()> {
    let address = store.address();
    if address == Address::ZERO {
        return Err(PolicyError::NullStore);
    }
    store
        .probe()
        .map(|_| ())
        .map_err(|e| PolicyError::non_conforming(address, e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::store::DefaultPolicyStore;
    use regtoken_core::events::EventLog;
    use regtoken_core::types::{Permission, RestrictionCode, TransferRequest};
    use regtoken_core::U256;

    fn owner() -> Address {
        Address::with_last_byte(1)
    }

    fn stranger() -> Address {
        Address::with_last_byte(9)
    }

    fn store_at(byte: u8) -> Arc<dyn PolicyStore> {
        Arc::new(DefaultPolicyStore::new(Address::with_last_byte(byte), owner()))
    }

    fn registry(events: &EventLog) -> PolicyRegistry {
        PolicyRegistry::new(Address::with_last_byte(0x60), owner(), store_at(0x50))
            .unwrap()
            .with_sink(Arc::new(events.clone()))
    }

    /// A store whose every query fails.
    struct BrokenStore;

    impl PolicyStore for BrokenStore {
        fn address(&self) -> Address {
            Address::with_last_byte(0x66)
        }
        fn owner(&self) -> PolicyResult<Address> {
            Err(PolicyError::poisoned("broken"))
        }
        fn admin(&self) -> PolicyResult<Address> {
            Err(PolicyError::poisoned("broken"))
        }
        fn evaluate(&self, _request: &TransferRequest) -> PolicyResult<RestrictionCode> {
            Err(PolicyError::poisoned("broken"))
        }
        fn set_permission(&self, _: Address, _: Address, _: Address, _: Permission) -> PolicyResult<()> {
            Err(PolicyError::poisoned("broken"))
        }
        fn set_locked(&self, _: Address, _: Address, _: bool) -> PolicyResult<()> {
            Err(PolicyError::poisoned("broken"))
        }
        fn set_partial_transfers(&self, _: Address, _: Address, _: bool) -> PolicyResult<()> {
            Err(PolicyError::poisoned("broken"))
        }
        fn set_holding_period(&self, _: Address, _: Address, _: Address, _: u64) -> PolicyResult<()> {
            Err(PolicyError::poisoned("broken"))
        }
        fn transfer_admin(&self, _: Address, _: Address) -> PolicyResult<()> {
            Err(PolicyError::poisoned("broken"))
        }
        fn transfer_ownership(&self, _: Address, _: Address) -> PolicyResult<()> {
            Err(PolicyError::poisoned("broken"))
        }
        fn is_locked(&self, _: Address) -> PolicyResult<bool> {
            Err(PolicyError::poisoned("broken"))
        }
        fn partial_transfers_enabled(&self, _: Address) -> PolicyResult<bool> {
            Err(PolicyError::poisoned("broken"))
        }
        fn permission(&self, _: Address, _: Address) -> PolicyResult<Permission> {
            Err(PolicyError::poisoned("broken"))
        }
        fn holding_period_start(&self, _: Address, _: Address) -> PolicyResult<Option<u64>> {
            Err(PolicyError::poisoned("broken"))
        }
    }

    #[test]
    fn test_new_points_at_initial_store() {
        let events = EventLog::new();
        let registry = registry(&events);
        assert_eq!(registry.current_store_address().unwrap(), Address::with_last_byte(0x50));
        assert_eq!(registry.owner().unwrap(), owner());
        assert!(events.is_empty());
    }

    #[test]
    fn test_new_rejects_null_store() {
        let result = PolicyRegistry::new(Address::with_last_byte(0x60), owner(), store_at(0));
        assert!(matches!(result, Err(PolicyError::NullStore)));
    }

    #[test]
    fn test_new_rejects_non_conforming_store() {
        let result = PolicyRegistry::new(Address::with_last_byte(0x60), owner(), Arc::new(BrokenStore));
        assert!(matches!(result, Err(PolicyError::NonConformingStore { .. })));
    }

    #[test]
    fn test_replace_store_swaps_and_emits() {
        let events = EventLog::new();
        let registry = registry(&events);

        registry.replace_store(owner(), store_at(0x51)).unwrap();

        assert_eq!(registry.current_store_address().unwrap(), Address::with_last_byte(0x51));
        assert_eq!(
            events.events(),
            vec![ComplianceEvent::StoreReplaced {
                old: Address::with_last_byte(0x50),
                new: Address::with_last_byte(0x51),
            }]
        );
    }

    #[test]
    fn test_replace_store_rejections_keep_previous_store() {
        let events = EventLog::new();
        let registry = registry(&events);

        assert_eq!(
            registry.replace_store(stranger(), store_at(0x51)).unwrap_err(),
            PolicyError::Access(AccessError::unauthorized(stranger(), Role::Owner))
        );
        assert_eq!(
            registry.replace_store(owner(), store_at(0)).unwrap_err(),
            PolicyError::NullStore
        );
        assert!(matches!(
            registry.replace_store(owner(), Arc::new(BrokenStore)),
            Err(PolicyError::NonConformingStore { address, .. }) if address == Address::with_last_byte(0x66)
        ));

        assert_eq!(registry.current_store_address().unwrap(), Address::with_last_byte(0x50));
        assert!(events.is_empty());
    }

    #[test]
    fn test_resolution_follows_replacement() {
        let events = EventLog::new();
        let registry = registry(&events);
        let token = Address::with_last_byte(0xaa);
        let request = TransferRequest::new(token, 0, owner(), stranger(), U256::from(1_000_000_000_000u64));

        let before = registry.current_store().unwrap();
        assert_eq!(before.evaluate(&request).unwrap(), RestrictionCode::SendNotAllowed);

        let permissive = DefaultPolicyStore::new(Address::with_last_byte(0x51), owner());
        permissive.set_permission(owner(), token, owner(), Permission::SEND).unwrap();
        permissive.set_permission(owner(), token, stranger(), Permission::RECEIVE).unwrap();
        registry.replace_store(owner(), Arc::new(permissive)).unwrap();

        let after = registry.current_store().unwrap();
        assert_eq!(after.evaluate(&request).unwrap(), RestrictionCode::Success);
    }

    #[test]
    fn test_transfer_ownership() {
        let events = EventLog::new();
        let registry = registry(&events);

        assert!(registry.transfer_ownership(stranger(), stranger()).is_err());
        assert_eq!(
            registry.transfer_ownership(owner(), Address::ZERO).unwrap_err(),
            PolicyError::Access(AccessError::null_identity(Role::Owner))
        );
        assert!(events.is_empty());

        registry.transfer_ownership(owner(), stranger()).unwrap();
        assert_eq!(registry.owner().unwrap(), stranger());
        assert!(registry.replace_store(owner(), store_at(0x51)).is_err());
        registry.replace_store(stranger(), store_at(0x51)).unwrap();
        assert_eq!(events.names(), vec!["ownership-transferred", "store-replaced"]);
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PolicyRegistry>();
    }
}
