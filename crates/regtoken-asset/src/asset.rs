//! ERC-1404 style restricted asset.
//!
//! A [`RestrictedAsset`] wraps a [`Ledger`] with a compliance gate: every
//! balance-changing transfer is first evaluated by the policy store the bound
//! [`PolicyRegistry`] currently points at. A non-success verdict aborts the
//! transfer with [`AssetError::Restricted`] after publishing a
//! `restriction-detected` event; the ledger is left exactly as it was.
//!
//! Wallets and exchanges can pre-flight a transfer with
//! [`RestrictedAsset::detect_transfer_restriction`] and turn the code into a
//! sentence with [`RestrictedAsset::message_for_transfer_restriction`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use regtoken_asset::RestrictedAsset;
//! use regtoken_core::{Address, Permission, RestrictionCode, U256};
//! use regtoken_policy::{DefaultPolicyStore, PolicyRegistry, PolicyStore};
//!
//! let operator = Address::with_last_byte(1);
//! let holder = Address::with_last_byte(2);
//! let store = Arc::new(DefaultPolicyStore::new(Address::with_last_byte(0x50), operator));
//! let registry = Arc::new(
//!     PolicyRegistry::new(Address::with_last_byte(0x60), operator, store.clone()).unwrap(),
//! );
//! let asset = RestrictedAsset::new(Address::with_last_byte(0xaa), registry, operator, "R-Token", "RTKN");
//!
//! let one = U256::from(10u64).pow(U256::from(18u8));
//! asset.mint(operator, operator, one).unwrap();
//! assert_eq!(
//!     asset.detect_transfer_restriction(operator, holder, one).unwrap(),
//!     RestrictionCode::SendNotAllowed
//! );
//!
//! store.set_permission(operator, asset.address(), operator, Permission::SEND).unwrap();
//! store.set_permission(operator, asset.address(), holder, Permission::RECEIVE).unwrap();
//! asset.transfer(operator, holder, one).unwrap();
//! assert_eq!(asset.balance_of(holder).unwrap(), one);
//! ```

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use regtoken_core::error::{AssetError, AssetResult, LedgerError};
use regtoken_core::events::{ComplianceEvent, EventSink, NullSink};
use regtoken_core::types::{RestrictionCode, TransferRequest};
use regtoken_core::{Address, U256};
use regtoken_policy::PolicyRegistry;

use crate::ledger::Ledger;

/// A token whose transfers are gated by a policy registry.
pub struct RestrictedAsset {
    address: Address,
    registry: Arc<PolicyRegistry>,
    ledger: RwLock<Ledger>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for RestrictedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestrictedAsset")
            .field("address", &self.address)
            .field("registry", &self.registry.address())
            .finish_non_exhaustive()
    }
}

impl RestrictedAsset {
    /// Issue a token at `address` bound to `registry`; `deployer` owns it.
    #[must_use]
    pub fn new(
        address: Address,
        registry: Arc<PolicyRegistry>,
        deployer: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self::with_ledger(registry, Ledger::new(address, deployer, name, symbol))
    }

    /// Issue a token around an existing ledger; the ledger's token address is used.
    #[must_use]
    pub fn with_ledger(registry: Arc<PolicyRegistry>, ledger: Ledger) -> Self {
        Self {
            address: ledger.token(),
            registry,
            ledger: RwLock::new(ledger),
            sink: Arc::new(NullSink),
        }
    }

    /// Deliver events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Token address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The registry this token resolves its policy through.
    #[must_use]
    pub fn registry(&self) -> &Arc<PolicyRegistry> {
        &self.registry
    }

    // ------------------------------------------------------------------------
    // Compliance queries
    // ------------------------------------------------------------------------

    /// Pre-flight a transfer of `amount` from `from` to `to` without executing it.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Policy`] if the policy layer cannot be consulted.
    /// Restrictions are `Ok` values.
    pub fn detect_transfer_restriction(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> AssetResult<RestrictionCode> {
        let decimals = self.read_ledger("detect_transfer_restriction")?.decimals();
        let request = TransferRequest::new(self.address, decimals, from, to, amount);
        self.evaluate(&request)
    }

    /// Fixed sentence for a restriction code; unknown values get a generic message.
    #[must_use]
    pub const fn message_for_transfer_restriction(code: u8) -> &'static str {
        RestrictionCode::message_for(code)
    }

    // ------------------------------------------------------------------------
    // Gated transfers
    // ------------------------------------------------------------------------

    /// Move `amount` of the caller's balance to `to`.
    ///
    /// # Errors
    ///
    /// [`AssetError::Restricted`] when the policy refuses, otherwise any
    /// [`LedgerError`]. In both cases no balance changes.
    pub fn transfer(&self, caller: Address, to: Address, amount: U256) -> AssetResult<()> {
        let mut ledger = self.write_ledger("transfer")?;
        let request = TransferRequest::new(self.address, ledger.decimals(), caller, to, amount);
        self.enforce(&request)?;
        let events = ledger.transfer(caller, to, amount)?;
        self.publish(events);
        Ok(())
    }

    /// Move `amount` from `from` to `to` using the allowance granted to `spender`.
    ///
    /// # Errors
    ///
    /// As [`RestrictedAsset::transfer`], plus insufficient allowance.
    pub fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> AssetResult<()> {
        let mut ledger = self.write_ledger("transfer_from")?;
        let request = TransferRequest::new(self.address, ledger.decimals(), from, to, amount)
            .with_initiator(spender);
        self.enforce(&request)?;
        let events = ledger.transfer_from(spender, from, to, amount)?;
        self.publish(events);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Ungated ledger operations
    // ------------------------------------------------------------------------

    /// Set the allowance of `spender` over the caller's balance.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`].
    pub fn approve(&self, caller: Address, spender: Address, amount: U256) -> AssetResult<()> {
        self.apply("approve", |ledger| ledger.approve(caller, spender, amount))
    }

    /// Raise the allowance of `spender` by `added`.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`].
    pub fn increase_allowance(
        &self,
        caller: Address,
        spender: Address,
        added: U256,
    ) -> AssetResult<()> {
        self.apply("increase_allowance", |ledger| {
            ledger.increase_allowance(caller, spender, added)
        })
    }

    /// Lower the allowance of `spender` by `subtracted`.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`].
    pub fn decrease_allowance(
        &self,
        caller: Address,
        spender: Address,
        subtracted: U256,
    ) -> AssetResult<()> {
        self.apply("decrease_allowance", |ledger| {
            ledger.decrease_allowance(caller, spender, subtracted)
        })
    }

    /// Mint `amount` to `to`. Owner only, until minting is finished.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`].
    pub fn mint(&self, caller: Address, to: Address, amount: U256) -> AssetResult<()> {
        self.apply("mint", |ledger| ledger.mint(caller, to, amount))
    }

    /// Close minting permanently. Owner only.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`].
    pub fn finish_minting(&self, caller: Address) -> AssetResult<()> {
        self.apply("finish_minting", |ledger| ledger.finish_minting(caller))
    }

    /// Burn `amount` of the caller's own balance.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`].
    pub fn burn(&self, caller: Address, amount: U256) -> AssetResult<()> {
        self.apply("burn", |ledger| ledger.burn(caller, amount))
    }

    /// Hand token ownership to `new_owner`. Owner only.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`].
    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> AssetResult<()> {
        self.apply("transfer_ownership", |ledger| {
            ledger.transfer_ownership(caller, new_owner)
        })
    }

    // ------------------------------------------------------------------------
    // Ledger queries
    // ------------------------------------------------------------------------

    /// Balance of `account`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StatePoisoned`] if the ledger is unavailable.
    pub fn balance_of(&self, account: Address) -> AssetResult<U256> {
        Ok(self.read_ledger("balance_of")?.balance_of(account))
    }

    /// Total supply.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StatePoisoned`] if the ledger is unavailable.
    pub fn total_supply(&self) -> AssetResult<U256> {
        Ok(self.read_ledger("total_supply")?.total_supply())
    }

    /// Remaining allowance of `spender` over `owner`'s balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StatePoisoned`] if the ledger is unavailable.
    pub fn allowance(&self, owner: Address, spender: Address) -> AssetResult<U256> {
        Ok(self.read_ledger("allowance")?.allowance(owner, spender))
    }

    /// Display name.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StatePoisoned`] if the ledger is unavailable.
    pub fn name(&self) -> AssetResult<String> {
        Ok(self.read_ledger("name")?.name().to_string())
    }

    /// Ticker symbol.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StatePoisoned`] if the ledger is unavailable.
    pub fn symbol(&self) -> AssetResult<String> {
        Ok(self.read_ledger("symbol")?.symbol().to_string())
    }

    /// Decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StatePoisoned`] if the ledger is unavailable.
    pub fn decimals(&self) -> AssetResult<u8> {
        Ok(self.read_ledger("decimals")?.decimals())
    }

    /// Current token owner.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StatePoisoned`] if the ledger is unavailable.
    pub fn owner(&self) -> AssetResult<Address> {
        Ok(self.read_ledger("owner")?.owner())
    }

    /// Whether minting has been closed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StatePoisoned`] if the ledger is unavailable.
    pub fn minting_finished(&self) -> AssetResult<bool> {
        Ok(self.read_ledger("minting_finished")?.minting_finished())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn evaluate(&self, request: &TransferRequest) -> AssetResult<RestrictionCode> {
        let store = self.registry.current_store()?;
        Ok(store.evaluate(request)?)
    }

    /// Evaluate `request` and turn any restriction into an abort.
    fn enforce(&self, request: &TransferRequest) -> AssetResult<()> {
        let code = self.evaluate(request)?;
        if code.is_success() {
            return Ok(());
        }

        tracing::warn!(
            token = %self.address,
            from = %request.from,
            to = %request.to,
            amount = %request.amount,
            code = code.code(),
            reason = code.message(),
            "Transfer restricted"
        );
        self.sink.emit(ComplianceEvent::RestrictionDetected {
            token: self.address,
            from: request.from,
            to: request.to,
            amount: request.amount,
            code,
        });
        Err(AssetError::restricted(code))
    }

    fn apply<F>(&self, context: &str, op: F) -> AssetResult<()>
    where
        F: FnOnce(&mut Ledger) -> Result<Vec<ComplianceEvent>, LedgerError>,
    {
        let mut ledger = self.write_ledger(context)?;
        let events = op(&mut ledger)?;
        self.publish(events);
        Ok(())
    }

    fn publish(&self, events: Vec<ComplianceEvent>) {
        for event in events {
            tracing::debug!(token = %self.address, event = event.name(), "Ledger event");
            self.sink.emit(event);
        }
    }

    fn read_ledger(&self, context: &str) -> AssetResult<RwLockReadGuard<'_, Ledger>> {
        self.ledger
            .read()
            .map_err(|_| LedgerError::poisoned(format!("ledger read lock ({context})")).into())
    }

    fn write_ledger(&self, context: &str) -> AssetResult<RwLockWriteGuard<'_, Ledger>> {
        self.ledger
            .write()
            .map_err(|_| LedgerError::poisoned(format!("ledger write lock ({context})")).into())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use regtoken_core::events::EventLog;
    use regtoken_core::types::Permission;
    use regtoken_policy::{DefaultPolicyStore, PolicyStore};

    fn operator() -> Address {
        Address::with_last_byte(1)
    }

    fn holder() -> Address {
        Address::with_last_byte(2)
    }

    fn spender() -> Address {
        Address::with_last_byte(3)
    }

    fn whole() -> U256 {
        U256::from(1_000_000_000_000_000_000u128)
    }

    struct Fixture {
        store: Arc<DefaultPolicyStore>,
        asset: RestrictedAsset,
        events: EventLog,
    }

    fn fixture() -> Fixture {
        let events = EventLog::new();
        let store = Arc::new(DefaultPolicyStore::new(Address::with_last_byte(0x50), operator()));
        let registry = Arc::new(
            PolicyRegistry::new(Address::with_last_byte(0x60), operator(), store.clone()).unwrap(),
        );
        let asset = RestrictedAsset::new(Address::with_last_byte(0xaa), registry, operator(), "R-Token", "RTKN")
            .with_sink(Arc::new(events.clone()));
        asset.mint(operator(), operator(), whole() * U256::from(100u8)).unwrap();
        events.clear();
        Fixture { store, asset, events }
    }

    fn allow_operator_to_holder(f: &Fixture) {
        let token = f.asset.address();
        f.store.set_permission(operator(), token, operator(), Permission::SEND).unwrap();
        f.store.set_permission(operator(), token, holder(), Permission::RECEIVE).unwrap();
    }

    #[test]
    fn test_message_lookup() {
        assert_eq!(RestrictedAsset::message_for_transfer_restriction(0), "Success");
        assert_eq!(RestrictedAsset::message_for_transfer_restriction(1), "Token is locked");
        assert_eq!(
            RestrictedAsset::message_for_transfer_restriction(99),
            "Unknown restriction code"
        );
    }

    #[test]
    fn test_restricted_transfer_aborts_and_emits_diagnostic() {
        let f = fixture();
        let before = f.asset.balance_of(operator()).unwrap();

        let err = f.asset.transfer(operator(), holder(), whole()).unwrap_err();
        assert_eq!(err, AssetError::restricted(RestrictionCode::SendNotAllowed));

        assert_eq!(f.asset.balance_of(operator()).unwrap(), before);
        assert_eq!(f.asset.balance_of(holder()).unwrap(), U256::ZERO);
        assert_eq!(
            f.events.events(),
            vec![ComplianceEvent::RestrictionDetected {
                token: f.asset.address(),
                from: operator(),
                to: holder(),
                amount: whole(),
                code: RestrictionCode::SendNotAllowed,
            }]
        );
    }

    #[test]
    fn test_allowed_transfer_moves_balance() {
        let f = fixture();
        allow_operator_to_holder(&f);

        f.asset.transfer(operator(), holder(), whole()).unwrap();

        assert_eq!(f.asset.balance_of(holder()).unwrap(), whole());
        assert_eq!(f.events.names(), vec!["transfer"]);
    }

    #[test]
    fn test_ledger_error_after_policy_success() {
        let f = fixture();
        allow_operator_to_holder(&f);
        let too_much = whole() * U256::from(101u8);

        let err = f.asset.transfer(operator(), holder(), too_much).unwrap_err();
        assert!(matches!(err, AssetError::Ledger(LedgerError::InsufficientBalance { .. })));
        assert!(f.events.is_empty());
    }

    #[test]
    fn test_transfer_from_is_gated_on_owner_of_funds() {
        let f = fixture();
        f.asset.approve(operator(), spender(), whole()).unwrap();
        f.events.clear();

        // The spender has no permission of its own; only `from` and `to` matter.
        allow_operator_to_holder(&f);
        f.asset.transfer_from(spender(), operator(), holder(), whole()).unwrap();
        assert_eq!(f.asset.balance_of(holder()).unwrap(), whole());
        assert_eq!(f.asset.allowance(operator(), spender()).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_restricted_transfer_from_keeps_allowance() {
        let f = fixture();
        f.asset.approve(operator(), spender(), whole()).unwrap();
        f.store.set_locked(operator(), f.asset.address(), true).unwrap();

        let err = f.asset.transfer_from(spender(), operator(), holder(), whole()).unwrap_err();
        assert_eq!(err, AssetError::restricted(RestrictionCode::Locked));
        assert_eq!(f.asset.allowance(operator(), spender()).unwrap(), whole());
    }

    #[test]
    fn test_detect_matches_transfer_outcome() {
        let f = fixture();
        allow_operator_to_holder(&f);
        let fractional = U256::from(100_000_000_000_000_000u128);

        let code = f.asset.detect_transfer_restriction(operator(), holder(), fractional).unwrap();
        assert_eq!(code, RestrictionCode::NotDivisible);
        assert_eq!(
            f.asset.transfer(operator(), holder(), fractional).unwrap_err(),
            AssetError::restricted(code)
        );
    }

    #[test]
    fn test_detect_has_no_side_effects() {
        let f = fixture();
        for _ in 0..5 {
            assert_eq!(
                f.asset.detect_transfer_restriction(operator(), holder(), whole()).unwrap(),
                RestrictionCode::SendNotAllowed
            );
        }
        assert!(f.events.is_empty());
    }

    #[test]
    fn test_metadata_and_minting_passthrough() {
        let f = fixture();
        assert_eq!(f.asset.name().unwrap(), "R-Token");
        assert_eq!(f.asset.symbol().unwrap(), "RTKN");
        assert_eq!(f.asset.decimals().unwrap(), 18);
        assert_eq!(f.asset.owner().unwrap(), operator());
        assert_eq!(f.asset.total_supply().unwrap(), whole() * U256::from(100u8));

        f.asset.finish_minting(operator()).unwrap();
        assert!(f.asset.minting_finished().unwrap());
        assert_eq!(
            f.asset.mint(operator(), holder(), whole()).unwrap_err(),
            AssetError::Ledger(LedgerError::MintingFinished)
        );
    }

    #[test]
    fn test_burn_is_not_gated() {
        let f = fixture();
        f.store.set_locked(operator(), f.asset.address(), true).unwrap();
        f.asset.burn(operator(), whole()).unwrap();
        assert_eq!(f.asset.total_supply().unwrap(), whole() * U256::from(99u8));
        assert_eq!(f.events.names(), vec!["burn", "transfer"]);
    }

    #[test]
    fn test_allowance_passthrough() {
        let f = fixture();
        f.asset.increase_allowance(operator(), spender(), U256::from(10u8)).unwrap();
        f.asset.decrease_allowance(operator(), spender(), U256::from(3u8)).unwrap();
        assert_eq!(f.asset.allowance(operator(), spender()).unwrap(), U256::from(7u8));
    }

    #[test]
    fn test_token_ownership_is_independent_of_store() {
        let f = fixture();
        f.asset.transfer_ownership(operator(), holder()).unwrap();
        assert_eq!(f.asset.owner().unwrap(), holder());
        assert_eq!(f.store.owner().unwrap(), operator());
    }
}
