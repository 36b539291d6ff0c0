//! Bootstrap a running system from a [`Config`].
//!
//! The operator deploys one [`DefaultPolicyStore`], a [`PolicyRegistry`]
//! pointing at it and one [`RestrictedAsset`] per configured token, then
//! applies each token's flags, participant permissions and lock-ups and
//! mints the configured balances.

use std::collections::BTreeMap;
use std::sync::Arc;

use regtoken_asset::{Ledger, RestrictedAsset};
use regtoken_core::config::{Config, TokenConfig};
use regtoken_core::error::{AssetError, Result};
use regtoken_core::{Address, EventSink, NullSink, Permission, RestrictionCode, U256};
use regtoken_policy::{Clock, DefaultPolicyStore, PolicyRegistry, PolicyStore, SystemClock};

/// Everything genesis deployed.
#[derive(Debug)]
pub struct System {
    operator: Address,
    store: Arc<DefaultPolicyStore>,
    registry: Arc<PolicyRegistry>,
    assets: BTreeMap<Address, RestrictedAsset>,
}

impl System {
    /// Deployer and initial owner of every component.
    #[must_use]
    pub const fn operator(&self) -> Address {
        self.operator
    }

    /// Policy store deployed at genesis.
    #[must_use]
    pub fn store(&self) -> &Arc<DefaultPolicyStore> {
        &self.store
    }

    /// Registry shared by all assets.
    #[must_use]
    pub fn registry(&self) -> &Arc<PolicyRegistry> {
        &self.registry
    }

    /// Asset at `token`, if configured.
    #[must_use]
    pub fn asset(&self, token: Address) -> Option<&RestrictedAsset> {
        self.assets.get(&token)
    }

    /// Asset at `token`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::UnknownToken`] when no such token was issued.
    pub fn require_asset(&self, token: Address) -> Result<&RestrictedAsset> {
        self.asset(token)
            .ok_or_else(|| AssetError::UnknownToken { token }.into())
    }

    /// All assets, ordered by address.
    pub fn assets(&self) -> impl Iterator<Item = &RestrictedAsset> {
        self.assets.values()
    }

    /// Pre-flight a transfer of `token`.
    ///
    /// # Errors
    ///
    /// Returns an error when `token` is unknown or state is poisoned.
    pub fn check(
        &self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<RestrictionCode> {
        Ok(self
            .require_asset(token)?
            .detect_transfer_restriction(from, to, amount)?)
    }
}

/// Genesis builder.
pub struct Genesis<'a> {
    config: &'a Config,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Genesis<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Genesis")
            .field("tokens", &self.config.tokens.len())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<'a> Genesis<'a> {
    /// Genesis on the system clock with events discarded.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            sink: Arc::new(NullSink),
        }
    }

    /// Evaluate holding periods against `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Deliver every event, genesis included, to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Validate the configuration and deploy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid config, or the first
    /// policy or ledger error raised while applying genesis state.
    pub fn build(self) -> Result<System> {
        self.config.validate()?;

        let deployment = &self.config.deployment;
        let operator = deployment.operator;

        let store = Arc::new(
            DefaultPolicyStore::new(deployment.store, operator)
                .with_config(self.config.policy.clone())
                .with_clock(Arc::clone(&self.clock))
                .with_sink(Arc::clone(&self.sink)),
        );
        let registry = Arc::new(
            PolicyRegistry::new(
                deployment.registry,
                operator,
                Arc::clone(&store) as Arc<dyn PolicyStore>,
            )?
            .with_sink(Arc::clone(&self.sink)),
        );

        let mut assets = BTreeMap::new();
        for token in &self.config.tokens {
            let asset = self.issue(operator, store.as_ref(), &registry, token)?;
            assets.insert(token.address, asset);
        }

        tracing::info!(
            operator = %operator,
            store = %store.address(),
            registry = %registry.address(),
            tokens = assets.len(),
            "Genesis complete"
        );

        Ok(System {
            operator,
            store,
            registry,
            assets,
        })
    }

    fn issue(
        &self,
        operator: Address,
        store: &DefaultPolicyStore,
        registry: &Arc<PolicyRegistry>,
        token: &TokenConfig,
    ) -> Result<RestrictedAsset> {
        let ledger = Ledger::new(token.address, operator, token.name.clone(), token.symbol.clone())
            .with_decimals(token.decimals);
        let asset = RestrictedAsset::with_ledger(Arc::clone(registry), ledger)
            .with_sink(Arc::clone(&self.sink));

        if token.locked {
            store.set_locked(operator, token.address, true)?;
        }
        if token.partial_transfers {
            store.set_partial_transfers(operator, token.address, true)?;
        }

        for participant in &token.participants {
            if participant.permission != Permission::NONE.bits() {
                store.set_permission(
                    operator,
                    token.address,
                    participant.address,
                    Permission::from_bits(participant.permission),
                )?;
            }
            if let Some(start) = participant.holding_period_start {
                store.set_holding_period(operator, token.address, participant.address, start)?;
            }
            if let Some(balance) = participant.balance.filter(|b| !b.is_zero()) {
                asset.mint(operator, participant.address, balance)?;
            }
        }

        tracing::debug!(
            token = %token.address,
            symbol = %token.symbol,
            participants = token.participants.len(),
            "Token issued"
        );
        Ok(asset)
    }
}
