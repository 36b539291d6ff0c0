//! Standard fungible-token bookkeeping.
//!
//! [`Ledger`] knows nothing about compliance. It validates every operation in
//! full before touching a balance, so an `Err` always leaves it unchanged, and
//! returns the events the operation produced for the caller to publish.

use std::collections::HashMap;

use regtoken_core::error::{AccessError, LedgerError, LedgerResult};
use regtoken_core::events::ComplianceEvent;
use regtoken_core::types::Role;
use regtoken_core::{Address, U256};

/// Default number of decimals, as for ether.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Balances, allowances and supply of one token.
#[derive(Debug, Clone)]
pub struct Ledger {
    token: Address,
    name: String,
    symbol: String,
    decimals: u8,
    owner: Address,
    total_supply: U256,
    minting_finished: bool,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl Ledger {
    /// Empty ledger for `token`, owned by `owner`, with [`DEFAULT_DECIMALS`].
    #[must_use]
    pub fn new(
        token: Address,
        owner: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            token,
            name: name.into(),
            symbol: symbol.into(),
            decimals: DEFAULT_DECIMALS,
            owner,
            total_supply: U256::ZERO,
            minting_finished: false,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Override the number of decimals.
    #[must_use]
    pub const fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    /// Token address.
    #[must_use]
    pub const fn token(&self) -> Address {
        self.token
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ticker symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Decimal places.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Current owner.
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Total supply in base units.
    #[must_use]
    pub const fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Whether minting has been closed for good.
    #[must_use]
    pub const fn minting_finished(&self) -> bool {
        self.minting_finished
    }

    /// Balance of `account`.
    #[must_use]
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Remaining amount `spender` may move out of `owner`'s balance.
    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ZeroAddress`] for a null recipient,
    /// [`LedgerError::InsufficientBalance`] or [`LedgerError::Overflow`].
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> LedgerResult<Vec<ComplianceEvent>> {
        self.move_balance(from, to, amount)?;
        Ok(vec![self.transfer_event(from, to, amount)])
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    ///
    /// # Errors
    ///
    /// As [`Ledger::transfer`], plus [`LedgerError::InsufficientAllowance`].
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> LedgerResult<Vec<ComplianceEvent>> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                spender,
                allowance,
                required: amount,
            });
        }
        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, spender), allowance - amount);
        Ok(vec![self.transfer_event(from, to, amount)])
    }

    /// Set the allowance of `spender` over `owner`'s balance.
    ///
    /// Any spender is accepted, the null address included.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the mutator signatures uniform.
    pub fn approve(
        &mut self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> LedgerResult<Vec<ComplianceEvent>> {
        self.allowances.insert((owner, spender), amount);
        Ok(vec![self.approval_event(owner, spender, amount)])
    }

    /// Raise an allowance by `added`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Overflow`].
    pub fn increase_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        added: U256,
    ) -> LedgerResult<Vec<ComplianceEvent>> {
        let current = self.allowance(owner, spender);
        let updated = current
            .checked_add(added)
            .ok_or(LedgerError::overflow("increase_allowance"))?;
        self.approve(owner, spender, updated)
    }

    /// Lower an allowance by `subtracted`, stopping at zero.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn decrease_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        subtracted: U256,
    ) -> LedgerResult<Vec<ComplianceEvent>> {
        let updated = self.allowance(owner, spender).saturating_sub(subtracted);
        self.approve(owner, spender, updated)
    }

    /// Create `amount` new tokens for `to`. Owner only, until minting is finished.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unauthorized`], [`LedgerError::MintingFinished`],
    /// [`LedgerError::ZeroAddress`] or [`LedgerError::Overflow`].
    pub fn mint(
        &mut self,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> LedgerResult<Vec<ComplianceEvent>> {
        self.only_owner(caller)?;
        if self.minting_finished {
            return Err(LedgerError::MintingFinished);
        }
        if to == Address::ZERO {
            return Err(LedgerError::zero_address("mint recipient"));
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::overflow("mint"))?;
        // Every balance is bounded by the supply, so this cannot overflow.
        let balance = self.balance_of(to) + amount;

        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(vec![
            ComplianceEvent::Mint {
                token: self.token,
                to,
                amount,
            },
            self.transfer_event(Address::ZERO, to, amount),
        ])
    }

    /// Close minting permanently. Owner only.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unauthorized`] or [`LedgerError::MintingFinished`] if
    /// already closed.
    pub fn finish_minting(&mut self, caller: Address) -> LedgerResult<Vec<ComplianceEvent>> {
        self.only_owner(caller)?;
        if self.minting_finished {
            return Err(LedgerError::MintingFinished);
        }
        self.minting_finished = true;
        Ok(vec![ComplianceEvent::MintFinished { token: self.token }])
    }

    /// Destroy `amount` of the caller's own balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`].
    pub fn burn(&mut self, caller: Address, amount: U256) -> LedgerResult<Vec<ComplianceEvent>> {
        let balance = self.balance_of(caller);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                account: caller,
                balance,
                required: amount,
            });
        }
        self.balances.insert(caller, balance - amount);
        self.total_supply -= amount;
        Ok(vec![
            ComplianceEvent::Burn {
                token: self.token,
                burner: caller,
                amount,
            },
            self.transfer_event(caller, Address::ZERO, amount),
        ])
    }

    /// Hand ownership to `new_owner`. Owner only.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unauthorized`] or [`AccessError::NullIdentity`].
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> LedgerResult<Vec<ComplianceEvent>> {
        self.only_owner(caller)?;
        if new_owner == Address::ZERO {
            return Err(AccessError::null_identity(Role::Owner).into());
        }
        let old = std::mem::replace(&mut self.owner, new_owner);
        Ok(vec![ComplianceEvent::OwnershipTransferred {
            contract: self.token,
            old,
            new: new_owner,
        }])
    }

    fn only_owner(&self, caller: Address) -> Result<(), AccessError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(AccessError::unauthorized(caller, Role::Owner))
        }
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> LedgerResult<()> {
        if to == Address::ZERO {
            return Err(LedgerError::zero_address("recipient"));
        }
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                balance: from_balance,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::overflow("transfer"))?;

        self.balances.insert(from, from_balance - amount);
        self.balances.insert(to, to_balance);
        Ok(())
    }

    const fn transfer_event(&self, from: Address, to: Address, amount: U256) -> ComplianceEvent {
        ComplianceEvent::Transfer {
            token: self.token,
            from,
            to,
            amount,
        }
    }

    const fn approval_event(&self, owner: Address, spender: Address, amount: U256) -> ComplianceEvent {
        ComplianceEvent::Approval {
            token: self.token,
            owner,
            spender,
            amount,
        }
    }
}
