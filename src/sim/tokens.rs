//! Fungible token balances for the simulated chain.

use std::collections::HashMap;

use crate::position::LedgerError;
use crate::types::{Address, Amount};

#[derive(Debug, Clone, Default)]
pub struct TokenBook {
    balances: HashMap<(Address, Address), Amount>,
    supplies: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address, Address), Amount>,
    decimals: HashMap<Address, u32>,
}

impl TokenBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, asset: Address, decimals: u32) {
        self.decimals.insert(asset, decimals);
    }

    pub fn decimals(&self, asset: Address) -> u32 {
        self.decimals.get(&asset).copied().unwrap_or(18)
    }

    pub fn balance_of(&self, asset: Address, holder: Address) -> Amount {
        self.balances.get(&(asset, holder)).copied().unwrap_or(0)
    }

    pub fn total_supply(&self, asset: Address) -> Amount {
        self.supplies.get(&asset).copied().unwrap_or(0)
    }

    pub fn mint(&mut self, asset: Address, to: Address, amount: Amount) {
        *self.balances.entry((asset, to)).or_insert(0) += amount;
        *self.supplies.entry(asset).or_insert(0) += amount;
    }

    pub fn burn(&mut self, asset: Address, from: Address, amount: Amount) -> Result<(), LedgerError> {
        self.debit(asset, from, amount)?;
        if let Some(supply) = self.supplies.get_mut(&asset) {
            *supply = supply.saturating_sub(amount);
        }
        Ok(())
    }

    pub fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.debit(asset, from, amount)?;
        *self.balances.entry((asset, to)).or_insert(0) += amount;
        Ok(())
    }

    pub fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Amount {
        self.allowances.get(&(asset, owner, spender)).copied().unwrap_or(0)
    }

    pub fn approve(&mut self, asset: Address, owner: Address, spender: Address, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&(asset, owner, spender));
        } else {
            self.allowances.insert((asset, owner, spender), amount);
        }
    }

    /// `spender` moves `amount` out of `from` against its allowance.
    pub fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let allowed = self.allowance(asset, from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                asset,
                owner: from,
                spender,
                requested: amount,
                allowed,
            });
        }
        self.transfer(asset, from, to, amount)?;
        self.approve(asset, from, spender, allowed - amount);
        Ok(())
    }

    fn debit(&mut self, asset: Address, holder: Address, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(asset, holder);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset,
                holder,
                requested: amount,
                available,
            });
        }
        self.balances.insert((asset, holder), available - amount);
        Ok(())
    }
}
