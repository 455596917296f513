//! Allowance registry
//!
//! Tracks how much each spender may move out of an owner's balance through
//! delegated transfers. An allowance is independent of the owner's balance;
//! sufficiency of funds is only checked when it is spent.

use crate::core::{Address, Amount, UNLIMITED_ALLOWANCE};
use crate::token::error::{ensure_not_null, TokenError, TokenResult};
use crate::token::events::ApprovalEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of checking a spend against an allowance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Spend {
    /// Allowance is the unlimited sentinel and stays untouched
    Unlimited,
    /// Allowance drops to the contained remainder
    Remaining(Amount),
}

/// Approved amounts per (owner, spender)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AllowanceRegistry {
    /// Allowances: owner -> (spender -> amount)
    allowances: HashMap<Address, HashMap<Address, Amount>>,
}

impl AllowanceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get allowance for a spender
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// All non-zero allowances granted by `owner`
    pub fn allowances_of(&self, owner: &Address) -> Vec<(Address, Amount)> {
        let mut list: Vec<(Address, Amount)> = self
            .allowances
            .get(owner)
            .map(|spenders| spenders.iter().map(|(s, a)| (*s, *a)).collect())
            .unwrap_or_default();
        list.sort();
        list
    }

    /// Set the allowance, overwriting any previous value
    pub fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> TokenResult<ApprovalEvent> {
        ensure_not_null(owner)?;
        ensure_not_null(spender)?;

        self.set(*owner, *spender, amount);

        Ok(ApprovalEvent {
            owner: *owner,
            spender: *spender,
            value: amount,
        })
    }

    /// Raise the allowance by `added`
    pub fn increase_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        added: Amount,
    ) -> TokenResult<ApprovalEvent> {
        let new_amount = self
            .allowance(owner, spender)
            .checked_add(added)
            .ok_or(TokenError::Overflow)?;
        self.approve(owner, spender, new_amount)
    }

    /// Lower the allowance by `subtracted`
    pub fn decrease_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        subtracted: Amount,
    ) -> TokenResult<ApprovalEvent> {
        let current = self.allowance(owner, spender);
        let new_amount = current
            .checked_sub(subtracted)
            .ok_or(TokenError::InsufficientAllowance {
                have: current,
                need: subtracted,
            })?;
        self.approve(owner, spender, new_amount)
    }

    /// Check that `spender` may move `amount` of `owner`'s funds, without
    /// touching any state
    pub fn check_spend(&self, owner: &Address, spender: &Address, amount: Amount) -> TokenResult<Spend> {
        ensure_not_null(owner)?;
        ensure_not_null(spender)?;

        let current = self.allowance(owner, spender);
        if current == UNLIMITED_ALLOWANCE {
            return Ok(Spend::Unlimited);
        }
        if amount > current {
            return Err(TokenError::InsufficientAllowance {
                have: current,
                need: amount,
            });
        }

        Ok(Spend::Remaining(current - amount))
    }

    /// Apply a spend previously validated by [`check_spend`](Self::check_spend).
    ///
    /// Returns the approval event for a decremented allowance, or `None`
    /// for an unlimited one.
    pub fn commit_spend(
        &mut self,
        owner: &Address,
        spender: &Address,
        spend: Spend,
    ) -> Option<ApprovalEvent> {
        match spend {
            Spend::Unlimited => None,
            Spend::Remaining(remaining) => {
                self.set(*owner, *spender, remaining);
                Some(ApprovalEvent {
                    owner: *owner,
                    spender: *spender,
                    value: remaining,
                })
            }
        }
    }

    /// Verify that no allowance names the null address
    pub fn check_invariants(&self) -> TokenResult<()> {
        for (owner, spenders) in &self.allowances {
            if owner.is_null() || spenders.keys().any(Address::is_null) {
                return Err(TokenError::InvariantViolated(
                    "allowance involving the null address".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Consume `amount` of the allowance
    pub fn spend_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> TokenResult<Option<ApprovalEvent>> {
        let spend = self.check_spend(owner, spender, amount)?;
        Ok(self.commit_spend(owner, spender, spend))
    }

    fn set(&mut self, owner: Address, spender: Address, amount: Amount) {
        if amount == 0 {
            if let Some(spenders) = self.allowances.get_mut(&owner) {
                spenders.remove(&spender);
                if spenders.is_empty() {
                    self.allowances.remove(&owner);
                }
            }
        } else {
            self.allowances
                .entry(owner)
                .or_default()
                .insert(spender, amount);
        }
    }
}
