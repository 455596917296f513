//! Balance ledger
//!
//! Owns the account balances and the total-supply counter. Every operation
//! validates all of its preconditions first and only then mutates, so a
//! failed call leaves the ledger exactly as it was.
//!
//! The ledger performs no authorization and knows nothing about pausing;
//! callers gate access before reaching it.

use crate::core::{Address, Amount};
use crate::token::error::{ensure_not_null, TokenError, TokenResult};
use crate::token::events::TransferEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Account balances plus total supply
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    /// Balances: address -> amount (absent means zero)
    balances: HashMap<Address, Amount>,
    /// Running total of all balances
    total_supply: Amount,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get total supply
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Get balance of an address
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// All holders with a non-zero balance, largest first
    pub fn holders(&self) -> Vec<(Address, Amount)> {
        let mut holders: Vec<(Address, Amount)> = self
            .balances
            .iter()
            .filter(|(_, &b)| b > 0)
            .map(|(a, b)| (*a, *b))
            .collect();
        holders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        holders
    }

    /// Get holder count
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|&&b| b > 0).count()
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check that `transfer(from, to, amount)` would succeed, without
    /// touching any state
    pub fn ensure_transferable(&self, from: &Address, to: &Address, amount: Amount) -> TokenResult<()> {
        ensure_not_null(from)?;
        ensure_not_null(to)?;

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }

        // Cannot happen while balances sum to the supply, but never wrap
        if from != to {
            self.balance_of(to)
                .checked_add(amount)
                .ok_or(TokenError::Overflow)?;
        }

        Ok(())
    }

    /// Verify that the balances add up to the total supply and that the
    /// null address holds nothing
    pub fn check_invariants(&self) -> TokenResult<()> {
        if self.balances.contains_key(&Address::NULL) {
            return Err(TokenError::InvariantViolated(
                "null address holds a balance".to_string(),
            ));
        }

        let sum = self
            .balances
            .values()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(*b))
            .ok_or_else(|| TokenError::InvariantViolated("sum of balances overflows".to_string()))?;

        if sum != self.total_supply {
            return Err(TokenError::InvariantViolated(format!(
                "sum of balances {} != total supply {}",
                sum, self.total_supply
            )));
        }

        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Move `amount` from one account to another
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<TransferEvent> {
        self.ensure_transferable(from, to, amount)?;

        let from_balance = self.balance_of(from);
        self.set_balance(*from, from_balance - amount);
        let to_balance = self.balance_of(to);
        self.set_balance(*to, to_balance + amount);

        Ok(TransferEvent {
            from: *from,
            to: *to,
            value: amount,
        })
    }

    /// Create `amount` new units in `account`
    pub fn mint(&mut self, account: &Address, amount: Amount) -> TokenResult<TransferEvent> {
        ensure_not_null(account)?;

        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let new_balance = self
            .balance_of(account)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.total_supply = new_supply;
        self.set_balance(*account, new_balance);

        Ok(TransferEvent {
            from: Address::NULL,
            to: *account,
            value: amount,
        })
    }

    /// Destroy `amount` units held by `account`
    pub fn burn(&mut self, account: &Address, amount: Amount) -> TokenResult<TransferEvent> {
        ensure_not_null(account)?;

        let balance = self.balance_of(account);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }
        let new_supply = self.total_supply.checked_sub(amount).ok_or_else(|| {
            TokenError::InvariantViolated("balance exceeds total supply".to_string())
        })?;

        self.set_balance(*account, balance - amount);
        self.total_supply = new_supply;

        Ok(TransferEvent {
            from: *account,
            to: Address::NULL,
            value: amount,
        })
    }

    fn set_balance(&mut self, account: Address, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn funded_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.mint(&addr(1), 1_000_000).unwrap();
        ledger
    }

    #[test]
    fn test_mint() {
        let mut ledger = Ledger::new();

        let event = ledger.mint(&addr(1), 10_000).unwrap();

        assert_eq!(event.from, Address::NULL);
        assert_eq!(event.to, addr(1));
        assert_eq!(event.value, 10_000);
        assert_eq!(ledger.balance_of(&addr(1)), 10_000);
        assert_eq!(ledger.total_supply(), 10_000);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_mint_to_null() {
        let mut ledger = Ledger::new();
        assert_eq!(
            ledger.mint(&Address::NULL, 1),
            Err(TokenError::InvalidAddress)
        );
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_mint_overflow() {
        let mut ledger = Ledger::new();
        ledger.mint(&addr(1), Amount::MAX).unwrap();

        // Supply overflow, even into a fresh account
        assert_eq!(ledger.mint(&addr(2), 1), Err(TokenError::Overflow));
        assert_eq!(ledger.total_supply(), Amount::MAX);
        assert_eq!(ledger.balance_of(&addr(2)), 0);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_transfer() {
        let mut ledger = funded_ledger();

        let event = ledger.transfer(&addr(1), &addr(2), 1000).unwrap();

        assert_eq!(event.from, addr(1));
        assert_eq!(event.to, addr(2));
        assert_eq!(ledger.balance_of(&addr(1)), 999_000);
        assert_eq!(ledger.balance_of(&addr(2)), 1000);
        assert_eq!(ledger.holder_count(), 2);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_transfer_entire_balance() {
        let mut ledger = funded_ledger();

        ledger.transfer(&addr(1), &addr(2), 1_000_000).unwrap();

        assert_eq!(ledger.balance_of(&addr(1)), 0);
        assert_eq!(ledger.holder_count(), 1);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut ledger = funded_ledger();

        let result = ledger.transfer(&addr(1), &addr(2), 2_000_000);
        assert_eq!(
            result,
            Err(TokenError::InsufficientBalance {
                have: 1_000_000,
                need: 2_000_000
            })
        );
        assert_eq!(ledger.balance_of(&addr(1)), 1_000_000);
        assert_eq!(ledger.balance_of(&addr(2)), 0);
    }

    #[test]
    fn test_transfer_null_addresses() {
        let mut ledger = funded_ledger();

        assert_eq!(
            ledger.transfer(&addr(1), &Address::NULL, 1),
            Err(TokenError::InvalidAddress)
        );
        assert_eq!(
            ledger.transfer(&Address::NULL, &addr(1), 0),
            Err(TokenError::InvalidAddress)
        );
        assert_eq!(ledger.balance_of(&addr(1)), 1_000_000);
    }

    #[test]
    fn test_self_and_zero_transfers() {
        let mut ledger = funded_ledger();

        ledger.transfer(&addr(1), &addr(1), 500).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 1_000_000);

        ledger.transfer(&addr(1), &addr(2), 0).unwrap();
        assert_eq!(ledger.balance_of(&addr(2)), 0);
        assert_eq!(ledger.holder_count(), 1);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_burn() {
        let mut ledger = funded_ledger();

        let event = ledger.burn(&addr(1), 400_000).unwrap();

        assert_eq!(event.from, addr(1));
        assert_eq!(event.to, Address::NULL);
        assert_eq!(ledger.balance_of(&addr(1)), 600_000);
        assert_eq!(ledger.total_supply(), 600_000);
        ledger.check_invariants().unwrap();
    }

    #[test]
    fn test_burn_exceeding_balance() {
        let mut ledger = funded_ledger();
        ledger.mint(&addr(2), 5).unwrap();

        let result = ledger.burn(&addr(2), 6);
        assert!(matches!(
            result,
            Err(TokenError::InsufficientBalance { have: 5, need: 6 })
        ));
        assert_eq!(ledger.total_supply(), 1_000_005);
    }

    #[test]
    fn test_burn_from_null() {
        let mut ledger = funded_ledger();
        assert_eq!(
            ledger.burn(&Address::NULL, 0),
            Err(TokenError::InvalidAddress)
        );
    }

    #[test]
    fn test_holders_sorted() {
        let mut ledger = funded_ledger();
        ledger.transfer(&addr(1), &addr(2), 600_000).unwrap();
        ledger.transfer(&addr(1), &addr(3), 100_000).unwrap();

        let holders = ledger.holders();
        assert_eq!(
            holders,
            vec![(addr(2), 600_000), (addr(1), 300_000), (addr(3), 100_000)]
        );
    }

    #[test]
    fn test_invariant_detects_tampering() {
        let mut ledger = funded_ledger();
        ledger.total_supply += 1;
        assert!(matches!(
            ledger.check_invariants(),
            Err(TokenError::InvariantViolated(_))
        ));
    }

    #[test]
    fn test_balance_of_unknown_account() {
        let ledger = Ledger::new();
        assert_eq!(ledger.balance_of(&addr(9)), 0);
    }
}
