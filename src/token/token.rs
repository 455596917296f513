//! ERC-20 style token
//!
//! Composes the ledger, the allowance registry, the capability gate and
//! the pause switch into the caller-facing operations. Every method that
//! changes state takes `&mut self`, so operations on one token are
//! serialized by construction; hosts sharing a token across tasks hold it
//! behind a single lock.

use crate::config::TokenConfig;
use crate::core::{Address, Amount, DECIMALS};
use crate::token::access::{AccessControl, Authorizer, Role};
use crate::token::allowance::AllowanceRegistry;
use crate::token::error::{ensure_not_null, TokenError, TokenResult};
use crate::token::events::{ApprovalEvent, EventLog, LedgerEvent, TransferEvent};
use crate::token::ledger::Ledger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token metadata (immutable after deployment)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenMetadata {
    /// Token name (e.g., "Bond Token")
    pub name: String,
    /// Token symbol (e.g., "BOND")
    pub symbol: String,
    /// Decimal places (always 18)
    pub decimals: u8,
    /// Deploying address
    pub deployer: Address,
    /// Timestamp when deployed
    pub created_at: DateTime<Utc>,
}

/// A fungible token: balances, allowances, roles and an event log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    /// Token metadata
    pub metadata: TokenMetadata,
    ledger: Ledger,
    allowances: AllowanceRegistry,
    access: AccessControl,
    paused: bool,
    events: EventLog,
}

impl Token {
    /// Deploy a new token, minting the configured initial supply to the
    /// deployer, who also becomes owner
    pub fn deploy(config: &TokenConfig, deployer: Address) -> TokenResult<Self> {
        config.validate()?;
        ensure_not_null(&deployer)?;

        let mut token = Self {
            metadata: TokenMetadata {
                name: config.name.clone(),
                symbol: config.symbol.clone(),
                decimals: DECIMALS,
                deployer,
                created_at: Utc::now(),
            },
            ledger: Ledger::new(),
            allowances: AllowanceRegistry::new(),
            access: AccessControl::new(deployer),
            paused: false,
            events: EventLog::new(),
        };

        token.events.append(LedgerEvent::OwnershipTransferred {
            previous_owner: None,
            new_owner: Some(deployer),
        });
        if config.initial_supply > 0 {
            let event = token.ledger.mint(&deployer, config.initial_supply)?;
            token.events.append(event);
        }

        log::info!(
            "Token deployed: {} ({}) by {}, initial supply {}",
            token.name(),
            token.symbol(),
            deployer,
            config.initial_supply
        );

        Ok(token)
    }

    // =========================================================================
    // View Functions
    // =========================================================================

    /// Get token name
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Get token symbol
    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    /// Get decimal places
    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    /// Get total supply
    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    /// Get balance of an address
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger.balance_of(account)
    }

    /// Get allowance for a spender
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances.allowance(owner, spender)
    }

    /// All non-zero allowances granted by `owner`
    pub fn allowances_of(&self, owner: &Address) -> Vec<(Address, Amount)> {
        self.allowances.allowances_of(owner)
    }

    /// Holders with non-zero balances, largest first
    pub fn holders(&self) -> Vec<(Address, Amount)> {
        self.ledger.holders()
    }

    /// Get holder count
    pub fn holder_count(&self) -> usize {
        self.ledger.holder_count()
    }

    /// Whether transfers, mints and burns are currently halted
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current owner
    pub fn owner(&self) -> Option<Address> {
        self.access.owner()
    }

    /// The capability gate
    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// Check if an address has a role
    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.access.has_role(role, account)
    }

    /// The event log
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Verify supply conservation and that no entry is keyed by the null
    /// address
    pub fn check_invariants(&self) -> TokenResult<()> {
        self.ledger.check_invariants()?;
        self.allowances.check_invariants()
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Transfer tokens from the caller to `to`
    pub fn transfer(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<TransferEvent> {
        self.ensure_not_paused()?;

        let event = self.ledger.transfer(caller, to, amount)?;
        self.events.append(event.clone());
        Ok(event)
    }

    /// Transfer tokens on behalf of `from` (caller is the spender)
    ///
    /// Both the allowance and the transfer are validated before either is
    /// applied, so a failing transfer leaves the allowance untouched.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> TokenResult<TransferEvent> {
        self.ensure_not_paused()?;

        let spend = self.allowances.check_spend(from, caller, amount)?;
        self.ledger.ensure_transferable(from, to, amount)?;

        let approval = self.allowances.commit_spend(from, caller, spend);
        let event = self.ledger.transfer(from, to, amount)?;

        if let Some(approval) = approval {
            self.events.append(approval);
        }
        self.events.append(event.clone());
        Ok(event)
    }

    // =========================================================================
    // Allowances
    // =========================================================================

    /// Approve a spender to transfer the caller's tokens
    pub fn approve(
        &mut self,
        caller: &Address,
        spender: &Address,
        amount: Amount,
    ) -> TokenResult<ApprovalEvent> {
        let event = self.allowances.approve(caller, spender, amount)?;
        self.events.append(event.clone());
        Ok(event)
    }

    /// Raise a spender's allowance
    pub fn increase_allowance(
        &mut self,
        caller: &Address,
        spender: &Address,
        added: Amount,
    ) -> TokenResult<ApprovalEvent> {
        let event = self.allowances.increase_allowance(caller, spender, added)?;
        self.events.append(event.clone());
        Ok(event)
    }

    /// Lower a spender's allowance
    pub fn decrease_allowance(
        &mut self,
        caller: &Address,
        spender: &Address,
        subtracted: Amount,
    ) -> TokenResult<ApprovalEvent> {
        let event = self
            .allowances
            .decrease_allowance(caller, spender, subtracted)?;
        self.events.append(event.clone());
        Ok(event)
    }

    // =========================================================================
    // Supply
    // =========================================================================

    /// Mint new tokens (requires the minter role)
    pub fn mint(
        &mut self,
        caller: &Address,
        account: &Address,
        amount: Amount,
    ) -> TokenResult<TransferEvent> {
        self.access.authorize(Role::Minter, caller)?;
        self.ensure_not_paused()?;

        let event = self.ledger.mint(account, amount)?;
        self.events.append(event.clone());
        log::info!("Minted {} to {} (supply {})", amount, account, self.total_supply());
        Ok(event)
    }

    /// Burn tokens held by `account` (requires the burner role)
    pub fn burn(
        &mut self,
        caller: &Address,
        account: &Address,
        amount: Amount,
    ) -> TokenResult<TransferEvent> {
        self.access.authorize(Role::Burner, caller)?;
        self.ensure_not_paused()?;

        let event = self.ledger.burn(account, amount)?;
        self.events.append(event.clone());
        log::info!("Burned {} from {} (supply {})", amount, account, self.total_supply());
        Ok(event)
    }

    // =========================================================================
    // Pause
    // =========================================================================

    /// Halt transfers, mints and burns (requires the pauser role)
    pub fn pause(&mut self, caller: &Address) -> TokenResult<LedgerEvent> {
        self.access.authorize(Role::Pauser, caller)?;
        self.ensure_not_paused()?;

        self.paused = true;
        let event = LedgerEvent::Paused { account: *caller };
        self.events.append(event.clone());
        log::warn!("Token paused by {}", caller);
        Ok(event)
    }

    /// Resume normal operation (requires the pauser role)
    pub fn unpause(&mut self, caller: &Address) -> TokenResult<LedgerEvent> {
        self.access.authorize(Role::Pauser, caller)?;
        if !self.paused {
            return Err(TokenError::NotPaused);
        }

        self.paused = false;
        let event = LedgerEvent::Unpaused { account: *caller };
        self.events.append(event.clone());
        log::info!("Token unpaused by {}", caller);
        Ok(event)
    }

    // =========================================================================
    // Ownership & roles
    // =========================================================================

    /// Hand ownership to another account
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: &Address,
    ) -> TokenResult<LedgerEvent> {
        let event = self.access.transfer_ownership(caller, new_owner)?;
        self.events.append(event.clone());
        Ok(event)
    }

    /// Give up ownership for good
    pub fn renounce_ownership(&mut self, caller: &Address) -> TokenResult<LedgerEvent> {
        let event = self.access.renounce_ownership(caller)?;
        self.events.append(event.clone());
        Ok(event)
    }

    /// Grant a role to an account
    pub fn grant_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> TokenResult<Option<LedgerEvent>> {
        let event = self.access.grant_role(caller, role, account)?;
        if let Some(event) = &event {
            self.events.append(event.clone());
        }
        Ok(event)
    }

    /// Revoke a role from an account
    pub fn revoke_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> TokenResult<Option<LedgerEvent>> {
        let event = self.access.revoke_role(caller, role, account)?;
        if let Some(event) = &event {
            self.events.append(event.clone());
        }
        Ok(event)
    }

    fn ensure_not_paused(&self) -> TokenResult<()> {
        if self.paused {
            return Err(TokenError::Paused);
        }
        Ok(())
    }
}
