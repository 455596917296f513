//! Capability gate for privileged operations
//!
//! Decides who may mint, burn and pause. The ledger never consults this
//! module directly; [`Token`](crate::token::Token) asks an [`Authorizer`]
//! before handing control to the ledger.

use crate::core::Address;
use crate::token::error::{ensure_not_null, TokenError, TokenResult};
use crate::token::events::LedgerEvent;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Capabilities checked by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Ownership itself: manages roles, held by the owner only
    Admin,
    /// May create new supply
    Minter,
    /// May destroy supply
    Burner,
    /// May pause and unpause transfers
    Pauser,
}

impl Role {
    /// Roles that can be granted to other accounts
    pub const GRANTABLE: [Role; 3] = [Role::Minter, Role::Burner, Role::Pauser];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Minter => "minter",
            Role::Burner => "burner",
            Role::Pauser => "pauser",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "minter" => Ok(Role::Minter),
            "burner" => Ok(Role::Burner),
            "pauser" => Ok(Role::Pauser),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Answers "may this account act in this role?"
pub trait Authorizer {
    /// Check if an address has a role
    fn has_role(&self, role: Role, account: &Address) -> bool;

    /// Fail with `Unauthorized` unless the account has the role
    fn authorize(&self, role: Role, account: &Address) -> TokenResult<()> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(TokenError::Unauthorized {
                account: *account,
                role,
            })
        }
    }
}

/// Single owner plus explicitly granted roles.
///
/// The owner implicitly holds every role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Option<Address>,
    roles: HashMap<Role, HashSet<Address>>,
}

impl AccessControl {
    /// Create an access set owned by `owner`
    pub fn new(owner: Address) -> Self {
        Self {
            owner: Some(owner),
            roles: HashMap::new(),
        }
    }

    /// Current owner, if ownership was not renounced
    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    /// Accounts explicitly granted a role, sorted
    pub fn members(&self, role: Role) -> Vec<Address> {
        let mut members: Vec<Address> = self
            .roles
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Hand ownership to another account
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: &Address,
    ) -> TokenResult<LedgerEvent> {
        self.authorize(Role::Admin, caller)?;
        ensure_not_null(new_owner)?;

        let previous_owner = self.owner.replace(*new_owner);
        log::info!("Ownership transferred to {}", new_owner);

        Ok(LedgerEvent::OwnershipTransferred {
            previous_owner,
            new_owner: Some(*new_owner),
        })
    }

    /// Give up ownership for good
    pub fn renounce_ownership(&mut self, caller: &Address) -> TokenResult<LedgerEvent> {
        self.authorize(Role::Admin, caller)?;

        let previous_owner = self.owner.take();
        log::warn!("Ownership renounced by {}", caller);

        Ok(LedgerEvent::OwnershipTransferred {
            previous_owner,
            new_owner: None,
        })
    }

    /// Grant a role; `None` if the account already had it
    pub fn grant_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> TokenResult<Option<LedgerEvent>> {
        self.authorize(Role::Admin, caller)?;
        ensure_grantable(role)?;
        ensure_not_null(account)?;

        if !self.roles.entry(role).or_default().insert(*account) {
            return Ok(None);
        }
        log::info!("Role {} granted to {}", role, account);

        Ok(Some(LedgerEvent::RoleGranted {
            role,
            account: *account,
            sender: *caller,
        }))
    }

    /// Revoke a role; `None` if the account did not have it
    pub fn revoke_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> TokenResult<Option<LedgerEvent>> {
        self.authorize(Role::Admin, caller)?;
        ensure_grantable(role)?;

        let removed = match self.roles.get_mut(&role) {
            Some(set) => set.remove(account),
            None => false,
        };
        if !removed {
            return Ok(None);
        }
        log::info!("Role {} revoked from {}", role, account);

        Ok(Some(LedgerEvent::RoleRevoked {
            role,
            account: *account,
            sender: *caller,
        }))
    }
}

impl Authorizer for AccessControl {
    fn has_role(&self, role: Role, account: &Address) -> bool {
        if self.owner.as_ref() == Some(account) {
            return true;
        }
        self.roles
            .get(&role)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }
}

fn ensure_grantable(role: Role) -> TokenResult<()> {
    if Role::GRANTABLE.contains(&role) {
        Ok(())
    } else {
        Err(TokenError::RoleNotGrantable(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    #[test]
    fn test_owner_holds_every_role() {
        let access = AccessControl::new(addr(1));
        for role in [Role::Admin, Role::Minter, Role::Burner, Role::Pauser] {
            assert!(access.has_role(role, &addr(1)));
            assert!(!access.has_role(role, &addr(2)));
        }
    }

    #[test]
    fn test_grant_and_revoke() {
        let mut access = AccessControl::new(addr(1));

        let event = access.grant_role(&addr(1), Role::Minter, &addr(2)).unwrap();
        assert!(matches!(event, Some(LedgerEvent::RoleGranted { .. })));
        assert!(access.has_role(Role::Minter, &addr(2)));
        assert!(!access.has_role(Role::Burner, &addr(2)));
        assert_eq!(access.members(Role::Minter), vec![addr(2)]);

        // Granting twice is a no-op
        assert_eq!(
            access.grant_role(&addr(1), Role::Minter, &addr(2)).unwrap(),
            None
        );

        let event = access.revoke_role(&addr(1), Role::Minter, &addr(2)).unwrap();
        assert!(matches!(event, Some(LedgerEvent::RoleRevoked { .. })));
        assert!(!access.has_role(Role::Minter, &addr(2)));
        assert_eq!(
            access.revoke_role(&addr(1), Role::Minter, &addr(2)).unwrap(),
            None
        );
    }

    #[test]
    fn test_only_owner_manages_roles() {
        let mut access = AccessControl::new(addr(1));
        access.grant_role(&addr(1), Role::Minter, &addr(2)).unwrap();

        let result = access.grant_role(&addr(2), Role::Minter, &addr(3));
        assert_eq!(
            result,
            Err(TokenError::Unauthorized {
                account: addr(2),
                role: Role::Admin
            })
        );
        assert!(access.revoke_role(&addr(2), Role::Minter, &addr(2)).is_err());
    }

    #[test]
    fn test_admin_not_grantable() {
        let mut access = AccessControl::new(addr(1));
        assert_eq!(
            access.grant_role(&addr(1), Role::Admin, &addr(2)),
            Err(TokenError::RoleNotGrantable(Role::Admin))
        );
    }

    #[test]
    fn test_transfer_ownership() {
        let mut access = AccessControl::new(addr(1));

        assert_eq!(
            access.transfer_ownership(&addr(1), &Address::NULL),
            Err(TokenError::InvalidAddress)
        );

        let event = access.transfer_ownership(&addr(1), &addr(2)).unwrap();
        assert_eq!(
            event,
            LedgerEvent::OwnershipTransferred {
                previous_owner: Some(addr(1)),
                new_owner: Some(addr(2)),
            }
        );
        assert_eq!(access.owner(), Some(addr(2)));
        assert!(!access.has_role(Role::Minter, &addr(1)));
        assert!(access.transfer_ownership(&addr(1), &addr(3)).is_err());
    }

    #[test]
    fn test_renounce_ownership() {
        let mut access = AccessControl::new(addr(1));
        access.grant_role(&addr(1), Role::Pauser, &addr(2)).unwrap();

        access.renounce_ownership(&addr(1)).unwrap();

        assert_eq!(access.owner(), None);
        assert!(!access.has_role(Role::Minter, &addr(1)));
        // Explicit grants survive
        assert!(access.has_role(Role::Pauser, &addr(2)));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Minter".parse::<Role>(), Ok(Role::Minter));
        assert_eq!("pauser".parse::<Role>(), Ok(Role::Pauser));
        assert!("governor".parse::<Role>().is_err());
    }
}
