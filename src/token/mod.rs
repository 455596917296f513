//! ERC-20 style fungible token
//!
//! Two layers hold all ledger state:
//! - [`Ledger`]: balances and total supply (transfer, mint, burn)
//! - [`AllowanceRegistry`]: delegated spending permissions
//!
//! [`Token`] composes them with the capability gate ([`AccessControl`]),
//! the pause switch and the event log.
//!
//! # Example
//!
//! ```rust
//! use bond_token::config::TokenConfig;
//! use bond_token::core::Address;
//! use bond_token::token::Token;
//!
//! let owner = Address::new([1u8; 20]);
//! let alice = Address::new([2u8; 20]);
//!
//! let mut token = Token::deploy(&TokenConfig::default(), owner).unwrap();
//! token.transfer(&owner, &alice, 1_000).unwrap();
//!
//! assert_eq!(token.balance_of(&alice), 1_000);
//! ```

pub mod access;
pub mod allowance;
pub mod error;
pub mod events;
pub mod ledger;
pub mod token;

pub use access::{AccessControl, Authorizer, Role};
pub use allowance::{AllowanceRegistry, Spend};
pub use error::{TokenError, TokenResult};
pub use events::{ApprovalEvent, EventLog, EventRecord, LedgerEvent, TransferEvent};
pub use ledger::Ledger;
pub use token::{Token, TokenMetadata};
