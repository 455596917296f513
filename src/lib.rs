//! Bond Token: an ERC-20 style fungible token ledger in Rust
//!
//! This crate provides:
//! - Balances and total supply with checked arithmetic
//! - Delegated spending through allowances (including unlimited ones)
//! - Owner and role based minting, burning and pausing
//! - An append-only event log of transfers, approvals and admin actions
//! - JSON persistence with backups
//! - A CLI and a REST/WebSocket API over a single shared token
//!
//! # Example
//!
//! ```rust
//! use bond_token::config::TokenConfig;
//! use bond_token::core::{parse_units, Address};
//! use bond_token::token::Token;
//!
//! let owner = Address::new([1u8; 20]);
//! let spender = Address::new([2u8; 20]);
//! let recipient = Address::new([3u8; 20]);
//!
//! let mut token = Token::deploy(&TokenConfig::default(), owner).unwrap();
//!
//! token.approve(&owner, &spender, parse_units("10").unwrap()).unwrap();
//! token
//!     .transfer_from(&spender, &owner, &recipient, parse_units("4").unwrap())
//!     .unwrap();
//!
//! assert_eq!(token.balance_of(&recipient), parse_units("4").unwrap());
//! assert_eq!(token.allowance(&owner, &spender), parse_units("6").unwrap());
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod storage;
pub mod token;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use config::TokenConfig;
pub use core::{Address, Amount, DECIMALS, UNIT, UNLIMITED_ALLOWANCE};
pub use crypto::KeyPair;
pub use storage::{Storage, StorageConfig};
pub use token::{Role, Token, TokenError, TokenMetadata};
