//! Token errors

use crate::core::{Address, Amount};
use crate::token::access::Role;
use thiserror::Error;

/// Token-related errors
///
/// Every error is raised before any state is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid address: the null address is not allowed here")]
    InvalidAddress,
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },
    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Unauthorized: {account} lacks the {role} role")]
    Unauthorized { account: Address, role: Role },
    #[error("Role {0} cannot be granted or revoked")]
    RoleNotGrantable(Role),
    #[error("Token is paused")]
    Paused,
    #[error("Token is not paused")]
    NotPaused,
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Ledger invariant violated: {0}")]
    InvariantViolated(String),
}

impl TokenError {
    /// Stable machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidAddress => "INVALID_ADDRESS",
            TokenError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            TokenError::InsufficientAllowance { .. } => "INSUFFICIENT_ALLOWANCE",
            TokenError::Overflow => "OVERFLOW",
            TokenError::Unauthorized { .. } => "UNAUTHORIZED",
            TokenError::RoleNotGrantable(_) => "ROLE_NOT_GRANTABLE",
            TokenError::Paused => "PAUSED",
            TokenError::NotPaused => "NOT_PAUSED",
            TokenError::InvalidConfig(_) => "INVALID_CONFIG",
            TokenError::InvariantViolated(_) => "INVARIANT_VIOLATED",
        }
    }
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Reject the null identifier
pub(crate) fn ensure_not_null(address: &Address) -> TokenResult<()> {
    if address.is_null() {
        return Err(TokenError::InvalidAddress);
    }
    Ok(())
}
