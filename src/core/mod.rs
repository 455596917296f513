//! Core value types
//!
//! - [`Address`]: 20-byte account identifier, with the all-zero null address
//! - [`Amount`]: unsigned 128-bit token quantity in base units

pub mod address;
pub mod amount;

pub use address::{Address, AddressError, ADDRESS_LEN};
pub use amount::{
    format_units, parse_units, Amount, AmountError, DECIMALS, UNIT, UNLIMITED_ALLOWANCE,
};
