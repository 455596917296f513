//! Token configuration
//!
//! Static settings consumed once, when a token is deployed.

use crate::core::{Amount, UNIT};
use crate::token::{TokenError, TokenResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Default initial mint: five billion whole tokens
pub const DEFAULT_INITIAL_SUPPLY: Amount = 5_000_000_000 * UNIT;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] TokenError),
}

/// Deployment settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Token name (e.g., "Bond Token")
    pub name: String,
    /// Token symbol (e.g., "BOND")
    pub symbol: String,
    /// Base units minted to the deployer
    #[serde(with = "crate::token::events::amount_string")]
    pub initial_supply: Amount,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "Bond Token".to_string(),
            symbol: "BOND".to_string(),
            initial_supply: DEFAULT_INITIAL_SUPPLY,
        }
    }
}

impl TokenConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let config: TokenConfig = serde_json::from_str(&data)?;
        config.validate()?;
        log::debug!("Loaded token config from {:?}", path);
        Ok(config)
    }

    /// Check name and symbol bounds
    pub fn validate(&self) -> TokenResult<()> {
        let name_len = self.name.chars().count();
        if name_len == 0 || name_len > 50 {
            return Err(TokenError::InvalidConfig(
                "name must be 1-50 characters".to_string(),
            ));
        }

        let symbol_len = self.symbol.chars().count();
        if symbol_len == 0 || symbol_len > 10 {
            return Err(TokenError::InvalidConfig(
                "symbol must be 1-10 characters".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = TokenConfig::default();
        assert_eq!(config.initial_supply, 5_000_000_000_000_000_000_000_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = TokenConfig {
            name: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TokenError::InvalidConfig(_))
        ));

        let config = TokenConfig {
            symbol: "TOOLONGSYMBOL".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"symbol": "TST", "initial_supply": "1000"}}"#).unwrap();

        let config = TokenConfig::load(file.path()).unwrap();
        assert_eq!(config.name, "Bond Token");
        assert_eq!(config.symbol, "TST");
        assert_eq!(config.initial_supply, 1000);
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"symbol": ""}}"#).unwrap();
        assert!(matches!(
            TokenConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            TokenConfig::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
