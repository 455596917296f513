//! CLI commands for the token
//!
//! Implements all command handlers for the CLI interface.

use crate::config::TokenConfig;
use crate::core::{format_units, parse_units, Address, Amount};
use crate::crypto::KeyPair;
use crate::storage::{DataDirLock, Storage, StorageConfig};
use crate::token::{LedgerEvent, Role, Token};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
///
/// Holds the data directory lock for as long as it lives, so a CLI
/// invocation and a running API server never write the same token.
pub struct AppState {
    pub token: Token,
    pub storage: Storage,
    pub data_dir: PathBuf,
    pub lock: DataDirLock,
}

impl AppState {
    /// Lock `data_dir` and load the token stored there
    pub fn load(data_dir: PathBuf) -> CliResult<Self> {
        let lock = DataDirLock::acquire(&data_dir)?;
        let storage = open_storage(&data_dir)?;

        if !storage.exists() {
            return Err(format!(
                "No token found in {:?}. Deploy one with: bond-token init --deployer <address>",
                data_dir
            )
            .into());
        }

        let token = storage.load()?;

        Ok(Self {
            token,
            storage,
            data_dir,
            lock,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.token)?;
        Ok(())
    }
}

/// Open the storage rooted at `data_dir`
pub fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(storage_config)?)
}

/// Parse an address argument
pub fn parse_address(value: &str) -> CliResult<Address> {
    Ok(value.parse::<Address>()?)
}

/// Parse an amount argument given in whole tokens ("1.5", "max")
pub fn parse_amount(value: &str) -> CliResult<Amount> {
    Ok(parse_units(value)?)
}

fn print_event(event: &LedgerEvent) {
    match event {
        LedgerEvent::Transfer(t) if t.from.is_null() => {
            println!("   ├─ Mint: {} → {}", format_units(t.value), t.to);
        }
        LedgerEvent::Transfer(t) if t.to.is_null() => {
            println!("   ├─ Burn: {} from {}", format_units(t.value), t.from);
        }
        LedgerEvent::Transfer(t) => {
            println!(
                "   ├─ Transfer: {} {} → {}",
                format_units(t.value),
                t.from,
                t.to
            );
        }
        LedgerEvent::Approval(a) => {
            println!(
                "   ├─ Approval: {} lets {} spend {}",
                a.owner,
                a.spender,
                format_units(a.value)
            );
        }
        LedgerEvent::Paused { account } => println!("   ├─ Paused by {}", account),
        LedgerEvent::Unpaused { account } => println!("   ├─ Unpaused by {}", account),
        LedgerEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        } => {
            let show = |a: &Option<Address>| {
                a.map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string())
            };
            println!(
                "   ├─ Ownership: {} → {}",
                show(previous_owner),
                show(new_owner)
            );
        }
        LedgerEvent::RoleGranted { role, account, .. } => {
            println!("   ├─ Role {} granted to {}", role, account);
        }
        LedgerEvent::RoleRevoked { role, account, .. } => {
            println!("   ├─ Role {} revoked from {}", role, account);
        }
    }
}

/// Deploy a new token into `data_dir`
pub fn cmd_init(data_dir: &Path, deployer: &str, config_path: Option<&Path>) -> CliResult<()> {
    let _lock = DataDirLock::acquire(data_dir)?;
    let storage = open_storage(data_dir)?;

    if storage.exists() {
        println!("⚠️  A token already exists at {:?}", data_dir);
        println!("   Delete the data directory to deploy a new one");
        return Ok(());
    }

    let config = match config_path {
        Some(path) => TokenConfig::load(path)?,
        None => TokenConfig::default(),
    };
    let deployer = parse_address(deployer)?;

    let token = Token::deploy(&config, deployer)?;
    storage.save(&token)?;

    println!("✅ Token deployed!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   🏷️  {} ({})", token.name(), token.symbol());
    println!("   🔢 Decimals: {}", token.decimals());
    println!("   💰 Initial supply: {}", format_units(token.total_supply()));
    println!("   👤 Owner: {}", deployer);

    Ok(())
}

/// Show token information
pub fn cmd_info(state: &AppState) -> CliResult<()> {
    let token = &state.token;

    println!("🪙  {} ({})", token.name(), token.symbol());
    println!("   ├─ Decimals: {}", token.decimals());
    println!("   ├─ Total supply: {}", format_units(token.total_supply()));
    println!("   ├─ Holders: {}", token.holder_count());
    match token.owner() {
        Some(owner) => println!("   ├─ Owner: {}", owner),
        None => println!("   ├─ Owner: (renounced)"),
    }
    for role in Role::GRANTABLE {
        let members = token.access().members(role);
        if !members.is_empty() {
            println!("   ├─ {}s: {}", role, members.len());
        }
    }
    println!("   ├─ Paused: {}", token.is_paused());
    println!("   └─ Events: {}", token.events().len());

    Ok(())
}

/// Show the balance of an account
pub fn cmd_balance(state: &AppState, account: &str) -> CliResult<()> {
    let account = parse_address(account)?;
    let balance = state.token.balance_of(&account);

    println!("💰 Balance for {}", account);
    println!("   {} {}", format_units(balance), state.token.symbol());
    println!("   ({} base units)", balance);

    Ok(())
}

/// Show an allowance
pub fn cmd_allowance(state: &AppState, owner: &str, spender: &str) -> CliResult<()> {
    let owner = parse_address(owner)?;
    let spender = parse_address(spender)?;
    let allowance = state.token.allowance(&owner, &spender);

    println!("🔓 Allowance {} → {}", owner, spender);
    println!("   {} {}", format_units(allowance), state.token.symbol());

    Ok(())
}

/// List holders
pub fn cmd_holders(state: &AppState) -> CliResult<()> {
    let holders = state.token.holders();

    if holders.is_empty() {
        println!("📭 No holders");
        return Ok(());
    }

    println!("📋 Holders:");
    for (account, balance) in &holders {
        println!("   {} - {} {}", account, format_units(*balance), state.token.symbol());
    }

    Ok(())
}

/// Show recent events
pub fn cmd_events(state: &AppState, count: usize) -> CliResult<()> {
    let records = state.token.events().recent(count);

    println!("📜 Last {} event(s):", records.len());
    for record in records {
        println!(
            "   #{} at {}",
            record.sequence,
            record.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        print_event(&record.event);
    }

    Ok(())
}

/// Transfer tokens
pub fn cmd_transfer(state: &mut AppState, caller: &str, to: &str, amount: &str) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let to = parse_address(to)?;
    let amount = parse_amount(amount)?;

    let event = state.token.transfer(&caller, &to, amount)?;
    state.save()?;

    println!("✅ Transfer complete");
    print_event(&event.into());
    Ok(())
}

/// Approve a spender
pub fn cmd_approve(state: &mut AppState, caller: &str, spender: &str, amount: &str) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let spender = parse_address(spender)?;
    let amount = parse_amount(amount)?;

    let event = state.token.approve(&caller, &spender, amount)?;
    state.save()?;

    println!("✅ Allowance set");
    print_event(&event.into());
    Ok(())
}

/// Raise an allowance
pub fn cmd_increase_allowance(
    state: &mut AppState,
    caller: &str,
    spender: &str,
    amount: &str,
) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let spender = parse_address(spender)?;
    let amount = parse_amount(amount)?;

    let event = state.token.increase_allowance(&caller, &spender, amount)?;
    state.save()?;

    println!("✅ Allowance increased");
    print_event(&event.into());
    Ok(())
}

/// Lower an allowance
pub fn cmd_decrease_allowance(
    state: &mut AppState,
    caller: &str,
    spender: &str,
    amount: &str,
) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let spender = parse_address(spender)?;
    let amount = parse_amount(amount)?;

    let event = state.token.decrease_allowance(&caller, &spender, amount)?;
    state.save()?;

    println!("✅ Allowance decreased");
    print_event(&event.into());
    Ok(())
}

/// Delegated transfer
pub fn cmd_transfer_from(
    state: &mut AppState,
    caller: &str,
    from: &str,
    to: &str,
    amount: &str,
) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let from = parse_address(from)?;
    let to = parse_address(to)?;
    let amount = parse_amount(amount)?;

    let event = state.token.transfer_from(&caller, &from, &to, amount)?;
    state.save()?;

    println!("✅ Delegated transfer complete");
    print_event(&event.into());
    println!(
        "   └─ Remaining allowance: {}",
        format_units(state.token.allowance(&from, &caller))
    );
    Ok(())
}

/// Mint new tokens
pub fn cmd_mint(state: &mut AppState, caller: &str, account: &str, amount: &str) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let account = parse_address(account)?;
    let amount = parse_amount(amount)?;

    let event = state.token.mint(&caller, &account, amount)?;
    state.save()?;

    println!("✅ Minted");
    print_event(&event.into());
    println!("   └─ Total supply: {}", format_units(state.token.total_supply()));
    Ok(())
}

/// Burn tokens
pub fn cmd_burn(state: &mut AppState, caller: &str, account: &str, amount: &str) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let account = parse_address(account)?;
    let amount = parse_amount(amount)?;

    let event = state.token.burn(&caller, &account, amount)?;
    state.save()?;

    println!("🔥 Burned");
    print_event(&event.into());
    println!("   └─ Total supply: {}", format_units(state.token.total_supply()));
    Ok(())
}

/// Pause or unpause the token
pub fn cmd_set_paused(state: &mut AppState, caller: &str, paused: bool) -> CliResult<()> {
    let caller = parse_address(caller)?;

    let event = if paused {
        state.token.pause(&caller)?
    } else {
        state.token.unpause(&caller)?
    };
    state.save()?;

    if paused {
        println!("⏸️  Token paused");
    } else {
        println!("▶️  Token unpaused");
    }
    print_event(&event);
    Ok(())
}

/// Hand ownership to another account, or renounce it with `None`
pub fn cmd_set_owner(state: &mut AppState, caller: &str, new_owner: Option<&str>) -> CliResult<()> {
    let caller = parse_address(caller)?;

    let event = match new_owner {
        Some(new_owner) => {
            let new_owner = parse_address(new_owner)?;
            state.token.transfer_ownership(&caller, &new_owner)?
        }
        None => state.token.renounce_ownership(&caller)?,
    };
    state.save()?;

    println!("✅ Ownership updated");
    print_event(&event);
    Ok(())
}

/// Grant or revoke a role
pub fn cmd_set_role(
    state: &mut AppState,
    caller: &str,
    role: &str,
    account: &str,
    grant: bool,
) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let role: Role = role.parse()?;
    let account = parse_address(account)?;

    let event = if grant {
        state.token.grant_role(&caller, role, &account)?
    } else {
        state.token.revoke_role(&caller, role, &account)?
    };

    match event {
        Some(event) => {
            state.save()?;
            println!("✅ Roles updated");
            print_event(&event);
        }
        None if grant => println!("ℹ️  {} already has the {} role", account, role),
        None => println!("ℹ️  {} does not have the {} role", account, role),
    }
    Ok(())
}

/// List the numbered backups kept next to the token file
pub fn cmd_backups(state: &AppState) -> CliResult<()> {
    let backups = state.storage.list_backups();

    if backups.is_empty() {
        println!("📭 No backups in {:?}", state.data_dir);
        return Ok(());
    }

    println!("🗄️  Backups (0 is the most recent):");
    for index in backups {
        println!("   #{}", index);
    }

    Ok(())
}

/// Replace the current token with a backup
///
/// The replaced state becomes backup 0, so a restore can itself be undone.
pub fn cmd_restore(state: &mut AppState, backup: usize) -> CliResult<()> {
    let token = state.storage.restore_backup(backup)?;
    state.token = token;
    state.save()?;

    println!("✅ Restored backup #{}", backup);
    println!("   ├─ Total supply: {}", format_units(state.token.total_supply()));
    println!("   └─ Events: {}", state.token.events().len());
    Ok(())
}

/// Generate a new account key pair
pub fn cmd_account_new() -> CliResult<()> {
    let keys = KeyPair::generate();

    println!("🔐 New account created!");
    println!("   📍 Address: {}", keys.address());
    println!("   🔑 Public Key: {}", keys.public_key_hex());
    println!("   🗝️  Private Key: {}", keys.private_key_hex());
    println!("\n   ⚠️  IMPORTANT: The private key is not stored anywhere.");
    println!("   Back it up now to keep control of this account!");

    Ok(())
}

/// Derive the address belonging to a private key
pub fn cmd_account_inspect(secret: &str) -> CliResult<()> {
    let keys = KeyPair::from_private_key_hex(secret)?;

    println!("📍 Address: {}", keys.address());
    println!("🔑 Public Key: {}", keys.public_key_hex());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> String {
        Address::new([n; 20]).to_string()
    }

    #[test]
    fn test_init_and_transfer() {
        let dir = tempfile::tempdir().unwrap();

        cmd_init(dir.path(), &addr(1), None).unwrap();

        let mut state = AppState::load(dir.path().to_path_buf()).unwrap();
        cmd_transfer(&mut state, &addr(1), &addr(2), "1.5").unwrap();
        drop(state);

        // Reload from disk
        let state = AppState::load(dir.path().to_path_buf()).unwrap();
        let two = parse_address(&addr(2)).unwrap();
        assert_eq!(state.token.balance_of(&two), 1_500_000_000_000_000_000);
    }

    #[test]
    fn test_load_without_init() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppState::load(dir.path().to_path_buf()).is_err());
    }

    #[test]
    fn test_failed_command_does_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path(), &addr(1), None).unwrap();

        let mut state = AppState::load(dir.path().to_path_buf()).unwrap();
        assert!(cmd_mint(&mut state, &addr(2), &addr(2), "1").is_err());
        assert!(cmd_transfer(&mut state, &addr(2), &addr(1), "1").is_err());
        drop(state);

        let state = AppState::load(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.token.holder_count(), 1);
    }

    #[test]
    fn test_roles_and_pause_commands() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path(), &addr(1), None).unwrap();
        let mut state = AppState::load(dir.path().to_path_buf()).unwrap();

        cmd_set_role(&mut state, &addr(1), "pauser", &addr(2), true).unwrap();
        cmd_set_paused(&mut state, &addr(2), true).unwrap();
        assert!(state.token.is_paused());
        assert!(cmd_transfer(&mut state, &addr(1), &addr(3), "1").is_err());

        cmd_set_paused(&mut state, &addr(2), false).unwrap();
        cmd_set_owner(&mut state, &addr(1), None).unwrap();
        assert_eq!(state.token.owner(), None);
    }

    #[test]
    fn test_data_dir_is_locked_while_loaded() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path(), &addr(1), None).unwrap();

        let state = AppState::load(dir.path().to_path_buf()).unwrap();
        assert!(AppState::load(dir.path().to_path_buf()).is_err());
        assert!(cmd_init(dir.path(), &addr(2), None).is_err());

        drop(state);
        assert!(AppState::load(dir.path().to_path_buf()).is_ok());
    }

    #[test]
    fn test_restore_backup() {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path(), &addr(1), None).unwrap();

        let mut state = AppState::load(dir.path().to_path_buf()).unwrap();
        cmd_transfer(&mut state, &addr(1), &addr(2), "3").unwrap();
        cmd_backups(&state).unwrap();

        // Backup 0 is the freshly deployed token
        cmd_restore(&mut state, 0).unwrap();
        let two = parse_address(&addr(2)).unwrap();
        assert_eq!(state.token.balance_of(&two), 0);
        assert!(cmd_restore(&mut state, 4).is_err());
        drop(state);

        let state = AppState::load(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.token.balance_of(&two), 0);
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_address("0x00").is_err());
        assert_eq!(parse_amount("2").unwrap(), 2_000_000_000_000_000_000);
        assert!(parse_amount("abc").is_err());
    }
}
