//! Bond Token CLI Application
//!
//! A command-line interface for deploying and operating the token.

use bond_token::api::{create_router, ApiState};
use bond_token::cli::{self, AppState};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bond-token")]
#[command(version = "0.1.0")]
#[command(about = "An ERC-20 style fungible token ledger", long_about = None)]
struct Cli {
    /// Data directory for token storage
    #[arg(short, long, default_value = ".bond_token_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new token
    Init {
        /// Account receiving the initial supply and ownership
        #[arg(long)]
        deployer: String,

        /// JSON file with name, symbol and initial supply
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Display token information
    Info,

    /// Show the balance of an account
    Balance {
        #[arg(short, long)]
        account: String,
    },

    /// Show how much a spender may move on behalf of an owner
    Allowance {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        spender: String,
    },

    /// Send tokens
    Transfer {
        /// Sending account
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        to: String,

        /// Amount in whole tokens (e.g. 1.5)
        #[arg(short, long)]
        amount: String,
    },

    /// Set a spender's allowance ("max" for unlimited)
    Approve {
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        spender: String,

        #[arg(short, long)]
        amount: String,
    },

    /// Raise a spender's allowance
    IncreaseAllowance {
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        spender: String,

        #[arg(short, long)]
        amount: String,
    },

    /// Lower a spender's allowance
    DecreaseAllowance {
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        spender: String,

        #[arg(short, long)]
        amount: String,
    },

    /// Move tokens on behalf of an owner
    TransferFrom {
        /// Spending account
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        amount: String,
    },

    /// Create new tokens (minter role)
    Mint {
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        amount: String,
    },

    /// Destroy tokens (burner role)
    Burn {
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        amount: String,
    },

    /// Halt transfers, mints and burns (pauser role)
    Pause {
        #[arg(long)]
        caller: String,
    },

    /// Resume a paused token (pauser role)
    Unpause {
        #[arg(long)]
        caller: String,
    },

    /// Hand ownership to another account
    TransferOwnership {
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        new_owner: String,
    },

    /// Give up ownership for good
    RenounceOwnership {
        #[arg(long)]
        caller: String,
    },

    /// Grant minter, burner or pauser to an account
    GrantRole {
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        role: String,

        #[arg(short, long)]
        account: String,
    },

    /// Revoke a role from an account
    RevokeRole {
        #[arg(long)]
        caller: String,

        #[arg(short, long)]
        role: String,

        #[arg(short, long)]
        account: String,
    },

    /// Show recent ledger events
    Events {
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// List accounts holding a balance
    Holders,

    /// List saved backups of the token file
    Backups,

    /// Replace the current token with a saved backup
    Restore {
        /// Backup number (0 is the most recent)
        #[arg(short, long)]
        backup: usize,
    },

    /// Account key operations
    Account {
        #[command(subcommand)]
        action: AccountCommands,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Generate a new key pair and address
    New,

    /// Show the address of a private key
    Inspect {
        /// Hex-encoded private key
        #[arg(short, long)]
        secret: String,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Commands that don't need a deployed token
    match &cli.command {
        Commands::Init { deployer, config } => {
            return cli::cmd_init(&cli.data_dir, deployer, config.as_deref());
        }
        Commands::Account { action } => {
            return match action {
                AccountCommands::New => cli::cmd_account_new(),
                AccountCommands::Inspect { secret } => cli::cmd_account_inspect(secret),
            };
        }
        Commands::Api { action } => {
            return run_api_command(action, &cli.data_dir);
        }
        _ => {}
    }

    let mut state = AppState::load(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init { .. } | Commands::Account { .. } | Commands::Api { .. } => unreachable!(),

        Commands::Info => cli::cmd_info(&state)?,
        Commands::Balance { account } => cli::cmd_balance(&state, &account)?,
        Commands::Allowance { owner, spender } => cli::cmd_allowance(&state, &owner, &spender)?,
        Commands::Holders => cli::cmd_holders(&state)?,
        Commands::Events { count } => cli::cmd_events(&state, count)?,
        Commands::Backups => cli::cmd_backups(&state)?,
        Commands::Restore { backup } => cli::cmd_restore(&mut state, backup)?,

        Commands::Transfer { caller, to, amount } => {
            cli::cmd_transfer(&mut state, &caller, &to, &amount)?;
        }
        Commands::Approve {
            caller,
            spender,
            amount,
        } => {
            cli::cmd_approve(&mut state, &caller, &spender, &amount)?;
        }
        Commands::IncreaseAllowance {
            caller,
            spender,
            amount,
        } => {
            cli::cmd_increase_allowance(&mut state, &caller, &spender, &amount)?;
        }
        Commands::DecreaseAllowance {
            caller,
            spender,
            amount,
        } => {
            cli::cmd_decrease_allowance(&mut state, &caller, &spender, &amount)?;
        }
        Commands::TransferFrom {
            caller,
            from,
            to,
            amount,
        } => {
            cli::cmd_transfer_from(&mut state, &caller, &from, &to, &amount)?;
        }

        Commands::Mint { caller, to, amount } => {
            cli::cmd_mint(&mut state, &caller, &to, &amount)?;
        }
        Commands::Burn {
            caller,
            from,
            amount,
        } => {
            cli::cmd_burn(&mut state, &caller, &from, &amount)?;
        }
        Commands::Pause { caller } => cli::cmd_set_paused(&mut state, &caller, true)?,
        Commands::Unpause { caller } => cli::cmd_set_paused(&mut state, &caller, false)?,

        Commands::TransferOwnership { caller, new_owner } => {
            cli::cmd_set_owner(&mut state, &caller, Some(&new_owner))?;
        }
        Commands::RenounceOwnership { caller } => {
            cli::cmd_set_owner(&mut state, &caller, None)?;
        }
        Commands::GrantRole {
            caller,
            role,
            account,
        } => {
            cli::cmd_set_role(&mut state, &caller, &role, &account, true)?;
        }
        Commands::RevokeRole {
            caller,
            role,
            account,
        } => {
            cli::cmd_set_role(&mut state, &caller, &role, &account, false)?;
        }
    }

    Ok(())
}

fn run_api_command(action: &ApiCommands, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match action {
            ApiCommands::Start { port } => {
                println!("📂 Loading token...");
                let app_state = AppState::load(data_dir.to_path_buf())?;
                println!(
                    "   {} ({}) with {} holder(s)",
                    app_state.token.name(),
                    app_state.token.symbol(),
                    app_state.token.holder_count()
                );

                // The lock is held until shutdown so CLI writes can't race the server
                let lock = Arc::new(app_state.lock);
                let state = ApiState::new(app_state.token, app_state.storage);

                // Clone state for shutdown handler
                let shutdown_state = state.clone();
                let shutdown_lock = lock.clone();

                let app = create_router(state);

                let addr = format!("0.0.0.0:{}", port);
                println!("🚀 REST API server starting on http://localhost:{}", port);

                println!();
                println!("📖 Available endpoints:");
                println!("   GET  /health                      - Health check");
                println!("   GET  /ws                          - WebSocket ledger events");
                println!("   GET  /api/token                   - Token info");
                println!("   GET  /api/balance/{{account}}       - Balance");
                println!("   GET  /api/allowance               - Allowance (?owner=&spender=)");
                println!("   GET  /api/holders                 - Holders");
                println!("   GET  /api/events                  - Recent events (?count= or ?since=)");
                println!("   POST /api/transfer                - Transfer");
                println!("   POST /api/approve                 - Approve spender");
                println!("   POST /api/increase-allowance      - Raise allowance");
                println!("   POST /api/decrease-allowance      - Lower allowance");
                println!("   POST /api/transfer-from           - Delegated transfer");
                println!("   POST /api/mint                    - Mint");
                println!("   POST /api/burn                    - Burn");
                println!("   POST /api/pause                   - Pause");
                println!("   POST /api/unpause                 - Unpause");
                println!();

                // Handle Ctrl+C with graceful shutdown
                tokio::spawn(async move {
                    tokio::signal::ctrl_c().await.ok();
                    println!("\n📴 Shutting down API server...");

                    println!("💾 Saving data...");
                    let token = shutdown_state.token.read().await;
                    match shutdown_state.storage.save(&token) {
                        Ok(()) => println!("✅ Data saved successfully!"),
                        Err(e) => log::error!("Failed to save token on shutdown: {}", e),
                    }
                    shutdown_lock.release();
                    std::process::exit(0);
                });

                let listener = tokio::net::TcpListener::bind(&addr).await?;
                axum::serve(listener, app).await?;
                drop(lock);
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
