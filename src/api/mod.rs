//! REST API module
//!
//! Provides HTTP access to the token. Amounts travel as decimal strings of
//! base units; addresses as `0x`-prefixed hex.
//!
//! # Endpoints
//!
//! ## Reads
//! - `GET /api/token` - Name, symbol, supply, owner, pause state
//! - `GET /api/balance/{account}` - Balance of an account
//! - `GET /api/allowance?owner=..&spender=..` - Allowance
//! - `GET /api/holders` - Non-zero balances
//! - `GET /api/events?count=N` - Most recent events (`?since=SEQ` for all after a sequence)
//!
//! ## Transfers and allowances
//! - `POST /api/transfer`, `/api/transfer-from`
//! - `POST /api/approve`, `/api/increase-allowance`, `/api/decrease-allowance`
//!
//! ## Privileged
//! - `POST /api/mint`, `/api/burn`, `/api/pause`, `/api/unpause`
//!
//! ## WebSocket
//! - `GET /ws` - Committed ledger events as they happen

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::create_router;
pub use websocket::WsBroadcaster;
