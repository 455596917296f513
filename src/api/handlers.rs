//! REST API handlers for token operations

use crate::api::websocket::{WsBroadcaster, WsEvent};
use crate::core::{format_units, Address, Amount};
use crate::storage::{Storage, StorageError};
use crate::token::{EventRecord, LedgerEvent, Token, TokenError, TokenResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
///
/// The single lock around the token serializes every mutation; reads take
/// the read half and only ever see committed state.
#[derive(Clone)]
pub struct ApiState {
    pub token: Arc<RwLock<Token>>,
    pub storage: Arc<Storage>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
}

impl ApiState {
    /// Wrap a token for sharing between handlers
    pub fn new(token: Token, storage: Storage) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
            storage: Arc::new(storage),
            ws_broadcaster: Arc::new(WsBroadcaster::new()),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: String,
    pub owner: Option<Address>,
    pub paused: bool,
    pub holder_count: usize,
    pub event_count: usize,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub account: Address,
    pub balance: String,
    pub formatted: String,
}

#[derive(Serialize)]
pub struct AllowanceResponse {
    pub owner: Address,
    pub spender: Address,
    pub allowance: String,
}

#[derive(Serialize)]
pub struct HolderResponse {
    pub account: Address,
    pub balance: String,
}

#[derive(Serialize)]
pub struct OperationResponse {
    pub success: bool,
    pub event: Option<LedgerEvent>,
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Request Types
// ============================================================================

/// Transfer request (caller sends its own tokens)
#[derive(Deserialize)]
pub struct TransferRequest {
    pub caller: String,
    pub to: String,
    pub amount: String,
}

/// Approve / increase / decrease request
#[derive(Deserialize)]
pub struct ApproveRequest {
    pub caller: String,
    pub spender: String,
    pub amount: String,
}

/// Delegated transfer request (caller is the spender)
#[derive(Deserialize)]
pub struct TransferFromRequest {
    pub caller: String,
    pub from: String,
    pub to: String,
    pub amount: String,
}

/// Mint / burn request
#[derive(Deserialize)]
pub struct SupplyRequest {
    pub caller: String,
    pub account: String,
    pub amount: String,
}

/// Pause / unpause request
#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

/// Allowance query params
#[derive(Deserialize)]
pub struct AllowanceQuery {
    pub owner: String,
    pub spender: String,
}

/// Event list query params
///
/// `since` returns every record after that sequence number (for clients
/// catching up after a dropped WebSocket stream); otherwise the last
/// `count` records are returned.
#[derive(Deserialize)]
pub struct EventsQuery {
    pub count: Option<usize>,
    pub since: Option<u64>,
}

// ============================================================================
// Helpers
// ============================================================================

fn bad_request(error: String) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error,
            code: "BAD_REQUEST".to_string(),
        }),
    )
}

fn token_error(e: TokenError) -> (StatusCode, Json<ApiError>) {
    let status = match e {
        TokenError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        TokenError::Paused | TokenError::NotPaused => StatusCode::CONFLICT,
        TokenError::InvariantViolated(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ApiError {
            error: e.to_string(),
            code: e.code().to_string(),
        }),
    )
}

fn parse_address(value: &str) -> Result<Address, (StatusCode, Json<ApiError>)> {
    value
        .parse()
        .map_err(|e| bad_request(format!("Invalid address '{}': {}", value, e)))
}

fn parse_amount(value: &str) -> Result<Amount, (StatusCode, Json<ApiError>)> {
    value
        .parse()
        .map_err(|_| bad_request("Invalid amount: must be a base-unit integer".to_string()))
}

fn persistence_failed(e: StorageError) -> (StatusCode, Json<ApiError>) {
    log::error!("Failed to persist token state: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            error: format!("Failed to persist token state: {}", e),
            code: "PERSISTENCE_FAILED".to_string(),
        }),
    )
}

/// Run a mutation under the write lock
///
/// The operation runs on a copy of the token. The copy replaces the live
/// token, and its new events are broadcast, only once it is saved to disk.
async fn mutate<T, F>(state: &ApiState, op: F) -> Result<T, (StatusCode, Json<ApiError>)>
where
    F: FnOnce(&mut Token) -> TokenResult<T>,
{
    let mut token = state.token.write().await;

    let mut next = token.clone();
    let output = op(&mut next).map_err(token_error)?;
    state.storage.save(&next).map_err(persistence_failed)?;

    let first_new = token.events().len();
    *token = next;

    for record in &token.events().records()[first_new..] {
        state
            .ws_broadcaster
            .broadcast(WsEvent::Ledger(record.clone()));
    }

    Ok(output)
}

fn done(event: impl Into<LedgerEvent>) -> Json<OperationResponse> {
    Json(OperationResponse {
        success: true,
        event: Some(event.into()),
    })
}

// ============================================================================
// Read Endpoints
// ============================================================================

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/token - Token info
pub async fn get_token_info(State(state): State<ApiState>) -> Json<TokenInfo> {
    let token = state.token.read().await;

    Json(TokenInfo {
        name: token.name().to_string(),
        symbol: token.symbol().to_string(),
        decimals: token.decimals(),
        total_supply: token.total_supply().to_string(),
        owner: token.owner(),
        paused: token.is_paused(),
        holder_count: token.holder_count(),
        event_count: token.events().len(),
    })
}

/// GET /api/balance/{account} - Balance of an account
pub async fn get_balance(
    State(state): State<ApiState>,
    Path(account): Path<String>,
) -> ApiResult<BalanceResponse> {
    let account = parse_address(&account)?;
    let token = state.token.read().await;
    let balance = token.balance_of(&account);

    Ok(Json(BalanceResponse {
        account,
        balance: balance.to_string(),
        formatted: format_units(balance),
    }))
}

/// GET /api/allowance?owner=..&spender=.. - Allowance
pub async fn get_allowance(
    State(state): State<ApiState>,
    Query(query): Query<AllowanceQuery>,
) -> ApiResult<AllowanceResponse> {
    let owner = parse_address(&query.owner)?;
    let spender = parse_address(&query.spender)?;
    let token = state.token.read().await;

    Ok(Json(AllowanceResponse {
        owner,
        spender,
        allowance: token.allowance(&owner, &spender).to_string(),
    }))
}

/// GET /api/holders - All non-zero balances
pub async fn get_holders(State(state): State<ApiState>) -> Json<Vec<HolderResponse>> {
    let token = state.token.read().await;

    Json(
        token
            .holders()
            .into_iter()
            .map(|(account, balance)| HolderResponse {
                account,
                balance: balance.to_string(),
            })
            .collect(),
    )
}

/// GET /api/events?count=N or ?since=SEQ - Recent events
pub async fn get_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventRecord>> {
    let token = state.token.read().await;
    let records = match query.since {
        Some(sequence) => token.events().since(sequence),
        None => token.events().recent(query.count.unwrap_or(50)),
    };
    Json(records.to_vec())
}

// ============================================================================
// Mutating Endpoints
// ============================================================================

/// POST /api/transfer - Transfer tokens
pub async fn transfer(
    State(state): State<ApiState>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<OperationResponse> {
    let caller = parse_address(&req.caller)?;
    let to = parse_address(&req.to)?;
    let amount = parse_amount(&req.amount)?;

    let event = mutate(&state, |token| token.transfer(&caller, &to, amount)).await?;
    Ok(done(event))
}

/// POST /api/approve - Set allowance
pub async fn approve(
    State(state): State<ApiState>,
    Json(req): Json<ApproveRequest>,
) -> ApiResult<OperationResponse> {
    let caller = parse_address(&req.caller)?;
    let spender = parse_address(&req.spender)?;
    let amount = parse_amount(&req.amount)?;

    let event = mutate(&state, |token| token.approve(&caller, &spender, amount)).await?;
    Ok(done(event))
}

/// POST /api/increase-allowance - Raise allowance
pub async fn increase_allowance(
    State(state): State<ApiState>,
    Json(req): Json<ApproveRequest>,
) -> ApiResult<OperationResponse> {
    let caller = parse_address(&req.caller)?;
    let spender = parse_address(&req.spender)?;
    let amount = parse_amount(&req.amount)?;

    let event = mutate(&state, |token| {
        token.increase_allowance(&caller, &spender, amount)
    })
    .await?;
    Ok(done(event))
}

/// POST /api/decrease-allowance - Lower allowance
pub async fn decrease_allowance(
    State(state): State<ApiState>,
    Json(req): Json<ApproveRequest>,
) -> ApiResult<OperationResponse> {
    let caller = parse_address(&req.caller)?;
    let spender = parse_address(&req.spender)?;
    let amount = parse_amount(&req.amount)?;

    let event = mutate(&state, |token| {
        token.decrease_allowance(&caller, &spender, amount)
    })
    .await?;
    Ok(done(event))
}

/// POST /api/transfer-from - Delegated transfer
pub async fn transfer_from(
    State(state): State<ApiState>,
    Json(req): Json<TransferFromRequest>,
) -> ApiResult<OperationResponse> {
    let caller = parse_address(&req.caller)?;
    let from = parse_address(&req.from)?;
    let to = parse_address(&req.to)?;
    let amount = parse_amount(&req.amount)?;

    let event = mutate(&state, |token| {
        token.transfer_from(&caller, &from, &to, amount)
    })
    .await?;
    Ok(done(event))
}

/// POST /api/mint - Mint new tokens
pub async fn mint(
    State(state): State<ApiState>,
    Json(req): Json<SupplyRequest>,
) -> ApiResult<OperationResponse> {
    let caller = parse_address(&req.caller)?;
    let account = parse_address(&req.account)?;
    let amount = parse_amount(&req.amount)?;

    let event = mutate(&state, |token| token.mint(&caller, &account, amount)).await?;
    Ok(done(event))
}

/// POST /api/burn - Burn tokens
pub async fn burn(
    State(state): State<ApiState>,
    Json(req): Json<SupplyRequest>,
) -> ApiResult<OperationResponse> {
    let caller = parse_address(&req.caller)?;
    let account = parse_address(&req.account)?;
    let amount = parse_amount(&req.amount)?;

    let event = mutate(&state, |token| token.burn(&caller, &account, amount)).await?;
    Ok(done(event))
}

/// POST /api/pause - Halt transfers
pub async fn pause(
    State(state): State<ApiState>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<OperationResponse> {
    let caller = parse_address(&req.caller)?;
    let event = mutate(&state, |token| token.pause(&caller)).await?;
    Ok(done(event))
}

/// POST /api/unpause - Resume transfers
pub async fn unpause(
    State(state): State<ApiState>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<OperationResponse> {
    let caller = parse_address(&req.caller)?;
    let event = mutate(&state, |token| token.unpause(&caller)).await?;
    Ok(done(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::storage::StorageConfig;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn test_state(dir: &std::path::Path) -> ApiState {
        let storage = Storage::new(StorageConfig {
            data_dir: dir.to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let config = TokenConfig {
            initial_supply: 1_000_000,
            ..Default::default()
        };
        let token = Token::deploy(&config, addr(1)).unwrap();
        ApiState::new(token, storage)
    }

    #[tokio::test]
    async fn test_transfer_and_balance() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let Json(resp) = transfer(
            State(state.clone()),
            Json(TransferRequest {
                caller: addr(1).to_string(),
                to: addr(2).to_string(),
                amount: "2500".to_string(),
            }),
        )
        .await
        .map_err(|(s, _)| s)
        .unwrap();
        assert!(resp.success);

        let Json(balance) = get_balance(State(state.clone()), Path(addr(2).to_string()))
            .await
            .map_err(|(s, _)| s)
            .unwrap();
        assert_eq!(balance.balance, "2500");

        // Persisted after the mutation
        assert!(state.storage.exists());
        assert_eq!(state.storage.load().unwrap().balance_of(&addr(2)), 2500);
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let err = mint(
            State(state.clone()),
            Json(SupplyRequest {
                caller: addr(2).to_string(),
                account: addr(2).to_string(),
                amount: "1".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::FORBIDDEN);
        assert_eq!(err.1 .0.code, "UNAUTHORIZED");

        let err = transfer(
            State(state.clone()),
            Json(TransferRequest {
                caller: addr(1).to_string(),
                to: "0x1234".to_string(),
                amount: "1".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1 .0.code, "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_paused_transfer_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let Json(resp) = pause(
            State(state.clone()),
            Json(CallerRequest {
                caller: addr(1).to_string(),
            }),
        )
        .await
        .map_err(|(s, _)| s)
        .unwrap();
        assert!(matches!(resp.event, Some(LedgerEvent::Paused { .. })));

        let err = transfer(
            State(state.clone()),
            Json(TransferRequest {
                caller: addr(1).to_string(),
                to: addr(2).to_string(),
                amount: "1".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::CONFLICT);
        assert_eq!(err.1 .0.code, "PAUSED");

        let Json(info) = get_token_info(State(state.clone())).await;
        assert!(info.paused);
    }

    #[tokio::test]
    async fn test_mutations_are_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut rx = state.ws_broadcaster.subscribe();

        let err = transfer_from(
            State(state.clone()),
            Json(TransferFromRequest {
                caller: addr(3).to_string(),
                from: addr(1).to_string(),
                to: addr(2).to_string(),
                amount: "1".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.1 .0.code, "INSUFFICIENT_ALLOWANCE");

        let Json(resp) = approve(
            State(state.clone()),
            Json(ApproveRequest {
                caller: addr(1).to_string(),
                spender: addr(3).to_string(),
                amount: "10".to_string(),
            }),
        )
        .await
        .map_err(|(s, _)| s)
        .unwrap();
        assert!(resp.success);

        // The failed call broadcast nothing; the approval is the first event
        match rx.recv().await.unwrap() {
            WsEvent::Ledger(record) => {
                assert!(matches!(record.event, LedgerEvent::Approval(_)));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let Json(allowance) = get_allowance(
            State(state.clone()),
            Query(AllowanceQuery {
                owner: addr(1).to_string(),
                spender: addr(3).to_string(),
            }),
        )
        .await
        .map_err(|(s, _)| s)
        .unwrap();
        assert_eq!(allowance.allowance, "10");

        let Json(events) = get_events(
            State(state.clone()),
            Query(EventsQuery {
                count: Some(1),
                since: None,
            }),
        )
        .await;
        assert_eq!(events.len(), 1);

        // Catch up from the approval onwards
        let last = events[0].sequence;
        let Json(events) = get_events(
            State(state.clone()),
            Query(EventsQuery {
                count: None,
                since: Some(last - 1),
            }),
        )
        .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, LedgerEvent::Approval(_)));
    }

    #[tokio::test]
    async fn test_failed_save_rejects_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut rx = state.ws_broadcaster.subscribe();
        let events_before = state.token.read().await.events().len();

        std::fs::remove_dir_all(dir.path()).unwrap();

        let err = transfer(
            State(state.clone()),
            Json(TransferRequest {
                caller: addr(1).to_string(),
                to: addr(2).to_string(),
                amount: "2500".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.1 .0.code, "PERSISTENCE_FAILED");

        // Memory still matches the last state on disk
        let token = state.token.read().await;
        assert_eq!(token.balance_of(&addr(2)), 0);
        assert_eq!(token.balance_of(&addr(1)), 1_000_000);
        assert_eq!(token.events().len(), events_before);
        assert!(rx.try_recv().is_err());
    }
}
