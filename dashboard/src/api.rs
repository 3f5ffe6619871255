//! # Dashboard HTTP API
//!
//! Builds the axum router that serves the dashboard page and the JSON API
//! behind it. All endpoints share application state through axum's `State`
//! extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                 | Description                            |
//! |--------|----------------------|----------------------------------------|
//! | GET    | `/`                  | The dashboard page                     |
//! | GET    | `/health`            | Liveness probe                         |
//! | GET    | `/status`            | Session snapshot                       |
//! | POST   | `/wallet/connect`    | Connect the dashboard wallet           |
//! | POST   | `/wallet/disconnect` | Drop the connected wallet              |
//! | POST   | `/balance/refresh`   | Re-fetch the vault balance             |
//! | POST   | `/deposit`           | Deposit into the vault                 |
//! | POST   | `/withdraw`          | Withdraw from the vault                |
//!
//! One session, one lock: every mutating endpoint takes the session mutex
//! with `try_lock`, so a second submission arriving while one is being
//! confirmed is turned away with 409 instead of queueing up behind it.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use solana_sdk::signature::{read_keypair_file, Keypair};

use vaultboard_client::address::AddressSource;
use vaultboard_client::client::{ClientError, TokenAccounts, VaultClient};
use vaultboard_client::gateway::{GatewayError, ProgramGateway};
use vaultboard_client::session::{Operation, SessionError, VaultSession};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Builds a transport for a given RPC endpoint.
///
/// The server installs the real JSON-RPC gateway here; tests install an
/// in-memory ledger double.
pub type GatewayFactory =
    Arc<dyn Fn(&str) -> Result<Box<dyn ProgramGateway>, GatewayError> + Send + Sync>;

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The dashboard's reported version string.
    pub version: String,
    /// JSON-RPC endpoint handed to the gateway factory on connect.
    pub rpc_url: String,
    /// Where the dashboard wallet lives on disk.
    pub wallet_path: PathBuf,
    /// Address resolution mode for new connections.
    pub address_source: AddressSource,
    /// Token account pair for transfers.
    pub token_accounts: TokenAccounts,
    /// Builds the transport for new connections.
    pub gateway_factory: GatewayFactory,
    /// The single dashboard session, serialized by this lock.
    pub session: Arc<Mutex<VaultSession>>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

/// Reads the dashboard wallet keypair from disk.
pub fn load_wallet(path: &Path) -> anyhow::Result<Keypair> {
    read_keypair_file(path)
        .map_err(|e| anyhow::anyhow!("failed to read wallet {}: {}", path.display(), e))
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured HTTP port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/wallet/connect", post(connect_handler))
        .route("/wallet/disconnect", post(disconnect_handler))
        .route("/balance/refresh", post(refresh_handler))
        .route("/deposit", post(deposit_handler))
        .route("/withdraw", post(withdraw_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// Request body for `POST /deposit` and `POST /withdraw`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Amount in the token's base units.
    pub amount: u64,
}

/// The session as the page renders it. Returned by `GET /status` and by
/// every mutating endpoint, so the page always repaints from one shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotResponse {
    /// Dashboard software version.
    pub version: String,
    /// True when the snapshot could not be taken because a submission
    /// holds the session. All other fields are empty in that case.
    pub busy: bool,
    /// Whether a wallet is connected.
    pub connected: bool,
    /// Connected wallet address, base58.
    pub wallet: Option<String>,
    /// Resolved vault address, base58.
    pub vault: Option<String>,
    /// Resolved user vault address, base58.
    pub user_vault: Option<String>,
    /// Last fetched balance in base units.
    pub balance: Option<u64>,
    /// The balance line as the page shows it.
    pub balance_line: Option<String>,
    /// Current status line, if any.
    pub status_line: Option<String>,
    /// Current error line, if any.
    pub error_line: Option<String>,
    /// ISO-8601 timestamp of the snapshot.
    pub timestamp: String,
}

impl SnapshotResponse {
    /// The placeholder snapshot served while a submission holds the session.
    fn busy(version: String) -> Self {
        Self {
            version,
            busy: true,
            connected: false,
            wallet: None,
            vault: None,
            user_vault: None,
            balance: None,
            balance_line: None,
            status_line: None,
            error_line: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Generic error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Takes a snapshot of the locked session.
fn snapshot(state: &AppState, session: &VaultSession) -> SnapshotResponse {
    SnapshotResponse {
        version: state.version.clone(),
        busy: false,
        connected: session.is_connected(),
        wallet: session.wallet().map(|k| k.to_string()),
        vault: session.addresses().map(|a| a.vault.to_string()),
        user_vault: session.addresses().map(|a| a.user_vault.to_string()),
        balance: session.balance(),
        balance_line: session.balance_line(),
        status_line: session.status_line().map(str::to_string),
        error_line: session.error_line().map(str::to_string),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// 409 for requests that arrive while a submission holds the session.
fn busy_response() -> Response {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            error: "another submission is in flight".into(),
        }),
    )
        .into_response()
}

/// 400 for operations that need a wallet when none is connected.
fn not_connected_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "no wallet connected".into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` — serves the dashboard page.
async fn index_handler() -> impl IntoResponse {
    Html(include_str!("../static/index.html"))
}

/// `GET /health` — returns 200 if the server is alive.
///
/// This is the liveness probe for orchestrators. It intentionally does not
/// touch the session or the chain — that belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns the session snapshot.
///
/// Never waits on an in-flight submission; when the session is held, the
/// page gets a `busy` snapshot and keeps its current rendering.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.try_lock() {
        Ok(session) => Json(snapshot(&state, &session)),
        Err(_) => Json(SnapshotResponse::busy(state.version.clone())),
    }
}

/// `POST /wallet/connect` — loads the dashboard wallet and connects it.
///
/// Reads the wallet file fresh on every call, so running `vaultboard init`
/// after the server started works without a restart.
async fn connect_handler(State(state): State<AppState>) -> Response {
    let Ok(mut session) = state.session.try_lock() else {
        return busy_response();
    };

    let wallet = match load_wallet(&state.wallet_path) {
        Ok(wallet) => wallet,
        Err(e) => {
            tracing::warn!(error = %e, "wallet unavailable");
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!(
                        "no wallet at {}; run `vaultboard init` first",
                        state.wallet_path.display()
                    ),
                }),
            )
                .into_response();
        }
    };

    let gateway = match (state.gateway_factory)(&state.rpc_url) {
        Ok(gateway) => gateway,
        Err(e) => {
            session.note_connect_failure(&ClientError::Gateway(e));
            return (StatusCode::BAD_GATEWAY, Json(snapshot(&state, &session))).into_response();
        }
    };

    match VaultClient::new(gateway, wallet, state.address_source, state.token_accounts) {
        Ok(client) => {
            state.metrics.wallet_connects_total.inc();
            state.metrics.wallet_connected.set(1);
            session.connect(client);
            (StatusCode::OK, Json(snapshot(&state, &session))).into_response()
        }
        Err(e) => {
            session.note_connect_failure(&e);
            (StatusCode::BAD_GATEWAY, Json(snapshot(&state, &session))).into_response()
        }
    }
}

/// `POST /wallet/disconnect` — drops the connected wallet.
async fn disconnect_handler(State(state): State<AppState>) -> Response {
    let Ok(mut session) = state.session.try_lock() else {
        return busy_response();
    };
    session.disconnect();
    state.metrics.wallet_connected.set(0);
    (StatusCode::OK, Json(snapshot(&state, &session))).into_response()
}

/// `POST /balance/refresh` — re-fetches the vault balance.
async fn refresh_handler(State(state): State<AppState>) -> Response {
    let Ok(mut session) = state.session.try_lock() else {
        return busy_response();
    };
    if !session.is_connected() {
        return not_connected_response();
    }

    state.metrics.balance_fetches_total.inc();
    match session.refresh_balance().await {
        Ok(_) => (StatusCode::OK, Json(snapshot(&state, &session))).into_response(),
        Err(_) => {
            state.metrics.balance_fetch_failures_total.inc();
            (StatusCode::BAD_GATEWAY, Json(snapshot(&state, &session))).into_response()
        }
    }
}

/// `POST /deposit` — deposits into the vault and waits for confirmation.
async fn deposit_handler(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Response {
    run_transfer(state, Operation::Deposit, request.amount).await
}

/// `POST /withdraw` — withdraws from the vault and waits for confirmation.
async fn withdraw_handler(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Response {
    run_transfer(state, Operation::Withdraw, request.amount).await
}

/// Shared body of the two transfer endpoints.
///
/// Holds the session lock across submission and confirmation, which is what
/// makes concurrent submissions impossible rather than merely unlikely.
async fn run_transfer(state: AppState, operation: Operation, amount: u64) -> Response {
    let Ok(mut session) = state.session.try_lock() else {
        return busy_response();
    };
    if !session.is_connected() {
        return not_connected_response();
    }
    if amount == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "amount must be positive".into(),
            }),
        )
            .into_response();
    }

    let started = std::time::Instant::now();
    let result = match operation {
        Operation::Deposit => session.deposit(amount).await,
        Operation::Withdraw => session.withdraw(amount).await,
    };

    match result {
        Ok(signature) => {
            match operation {
                Operation::Deposit => state.metrics.deposits_total.inc(),
                Operation::Withdraw => state.metrics.withdrawals_total.inc(),
            }
            state
                .metrics
                .submission_latency_seconds
                .observe(started.elapsed().as_secs_f64());
            tracing::info!(
                operation = operation.as_str(),
                amount,
                signature = %signature,
                "transfer confirmed"
            );
            (StatusCode::OK, Json(snapshot(&state, &session))).into_response()
        }
        Err(SessionError::NotConnected) => not_connected_response(),
        Err(SessionError::Client(e)) => {
            state.metrics.submission_failures_total.inc();
            // Declared program rejections are the caller's problem;
            // everything else is the chain's.
            let status = match &e {
                ClientError::Program { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, Json(snapshot(&state, &session))).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
