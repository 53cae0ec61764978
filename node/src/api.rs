//! # REST + JSON-RPC API
//!
//! Builds the axum router that exposes the vault host over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                   | Description                          |
//! |--------|------------------------|--------------------------------------|
//! | GET    | `/health`              | Liveness probe                       |
//! | GET    | `/status`              | Host status summary                  |
//! | POST   | `/rpc`                 | JSON-RPC 2.0 gateway to vault calls  |
//! | GET    | `/challenges/:id`      | Challenge config                     |
//! | GET    | `/vaults/:id/:user`    | Vault record of one user             |
//! | GET    | `/transfers`           | Recorded transfer intents            |
//!
//! JSON-RPC methods are the vault calls prefixed with `vault_`
//! (`vault_depositFunds`, `vault_enforcePenalty`, ...) plus
//! `vault_blockHeight`. The caller identity travels in `params.caller`.
//! Vault failures come back as JSON-RPC errors whose `code` is the vault
//! error code.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use pledge_contracts::{Asset, ChallengeConfig, ChallengeId, Principal, Transfer, VaultRecord};

use crate::calls::VaultCall;
use crate::host::VaultHost;
use crate::metrics::SharedMetrics;

/// Prefix of vault methods on the JSON-RPC gateway.
pub const RPC_METHOD_PREFIX: &str = "vault_";

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The host's reported version string.
    pub version: String,
    /// The hosted vault and its clock.
    pub host: Arc<VaultHost>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/challenges/:id", get(challenge_handler))
        .route("/vaults/:id/:user", get(vault_handler))
        .route("/transfers", get(transfers_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Named method parameters.
    pub params: Option<serde_json::Value>,
    /// Request identifier. Echoed back in the response.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success. A JSON `null` result decodes as
    /// `Some(Value::Null)`, distinct from an absent field.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub result: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: serde_json::Value,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Host software version.
    pub version: String,
    /// Current block height.
    pub block_height: u64,
    /// Configured challenges.
    pub challenges: usize,
    /// Vaults still active.
    pub open_vaults: usize,
    /// Locked value held in custody.
    pub locked_in_custody: u64,
    /// Transfer intents recorded.
    pub transfers: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /challenges/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge_id: ChallengeId,
    #[serde(flatten)]
    pub config: ChallengeConfig,
}

/// Response payload for `GET /vaults/:id/:user`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultResponse {
    pub challenge_id: ChallengeId,
    pub user: Principal,
    /// Height from which the vault may complete. `null` when it lies past
    /// the clock range.
    pub unlocks_at: Option<u64>,
    #[serde(flatten)]
    pub record: VaultRecord,
}

/// Query string of `GET /transfers`.
#[derive(Debug, Deserialize)]
pub struct TransferFilter {
    /// Restrict to one asset class (`locked` or `reward`).
    pub asset: Option<Asset>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the host is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns the host status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let summary = state.host.summary();
    state.metrics.refresh(&summary);

    Json(StatusResponse {
        version: state.version.clone(),
        block_height: summary.block_height,
        challenges: summary.challenges,
        open_vaults: summary.open_vaults,
        locked_in_custody: summary.locked_in_custody,
        transfers: summary.transfers,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /rpc` — JSON-RPC 2.0 gateway.
///
/// Unknown methods return -32601; params that do not decode into the
/// method's shape return -32602.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let (result, error) = if req.jsonrpc != "2.0" {
        (
            None,
            Some(JsonRpcError::new(
                -32600,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
        )
    } else {
        dispatch_rpc(&state, &req.method, req.params)
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

fn dispatch_rpc(
    state: &AppState,
    method: &str,
    params: Option<serde_json::Value>,
) -> (Option<serde_json::Value>, Option<JsonRpcError>) {
    let name = match method.strip_prefix(RPC_METHOD_PREFIX) {
        Some("blockHeight") => {
            return (Some(serde_json::json!(state.host.block_height())), None);
        }
        Some(name) if VaultCall::METHODS.contains(&name) => name,
        _ => {
            return (
                None,
                Some(JsonRpcError::new(-32601, format!("Method not found: {}", method))),
            );
        }
    };

    let params = params.unwrap_or_else(|| serde_json::json!({}));
    let call = match VaultCall::from_parts(name, params) {
        Ok(call) => call,
        Err(e) => {
            return (
                None,
                Some(JsonRpcError::new(-32602, format!("Invalid params: {}", e))),
            );
        }
    };

    let started = Instant::now();
    let result = state.host.execute(call);
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(output) => {
            state.metrics.observe_call(name, "ok", elapsed);
            state.metrics.refresh(&state.host.summary());
            match serde_json::to_value(output) {
                Ok(value) => (Some(value), None),
                Err(e) => (
                    None,
                    Some(JsonRpcError::new(-32603, format!("Internal error: {}", e))),
                ),
            }
        }
        Err(err) => {
            state
                .metrics
                .observe_call(name, &err.code().to_string(), elapsed);
            (None, Some(JsonRpcError::new(err.code() as i32, err.to_string())))
        }
    }
}

/// `GET /challenges/:id` — challenge config, 404 if not configured.
async fn challenge_handler(
    State(state): State<AppState>,
    Path(id): Path<ChallengeId>,
) -> impl IntoResponse {
    match state.host.read(|v| v.challenge(id).cloned()) {
        Some(config) => (
            StatusCode::OK,
            Json(ChallengeResponse {
                challenge_id: id,
                config,
            }),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("challenge {} not configured", id),
            }),
        )
            .into_response(),
    }
}

/// `GET /vaults/:id/:user` — one user's vault record, 404 if absent.
async fn vault_handler(
    State(state): State<AppState>,
    Path((id, user)): Path<(ChallengeId, String)>,
) -> impl IntoResponse {
    let user = Principal::new(user);
    match state.host.read(|v| v.vault(id, &user).cloned()) {
        Some(record) => (
            StatusCode::OK,
            Json(VaultResponse {
                challenge_id: id,
                unlocks_at: record.unlocks_at(),
                user,
                record,
            }),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no vault for {} in challenge {}", user, id),
            }),
        )
            .into_response(),
    }
}

/// `GET /transfers?asset=locked|reward` — recorded transfer intents.
async fn transfers_handler(
    State(state): State<AppState>,
    Query(filter): Query<TransferFilter>,
) -> impl IntoResponse {
    let transfers: Vec<Transfer> = state.host.read(|v| match filter.asset {
        Some(asset) => v.transfers().for_asset(asset).cloned().collect(),
        None => v.transfers().entries().to_vec(),
    });
    Json(transfers)
}
