use crate::{
    error::NodeError,
    gossip::Gossip,
    miner::{mine_next, spawn_heartbeat, MineOutcome},
    p2p,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use powchain_core::{Block, ValidityReport};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    gossip: Gossip,
    heartbeat_started: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(gossip: Gossip) -> Self {
        Self {
            gossip,
            heartbeat_started: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
struct MineRequest {
    data: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MineResponse {
    pub mined: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct ValidateQuery {
    index: Option<u64>,
}

#[derive(Deserialize)]
struct AddPeer {
    peer: String,
}

/// Node failures surface as 503; everything else is a normal response.
struct ApiError(NodeError);

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/blocks", get(blocks))
        .route("/mineBlock", post(mine_block))
        .route("/validate", get(validate))
        .route("/peers", get(peers))
        .route("/addPeer", post(add_peer))
        .route("/generateStatus", post(generate_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn blocks(State(state): State<AppState>) -> Result<Json<Vec<Block>>, ApiError> {
    Ok(Json(state.gossip.node().blocks().await?))
}

async fn mine_block(
    State(state): State<AppState>,
    Json(req): Json<MineRequest>,
) -> Result<(StatusCode, Json<MineResponse>), ApiError> {
    let outcome = mine_next(state.gossip.node(), req.data).await?;
    Ok(match outcome {
        MineOutcome::Mined(block) => {
            info!(index = block.index, hash = %block.hash, "block added");
            (
                StatusCode::OK,
                Json(MineResponse {
                    mined: true,
                    block: Some(block),
                    error: None,
                }),
            )
        }
        MineOutcome::Abandoned => (
            StatusCode::CONFLICT,
            Json(MineResponse {
                mined: false,
                block: None,
                error: Some("chain advanced while mining".to_string()),
            }),
        ),
        MineOutcome::Rejected(e) => (
            StatusCode::CONFLICT,
            Json(MineResponse {
                mined: false,
                block: None,
                error: Some(e.to_string()),
            }),
        ),
    })
}

async fn validate(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(index) = query.index else {
        return Ok(Json(json!({ "status": false })));
    };
    let status = match state.gossip.node().validate_from(index).await? {
        ValidityReport::Valid => json!(true),
        ValidityReport::Invalid => json!(false),
        ValidityReport::BrokenAt(i) => json!(format!("error on block with index {i}")),
    };
    Ok(Json(json!({ "status": status })))
}

async fn peers(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.gossip.peers().addrs())
}

async fn add_peer(State(state): State<AppState>, Json(req): Json<AddPeer>) -> StatusCode {
    p2p::spawn_connect(req.peer, state.gossip.clone());
    StatusCode::ACCEPTED
}

async fn generate_status(State(state): State<AppState>) -> StatusCode {
    if state.heartbeat_started.swap(true, Ordering::SeqCst) {
        info!("status heartbeat already running");
        return StatusCode::OK;
    }
    spawn_heartbeat(state.gossip.node().clone());
    info!("status heartbeat started");
    StatusCode::ACCEPTED
}
