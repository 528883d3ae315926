//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::game::{PlayerId, RegistryError};
use crate::http::middleware::limit_joins;
use crate::protocol::{
    AttacksBody, DisconnectRequest, HealthResponse, JoinResponse, LoadoutRequest, MapResponse,
    PositionRequest, StartBattleRequest,
};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origins);

    let join_routes = Router::new()
        .route("/join", get(join_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_joins));

    let session_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/mokepon/:player_id", post(loadout_handler))
        .route("/map/:player_id", post(map_handler))
        .route("/battle/start", post(start_battle_handler))
        .route("/battle/:player_id/end", get(end_battle_handler))
        .route(
            "/battle/:player_id",
            post(submit_attacks_handler).get(peek_attacks_handler),
        )
        .route("/disconnect", get(disconnect_handler));

    Router::new()
        .merge(join_routes)
        .merge(session_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for browser clients; any origin unless a list is configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed)
}

// ============================================================================
// Health endpoint
// ============================================================================

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: uptime_secs(),
        players: state.registry.len(),
        bonded_players: state.registry.bonded_count(),
    })
}

// ============================================================================
// Session endpoints
// ============================================================================

async fn join_handler(State(state): State<AppState>) -> Result<Json<JoinResponse>, AppError> {
    let player_id = state.registry.join()?;
    Ok(Json(JoinResponse { player_id }))
}

async fn loadout_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    Json(req): Json<LoadoutRequest>,
) -> Result<StatusCode, AppError> {
    state
        .registry
        .set_loadout(&PlayerId::new(player_id), &req.mokepon)?;
    Ok(StatusCode::OK)
}

async fn map_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    Json(req): Json<PositionRequest>,
) -> Result<Json<MapResponse>, AppError> {
    let player_id = PlayerId::new(player_id);
    let update = state.registry.update_position(&player_id, req.x, req.y)?;

    Ok(Json(MapResponse::from_update(update, &player_id)))
}

async fn disconnect_handler(
    State(state): State<AppState>,
    Json(req): Json<DisconnectRequest>,
) -> Result<StatusCode, AppError> {
    state.registry.disconnect(&req.id)?;
    Ok(StatusCode::OK)
}

// ============================================================================
// Battle endpoints
// ============================================================================

async fn start_battle_handler(
    State(state): State<AppState>,
    Json(req): Json<StartBattleRequest>,
) -> Result<StatusCode, AppError> {
    match state.registry.bond(&req.player_id, &req.opponent_id) {
        Ok(()) => Ok(StatusCode::OK),
        // A lost race for the same opponent; the caller confirms the real
        // pairing with the position push that follows an accepted start.
        Err(RegistryError::Conflict { player, partner }) => {
            debug!(
                player_id = %req.player_id,
                opponent_id = %req.opponent_id,
                busy = %player,
                busy_with = %partner,
                "Ignoring battle start for a busy player"
            );
            Ok(StatusCode::OK)
        }
        Err(e) => Err(e.into()),
    }
}

async fn end_battle_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.registry.unbond(&PlayerId::new(player_id))?;
    Ok(StatusCode::OK)
}

async fn submit_attacks_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
    Json(req): Json<AttacksBody>,
) -> Result<StatusCode, AppError> {
    let player_id = PlayerId::new(player_id);

    if let Err(e) = state.registry.submit_moves(&player_id, req.attacks) {
        warn!(player_id = %player_id, error = %e, "Rejected attacks");
        return Err(e.into());
    }
    Ok(StatusCode::OK)
}

async fn peek_attacks_handler(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<AttacksBody>, AppError> {
    let attacks = state.registry.peek_moves(&PlayerId::new(player_id))?;
    Ok(Json(AttacksBody { attacks }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Completes the `RegistryError` mapping. `/battle/start` answers bond
    /// conflicts with 200 before they reach this conversion.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        let message = err.to_string();
        match err {
            RegistryError::NotFound(_) => AppError::NotFound(message),
            RegistryError::Conflict { .. } => AppError::Conflict(message),
            RegistryError::InvalidState(_) | RegistryError::UnknownLoadout(_) => {
                AppError::BadRequest(message)
            }
            RegistryError::IdSpaceExhausted => AppError::Unavailable(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::TooManyRequests => {
                (StatusCode::TOO_MANY_REQUESTS, "Too many requests".to_string())
            }
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
