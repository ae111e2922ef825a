//! HTTP polling API over a shared [`Fleet`].

use std::fmt;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::fleet::Fleet;
use crate::stats::FleetStats;
use crate::types::{Mission, MissionId, Robot, RobotId};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));
        (self.status, body).into_response()
    }
}

/// Body of `POST /robots/{id}/cancel`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
}

/// Build the router; robots, missions, and stats are read-only snapshots.
pub fn router(fleet: Arc<Fleet>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/robots", get(list_robots))
        .route("/robots/{id}", get(get_robot))
        .route("/robots/{id}/cancel", post(cancel_robot))
        .route("/missions", get(list_missions))
        .route("/missions/{id}", get(get_mission))
        .route("/stats", get(stats))
        .with_state(fleet)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health(State(fleet): State<Arc<Fleet>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "fleet-sim",
        "timestamp": fleet.now().to_rfc3339(),
    }))
}

async fn list_robots(State(fleet): State<Arc<Fleet>>) -> Json<Vec<Robot>> {
    Json(fleet.robots())
}

/// Path ids are taken as raw strings so a malformed id reads as an unknown
/// one instead of axum's plain-text rejection.
fn parse_id(raw: &str) -> Option<u64> {
    raw.parse().ok()
}

async fn get_robot(
    State(fleet): State<Arc<Fleet>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Robot>> {
    parse_id(&raw)
        .and_then(|id: RobotId| fleet.robot(id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("robot {raw} not found")))
}

async fn cancel_robot(
    State(fleet): State<Arc<Fleet>>,
    Path(raw): Path<String>,
) -> Json<CancelResponse> {
    Json(CancelResponse {
        success: parse_id(&raw).is_some_and(|id: RobotId| fleet.cancel(id)),
    })
}

async fn list_missions(State(fleet): State<Arc<Fleet>>) -> Json<Vec<Mission>> {
    Json(fleet.missions())
}

async fn get_mission(
    State(fleet): State<Arc<Fleet>>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Mission>> {
    parse_id(&raw)
        .and_then(|id: MissionId| fleet.mission(id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("mission {raw} not found")))
}

async fn stats(State(fleet): State<Arc<Fleet>>) -> Json<FleetStats> {
    Json(fleet.stats())
}
