use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::TrafficError;
use crate::traffic::{Direction, ScopeKey, ScopeSnapshot, TrafficController};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub outbound_scopes: usize,
    pub inbound_scopes: usize,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub async fn get_status(State(controller): State<Arc<TrafficController>>) -> Json<SystemStatus> {
    let snapshots = controller.snapshot_all();
    let outbound_scopes = snapshots
        .iter()
        .filter(|s| s.direction == Direction::Outbound)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        outbound_scopes,
        inbound_scopes: snapshots.len() - outbound_scopes,
    })
}

pub async fn list_scopes(
    State(controller): State<Arc<TrafficController>>,
) -> Json<Vec<ScopeSnapshot>> {
    Json(controller.snapshot_all())
}

/// `scope` is the textual key, e.g. `provider:openai`.
pub async fn get_scope(
    State(controller): State<Arc<TrafficController>>,
    Path(scope): Path<String>,
) -> Response {
    let result = ScopeKey::parse(&scope)
        .ok_or_else(|| TrafficError::ScopeNotFound(scope.clone()))
        .and_then(|key| controller.snapshot(&key));

    match result {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "scope_not_found",
                message: e.to_string(),
            }),
        )
            .into_response(),
    }
}
