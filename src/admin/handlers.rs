use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::resilience::{BreakerSnapshot, HealthReport};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub breakers: usize,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub reset: Vec<String>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        breakers: state.manager.len(),
    })
}

pub async fn get_breakers(
    State(state): State<AdminState>,
) -> Json<BTreeMap<String, BreakerSnapshot>> {
    Json(state.manager.get_all_states())
}

/// 200 when every breaker is closed, 503 otherwise; the body is the same report.
pub async fn get_health(State(state): State<AdminState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.manager.get_health_status();
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

pub async fn reset_all(State(state): State<AdminState>) -> Json<ResetResponse> {
    state.manager.reset_all();
    Json(ResetResponse {
        reset: state.manager.service_names(),
    })
}

pub async fn reset_one(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<ResetResponse>, StatusCode> {
    if state.manager.reset(&name) {
        Ok(Json(ResetResponse { reset: vec![name] }))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
