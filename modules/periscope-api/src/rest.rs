//! HTTP handlers for the detection engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use periscope_engine::ConnectionEngine;

pub struct AppState {
    pub engine: ConnectionEngine,
    /// One detection run at a time per process — a second request gets 409.
    pub run_lock: AtomicBool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetectRequest {
    /// Single-organization mode when present; all-organizations otherwise.
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub min_facts: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizations_processed: Option<u32>,
    pub connections_detected: u32,
    pub signals_created: u32,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

pub async fn detect_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DetectRequest>,
) -> Response {
    if state
        .run_lock
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "success": false,
                "error": "detection run already in progress"
            })),
        )
            .into_response();
    }

    let response = run_detection(&state, request).await;
    state.run_lock.store(false, Ordering::SeqCst);
    response
}

async fn run_detection(state: &AppState, request: DetectRequest) -> Response {
    let started = Instant::now();

    match request.organization_id {
        Some(raw) => {
            let organization_id = match Uuid::parse_str(&raw) {
                Ok(id) => id,
                Err(_) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(serde_json::json!({
                            "success": false,
                            "error": format!("invalid organization_id: {raw}")
                        })),
                    )
                        .into_response();
                }
            };

            info!(organization_id = %organization_id, "Detection requested");
            match state
                .engine
                .run_organization(organization_id, request.min_facts)
                .await
            {
                Ok(report) => Json(DetectResponse {
                    success: true,
                    organizations_processed: None,
                    connections_detected: report.connections_detected,
                    signals_created: report.signals_created,
                    duration_seconds: started.elapsed().as_secs_f64(),
                    errors: report.errors,
                })
                .into_response(),
                Err(e) => internal_error(e),
            }
        }
        None => {
            info!("Detection requested for all organizations");
            match state.engine.run_all(request.min_facts).await {
                Ok(batch) => Json(DetectResponse {
                    success: true,
                    organizations_processed: Some(batch.organizations_processed),
                    connections_detected: batch.connections_detected,
                    signals_created: batch.signals_created,
                    duration_seconds: started.elapsed().as_secs_f64(),
                    errors: batch.errors,
                })
                .into_response(),
                Err(e) => internal_error(e),
            }
        }
    }
}

fn internal_error(e: anyhow::Error) -> Response {
    error!(error = %e, "Detection run failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"success": false, "error": e.to_string()})),
    )
        .into_response()
}
