//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// "configured" when an API key is present, otherwise "disabled"
    pub generation: &'static str,
}

/// Health check handler
///
/// Always 200: the catalog path works without the generative backend.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let generation = if state.generator().is_some() {
        "configured"
    } else {
        "disabled"
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            generation,
        }),
    )
}
