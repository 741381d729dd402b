//! State profile and block report endpoints

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::states::{AssessmentCategory, BlockReport, StateGroundwaterProfile};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StateSummary {
    key: String,
    name: String,
    category: AssessmentCategory,
    extraction_stage: f64,
}

/// GET /states
pub async fn list_handler(State(state): State<AppState>) -> Json<Vec<StateSummary>> {
    Json(
        state
            .atlas()
            .profiles()
            .iter()
            .map(|profile| StateSummary {
                key: profile.key().to_string(),
                name: profile.name().to_string(),
                category: profile.category(),
                extraction_stage: profile.extraction_stage(),
            })
            .collect(),
    )
}

/// GET /states/{key}, where `key` may also be the state name
pub async fn profile_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<StateGroundwaterProfile>> {
    state
        .atlas()
        .profile(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("state profile '{}'", key)))
}

/// GET /blocks/{key}
pub async fn block_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<BlockReport>> {
    state
        .atlas()
        .block(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("block report '{}'", key)))
}
