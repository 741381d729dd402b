//! Catalog browsing endpoints

use crate::catalog::{DisplayHint, ResponseCatalogEntry};
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CatalogSummary {
    id: String,
    title: String,
    display_hint: DisplayHint,
}

/// GET /catalog: every entry's id, title and display hint in catalog order
pub async fn list_handler(State(state): State<AppState>) -> Json<Vec<CatalogSummary>> {
    Json(
        state
            .catalog()
            .entries()
            .iter()
            .map(|entry| CatalogSummary {
                id: entry.id().to_string(),
                title: entry.title().to_string(),
                display_hint: entry.display_hint(),
            })
            .collect(),
    )
}

/// GET /catalog/{id}
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ResponseCatalogEntry>> {
    state
        .catalog()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("catalog entry '{}'", id)))
}
