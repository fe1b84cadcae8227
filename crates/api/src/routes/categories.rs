//! Category tree endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::CategoryId;
use domain::{Category, CategoryNode, CategoryPatch, CategoryStats, NewCategory};
use ledger::LedgerStore;
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::stock::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_inactive: bool,
}

/// POST /categories — create a category.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewCategory>,
) -> Result<(axum::http::StatusCode, Json<Category>), ApiError> {
    let category = state.category_service.create(req).await?;
    Ok((axum::http::StatusCode::CREATED, Json(category)))
}

/// GET /categories — flat list, ordered by display order then id.
#[tracing::instrument(skip(state))]
pub async fn list<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Category>> {
    Json(state.category_service.list(params.include_inactive).await)
}

/// GET /categories/tree — active categories nested as a forest.
#[tracing::instrument(skip(state))]
pub async fn tree<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<CategoryNode>> {
    Json(state.category_service.tree().await)
}

/// GET /categories/stats — per-category child and product counts.
#[tracing::instrument(skip(state))]
pub async fn stats<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<Vec<CategoryStats>> {
    Json(state.category_service.stats().await)
}

/// GET /categories/:id — a single category.
#[tracing::instrument(skip(state))]
pub async fn get<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Category>, ApiError> {
    let category_id = parse_category_id(&id)?;
    let category = state.category_service.get(category_id).await?;
    Ok(Json(category))
}

/// PUT /categories/:id — apply a partial update.
#[tracing::instrument(skip(state, patch))]
pub async fn update<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(patch): Json<CategoryPatch>,
) -> Result<Json<Category>, ApiError> {
    let category_id = parse_category_id(&id)?;
    let category = state.category_service.update(category_id, patch).await?;
    Ok(Json(category))
}

/// DELETE /categories/:id — delete a category with no children or products.
#[tracing::instrument(skip(state))]
pub async fn remove<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<axum::http::StatusCode, ApiError> {
    let category_id = parse_category_id(&id)?;
    state.category_service.remove(category_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

fn parse_category_id(id: &str) -> Result<CategoryId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(CategoryId::from(uuid))
}
