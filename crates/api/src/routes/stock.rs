//! Stock ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{ActorId, ProductId};
use domain::{
    AdjustStock, Aggregate, CategoryService, InMemoryCategoryStore, InMemoryProductCatalog,
    MoveStock, Money, MovementRef, RegisterStock, SetThresholds, StockItem, StockService,
    TransferStock,
};
use ledger::LedgerStore;
use projections::{ProjectionProcessor, StockLevel, StockLevelsView};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: LedgerStore> {
    pub stock_service: StockService<S>,
    pub category_service: CategoryService<InMemoryCategoryStore, InMemoryProductCatalog>,
    /// Shared handle onto the catalog the category service checks.
    pub product_catalog: InMemoryProductCatalog,
    pub stock_levels: StockLevelsView,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterStockRequest {
    /// Omitted for a freshly generated product id.
    pub product_id: Option<ProductId>,
    pub warehouse_location: String,
    #[serde(default)]
    pub minimum_stock: i64,
    pub maximum_stock: Option<i64>,
    pub reorder_point: Option<i64>,
    pub actor: Option<ActorId>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Receive,
    Issue,
    Return,
    Adjust,
    Transfer,
    Reserve,
    Release,
}

#[derive(Deserialize)]
pub struct MovementRequest {
    pub kind: MovementKind,
    /// Positive quantity; required for every kind except `adjust`.
    pub quantity: Option<i64>,
    /// Signed correction; required for `adjust`.
    pub delta: Option<i64>,
    /// Destination location; required for `transfer`.
    pub to_location: Option<String>,
    pub unit_cost_cents: Option<i64>,
    pub reference: Option<MovementRef>,
    pub note: Option<String>,
    pub actor: Option<ActorId>,
}

#[derive(Deserialize)]
pub struct ThresholdsRequest {
    pub minimum_stock: i64,
    pub maximum_stock: Option<i64>,
    pub reorder_point: Option<i64>,
    pub actor: Option<ActorId>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    50
}

// -- Response types --

#[derive(Serialize)]
pub struct StockItemResponse {
    pub product_id: String,
    pub warehouse_location: String,
    pub on_hand: i64,
    pub reserved: i64,
    pub available: i64,
    pub minimum_stock: i64,
    pub maximum_stock: Option<i64>,
    pub reorder_point: Option<i64>,
    pub sequence: i64,
}

impl StockItemResponse {
    fn from_item(item: &StockItem) -> Self {
        Self {
            product_id: item.id().map(|id| id.to_string()).unwrap_or_default(),
            warehouse_location: item.warehouse_location().to_string(),
            on_hand: item.on_hand(),
            reserved: item.reserved(),
            available: item.available(),
            minimum_stock: item.minimum_stock(),
            maximum_stock: item.maximum_stock(),
            reorder_point: item.reorder_point(),
            sequence: item.sequence().as_i64(),
        }
    }
}

#[derive(Serialize)]
pub struct MovementEntryResponse {
    pub movement_id: String,
    pub kind: String,
    pub sequence: i64,
    pub recorded_at: String,
    pub payload: serde_json::Value,
}

// -- Handlers --

/// POST /stock — register a product in the stock ledger.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterStockRequest>,
) -> Result<(axum::http::StatusCode, Json<StockItemResponse>), ApiError> {
    let product_id = req.product_id.unwrap_or_default();

    let mut cmd = RegisterStock::new(product_id, req.warehouse_location).with_thresholds(
        req.minimum_stock,
        req.maximum_stock,
        req.reorder_point,
    );
    if let Some(actor) = req.actor {
        cmd = cmd.by(actor);
    }

    let result = state.stock_service.register(cmd).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(StockItemResponse::from_item(&result.aggregate)),
    ))
}

/// GET /stock — current levels for all products.
#[tracing::instrument(skip(state))]
pub async fn list<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<StockLevel>>, ApiError> {
    catch_up(&state).await?;
    Ok(Json(state.stock_levels.all().await))
}

/// GET /stock/low — products at or below their reorder threshold.
#[tracing::instrument(skip(state))]
pub async fn low_stock<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<StockLevel>>, ApiError> {
    catch_up(&state).await?;
    Ok(Json(state.stock_levels.low_stock().await))
}

/// GET /stock/:id — current level for one product.
#[tracing::instrument(skip(state))]
pub async fn get<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<StockLevel>, ApiError> {
    let product_id = parse_product_id(&id)?;
    catch_up(&state).await?;

    state
        .stock_levels
        .get(product_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))
}

/// POST /stock/:id/movements — apply a movement by kind.
#[tracing::instrument(skip(state, req))]
pub async fn apply_movement<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<MovementRequest>,
) -> Result<Json<StockItemResponse>, ApiError> {
    let product_id = parse_product_id(&id)?;
    let service = &state.stock_service;

    let result = match req.kind {
        MovementKind::Receive => service.receive(build_move(product_id, &req)?).await?,
        MovementKind::Issue => service.issue(build_move(product_id, &req)?).await?,
        MovementKind::Return => service.return_stock(build_move(product_id, &req)?).await?,
        MovementKind::Reserve => service.reserve(build_move(product_id, &req)?).await?,
        MovementKind::Release => service.release(build_move(product_id, &req)?).await?,
        MovementKind::Adjust => {
            let delta = req
                .delta
                .ok_or_else(|| ApiError::BadRequest("delta is required for adjust".to_string()))?;
            let mut cmd = AdjustStock::new(product_id, delta);
            cmd.reference = req.reference.clone();
            cmd.note = req.note.clone();
            cmd.actor = req.actor;
            service.adjust(cmd).await?
        }
        MovementKind::Transfer => {
            let quantity = required_quantity(&req)?;
            let to_location = req.to_location.clone().ok_or_else(|| {
                ApiError::BadRequest("to_location is required for transfer".to_string())
            })?;
            let mut cmd = TransferStock::new(product_id, quantity, to_location);
            cmd.note = req.note.clone();
            cmd.actor = req.actor;
            service.transfer(cmd).await?
        }
    };

    Ok(Json(StockItemResponse::from_item(&result.aggregate)))
}

/// GET /stock/:id/movements — the product's ledger page, newest first.
#[tracing::instrument(skip(state))]
pub async fn movements<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<MovementEntryResponse>>, ApiError> {
    let product_id = parse_product_id(&id)?;

    let entries = state
        .stock_service
        .get_movements(product_id, params.page, params.per_page)
        .await?;

    let responses: Vec<MovementEntryResponse> = entries
        .into_iter()
        .map(|e| MovementEntryResponse {
            movement_id: e.movement_id.to_string(),
            kind: e.entry_type,
            sequence: e.sequence.as_i64(),
            recorded_at: e.recorded_at.to_rfc3339(),
            payload: e.payload,
        })
        .collect();

    Ok(Json(responses))
}

/// PUT /stock/:id/thresholds — change the replenishment thresholds.
#[tracing::instrument(skip(state, req))]
pub async fn set_thresholds<S: LedgerStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ThresholdsRequest>,
) -> Result<Json<StockItemResponse>, ApiError> {
    let product_id = parse_product_id(&id)?;

    let mut cmd = SetThresholds::new(product_id, req.minimum_stock);
    cmd.maximum_stock = req.maximum_stock;
    cmd.reorder_point = req.reorder_point;
    cmd.actor = req.actor;

    let result = state.stock_service.set_thresholds(cmd).await?;
    Ok(Json(StockItemResponse::from_item(&result.aggregate)))
}

// -- Helpers --

async fn catch_up<S: LedgerStore>(state: &AppState<S>) -> Result<(), ApiError> {
    state
        .projection_processor
        .run_catch_up()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn required_quantity(req: &MovementRequest) -> Result<i64, ApiError> {
    req.quantity
        .ok_or_else(|| ApiError::BadRequest("quantity is required".to_string()))
}

fn build_move(product_id: ProductId, req: &MovementRequest) -> Result<MoveStock, ApiError> {
    let mut cmd = MoveStock::new(product_id, required_quantity(req)?);
    if let Some(cents) = req.unit_cost_cents {
        cmd = cmd.at_cost(Money::from_cents(cents));
    }
    if let Some(reference) = req.reference.clone() {
        cmd = cmd.with_reference(reference);
    }
    if let Some(note) = req.note.clone() {
        cmd = cmd.with_note(note);
    }
    if let Some(actor) = req.actor {
        cmd = cmd.by(actor);
    }
    Ok(cmd)
}

pub(crate) fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(ProductId::from(uuid))
}
