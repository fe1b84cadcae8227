//! HTTP API server with observability for the inventory core.
//!
//! Provides REST endpoints for the stock ledger and the category tree,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::{CategoryService, InMemoryCategoryStore, InMemoryProductCatalog, StockService};
use ledger::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{Projection, ProjectionProcessor, StockLevelsView};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::stock::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: LedgerStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/stock", post(routes::stock::register::<S>))
        .route("/stock", get(routes::stock::list::<S>))
        .route("/stock/low", get(routes::stock::low_stock::<S>))
        .route("/stock/{id}", get(routes::stock::get::<S>))
        .route(
            "/stock/{id}/movements",
            post(routes::stock::apply_movement::<S>),
        )
        .route("/stock/{id}/movements", get(routes::stock::movements::<S>))
        .route(
            "/stock/{id}/thresholds",
            put(routes::stock::set_thresholds::<S>),
        )
        .route("/categories", post(routes::categories::create::<S>))
        .route("/categories", get(routes::categories::list::<S>))
        .route("/categories/tree", get(routes::categories::tree::<S>))
        .route("/categories/stats", get(routes::categories::stats::<S>))
        .route("/categories/{id}", get(routes::categories::get::<S>))
        .route("/categories/{id}", put(routes::categories::update::<S>))
        .route("/categories/{id}", delete(routes::categories::remove::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over the given ledger store.
pub fn create_default_state<S: LedgerStore + Clone + 'static>(
    ledger_store: S,
) -> (Arc<AppState<S>>, Arc<ProjectionProcessor<S>>) {
    let stock_service = StockService::new(ledger_store.clone());

    let category_store = InMemoryCategoryStore::new();
    let product_catalog = InMemoryProductCatalog::new();
    let category_service = CategoryService::new(category_store, product_catalog.clone());

    let stock_levels = StockLevelsView::new();

    let mut processor = ProjectionProcessor::new(ledger_store);
    processor.register(Box::new(stock_levels.clone()) as Box<dyn Projection>);
    let processor = Arc::new(processor);

    let state = Arc::new(AppState {
        stock_service,
        category_service,
        product_catalog,
        stock_levels,
        projection_processor: processor.clone(),
    });

    (state, processor)
}
