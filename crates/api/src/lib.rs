//! HTTP API server with observability for the kitchen order system.
//!
//! Provides REST endpoints for products, tags and orders, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};
use domain::{MAX_IMAGE_BYTES, OrderService, ProductService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest accepted request body: a base64-encoded image of
/// [`MAX_IMAGE_BYTES`] plus 1 MiB for the rest of the JSON document.
pub const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES.div_ceil(3) * 4 + 1024 * 1024;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orders: OrderService<S>,
    pub products: ProductService<S>,
    /// Name of the store backend, reported by the health check.
    pub backend: &'static str,
}

/// Creates the application state over a store.
pub fn create_state<S: Store + Clone>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        backend: store.backend(),
        orders: OrderService::new(store.clone()),
        products: ProductService::new(store),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<S>))
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .patch(routes::products::edit::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route("/tags", get(routes::products::tags::<S>))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", put(routes::orders::set_status::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
