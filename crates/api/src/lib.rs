//! HTTP API server and consumer wiring for the billing service.
//!
//! Exposes the purchase, pricing and account-check endpoints with
//! structured logging (tracing) and Prometheus metrics. The heavy lifting
//! lives in the `billing` crate; this layer parses requests, maps the
//! error taxonomy to HTTP statuses and wires dependencies together.

pub mod config;
pub mod consumer;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use billing::{BillingQueries, PricingEngine, PurchaseSaga, SnapshotResolver};
use cache::{InMemoryCache, SnapshotCache};
use domain::{AccountStore, InMemoryStore, ProductStore};
use events::{ConnectionHealth, EventEmitter, EventSink, InMemorySink};
use metrics_exporter_prometheus::PrometheusHandle;
use provider::{BillingProvider, InMemoryBillingProvider};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::billing::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<St, P, C, K>(
    state: Arc<AppState<St, P, C, K>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    St: AccountStore + ProductStore + 'static,
    P: BillingProvider + 'static,
    C: SnapshotCache + 'static,
    K: EventSink + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/billing/barcodes/buy",
            post(routes::billing::buy::<St, P, C, K>),
        )
        .route(
            "/billing/calculate-price",
            post(routes::billing::calculate_price::<St, P, C, K>),
        )
        .route(
            "/billing/check/coupon/{code}",
            post(routes::billing::check_coupon::<St, P, C, K>),
        )
        .route(
            "/billing/check/credits",
            get(routes::billing::check_credits::<St, P, C, K>),
        )
        .route(
            "/billing/check/subscription",
            get(routes::billing::check_subscription::<St, P, C, K>),
        )
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

/// In-memory application state for tests and local experiments.
///
/// Returns the state plus handles to the fakes so callers can seed
/// products, accounts and provider entities.
pub fn create_default_state() -> (
    Arc<AppState<InMemoryStore, InMemoryBillingProvider, InMemoryCache, InMemorySink>>,
    InMemoryStore,
    InMemoryBillingProvider,
    InMemorySink,
) {
    let store = InMemoryStore::new();
    let provider = InMemoryBillingProvider::new();
    let cache = InMemoryCache::new();
    let sink = InMemorySink::new();
    let health = ConnectionHealth::new();
    health.mark_ready();
    let emitter = EventEmitter::new(sink.clone(), health);

    let state = Arc::new(AppState {
        purchase: PurchaseSaga::new(
            store.clone(),
            provider.clone(),
            emitter,
            "barcode",
        ),
        pricing: PricingEngine::new(SnapshotResolver::new(
            cache.clone(),
            provider.clone(),
            store.clone(),
        )),
        queries: BillingQueries::new(store.clone(), provider.clone()),
    });

    (state, store, provider, sink)
}
