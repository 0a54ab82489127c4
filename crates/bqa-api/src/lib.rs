//! BQA API /v1: process_query and stream_query endpoints.
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod service;

use axum::{
    routing::{get, post},
    Router,
};
use prometheus::{IntCounter, Registry};
use service::QueryService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
    pub registry: Arc<Registry>,
    pub queries_total: IntCounter,
}

impl AppState {
    pub fn new(service: Arc<QueryService>) -> Self {
        let registry = metrics::registry();
        let queries_total =
            metrics::queries_counter(&registry).expect("fresh registry accepts the counter");
        Self {
            service,
            registry: Arc::new(registry),
            queries_total,
        }
    }
}

pub async fn create_app() -> Router {
    let state = AppState::new(Arc::new(QueryService::with_reference_agents()));
    app_with_state(state)
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/v1/query", post(handlers::process_query))
        .route("/v1/query/stream", post(handlers::stream_query))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors())
        .with_state(state)
}

pub async fn run(addr: &str) {
    let app = create_app().await;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    tracing::info!("BQA API listening on {}", addr);
    axum::serve(listener, app).await.expect("Server error");
}
