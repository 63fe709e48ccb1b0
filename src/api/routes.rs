use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;
use crate::triggers::receive_event;

use super::health::{health, stats};
use super::metrics::prometheus_metrics;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Event intake
        .nest(
            "/api/v1",
            Router::new().route("/events", post(receive_event)),
        )
}
