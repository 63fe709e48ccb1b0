//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::HandlerStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub handler: String,
    pub storage_backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisHealthResponse>,
}

#[derive(Debug, Serialize)]
pub struct RedisHealthResponse {
    pub status: String,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub handler: HandlerStatsSnapshot,
    pub stream_id: String,
    pub uptime_seconds: u64,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis = match &state.redis_pool {
        Some(pool) => {
            let connected = match pool.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Redis health check failed");
                    false
                }
            };
            Some(RedisHealthResponse {
                status: if connected { "connected" } else { "disconnected" }.to_string(),
                connected,
            })
        }
        None => None,
    };

    let healthy = redis.as_ref().map_or(true, |r| r.connected);

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        handler: state.handler.name().to_string(),
        storage_backend: state.settings.storage.backend.clone(),
        redis,
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        handler: state.handler.stats(),
        stream_id: state.settings.notification.stream_id.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
