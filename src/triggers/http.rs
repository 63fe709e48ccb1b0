use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::event::{IdentityEvent, InboundEvent};
use crate::metrics::EventMetrics;
use crate::notification::HandleOutcome;
use crate::server::AppState;

const SOURCE: &str = "http";

/// Response for a handled event
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// Whether the rendered notification reached the output stream
    pub success: bool,
    #[serde(flatten)]
    pub outcome: HandleOutcome,
    /// Timestamp of the operation
    pub timestamp: DateTime<Utc>,
}

/// POST /api/v1/events - render and publish a notification for an identity event
#[tracing::instrument(name = "trigger.http", skip_all)]
pub async fn receive_event(
    State(state): State<AppState>,
    Json(request): Json<InboundEvent>,
) -> Result<Json<EventResponse>> {
    if request.event_name.trim().is_empty() {
        EventMetrics::record_rejected(SOURCE);
        return Err(AppError::Validation("event_name must not be blank".to_string()));
    }

    EventMetrics::record_received(SOURCE);
    let event = IdentityEvent::from(request);
    let outcome = state.handler.handle(&event).await;

    Ok(Json(EventResponse {
        success: outcome.published,
        outcome,
        timestamp: Utc::now(),
    }))
}
