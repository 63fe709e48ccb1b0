//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    CLAIMS_FAILURES_TOTAL, EVENTS_HANDLED_TOTAL, EVENTS_RECEIVED_TOTAL, EVENTS_REJECTED_TOTAL,
    EVENT_HANDLING_LATENCY, PUBLISHED_TOTAL, PUBLISH_FAILED_TOTAL, REDIS_CONNECTION_STATUS,
    REDIS_RECONNECTIONS_TOTAL, TEMPLATE_LOOKUPS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording event metrics
pub struct EventMetrics;

impl EventMetrics {
    /// Record an event received from a trigger source
    pub fn record_received(source: &str) {
        EVENTS_RECEIVED_TOTAL.with_label_values(&[source]).inc();
    }

    /// Record an event dropped before handling
    pub fn record_rejected(source: &str) {
        EVENTS_REJECTED_TOTAL.with_label_values(&[source]).inc();
    }

    /// Record a handled event and its latency
    pub fn record_handled(elapsed: Duration) {
        EVENTS_HANDLED_TOTAL.inc();
        EVENT_HANDLING_LATENCY.observe(elapsed.as_secs_f64());
    }
}

/// Helper struct for template lookup metrics
pub struct TemplateMetrics;

impl TemplateMetrics {
    pub fn record(result: &str) {
        TEMPLATE_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
    }
}

/// Helper struct for claim resolution metrics
pub struct ClaimsMetrics;

impl ClaimsMetrics {
    pub fn record_failure(mode: &str) {
        CLAIMS_FAILURES_TOTAL.with_label_values(&[mode]).inc();
    }
}

/// Helper struct for stream publish metrics
pub struct PublishMetrics;

impl PublishMetrics {
    pub fn record_published() {
        PUBLISHED_TOTAL.inc();
    }

    pub fn record_failed() {
        PUBLISH_FAILED_TOTAL.inc();
    }
}

/// Helper struct for Redis subscriber metrics
pub struct RedisMetrics;

impl RedisMetrics {
    pub fn set_connected(connected: bool) {
        REDIS_CONNECTION_STATUS.set(i64::from(connected));
    }

    pub fn record_reconnection() {
        REDIS_RECONNECTIONS_TOTAL.inc();
    }
}
