//! Prometheus metrics for the notification handler.
//!
//! - Event metrics (received by source, handled, handling latency)
//! - Template lookup outcomes
//! - Claim resolution failures
//! - Stream publish outcomes
//! - Redis subscriber health

mod helpers;

pub use helpers::{
    encode_metrics, ClaimsMetrics, EventMetrics, PublishMetrics, RedisMetrics, TemplateMetrics,
};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "notify";

lazy_static! {
    // ============================================================================
    // Event Metrics
    // ============================================================================

    /// Identity events received by source (http, redis)
    pub static ref EVENTS_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_received_total", METRIC_PREFIX),
        "Total identity events received",
        &["source"]
    ).unwrap();

    /// Events rejected before handling (malformed payloads)
    pub static ref EVENTS_REJECTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_events_rejected_total", METRIC_PREFIX),
        "Total identity events rejected before handling",
        &["source"]
    ).unwrap();

    /// Events fully handled
    pub static ref EVENTS_HANDLED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_events_handled_total", METRIC_PREFIX),
        "Total identity events handled"
    ).unwrap();

    /// Time from event receipt to publish
    pub static ref EVENT_HANDLING_LATENCY: Histogram = register_histogram!(
        format!("{}_event_handling_latency_seconds", METRIC_PREFIX),
        "Event handling latency in seconds",
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();

    // ============================================================================
    // Template Metrics
    // ============================================================================

    /// Template lookups by result (found, not_found, invalid, error)
    pub static ref TEMPLATE_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_template_lookups_total", METRIC_PREFIX),
        "Total email template lookups",
        &["result"]
    ).unwrap();

    // ============================================================================
    // Claims Metrics
    // ============================================================================

    /// Claim resolution failures by lookup mode (store, domain)
    pub static ref CLAIMS_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_claims_failures_total", METRIC_PREFIX),
        "Total user claim resolution failures",
        &["mode"]
    ).unwrap();

    // ============================================================================
    // Publish Metrics
    // ============================================================================

    /// Notifications published to the stream
    pub static ref PUBLISHED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_published_total", METRIC_PREFIX),
        "Total notifications published to the output stream"
    ).unwrap();

    /// Publish failures
    pub static ref PUBLISH_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_publish_failed_total", METRIC_PREFIX),
        "Total notification publish failures"
    ).unwrap();

    // ============================================================================
    // Redis Metrics
    // ============================================================================

    /// Redis subscriber connection status (1 = connected, 0 = disconnected)
    pub static ref REDIS_CONNECTION_STATUS: IntGauge = register_int_gauge!(
        format!("{}_redis_connection_status", METRIC_PREFIX),
        "Redis subscriber connection status (1=connected, 0=disconnected)"
    ).unwrap();

    /// Redis subscriber reconnection attempts
    pub static ref REDIS_RECONNECTIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_redis_reconnections_total", METRIC_PREFIX),
        "Total Redis subscriber reconnection attempts"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        EVENTS_HANDLED_TOTAL.inc();

        let output = encode_metrics().unwrap();
        assert!(output.contains("notify_events_handled_total"));
    }

    #[test]
    fn test_labelled_counters() {
        let before = TEMPLATE_LOOKUPS_TOTAL.with_label_values(&["found"]).get();
        TemplateMetrics::record("found");
        assert!(TEMPLATE_LOOKUPS_TOTAL.with_label_values(&["found"]).get() > before);

        ClaimsMetrics::record_failure("store");
        assert!(CLAIMS_FAILURES_TOTAL.with_label_values(&["store"]).get() >= 1);
    }
}
