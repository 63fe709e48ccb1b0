//! Output stream publishing.
//!
//! The handler hands every rendered notification to a [`PublishSink`] as a
//! flat string map tagged with a versioned stream identifier.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors that can occur while publishing to the output stream.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] crate::redis::PoolError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A record published to the output stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEvent {
    /// Unique identifier for this record
    pub id: Uuid,
    /// Versioned stream identifier, e.g. `id_gov_notify_stream:1.0.0`
    pub stream_id: String,
    /// Publish time in epoch milliseconds
    pub timestamp: i64,
    /// Flat string payload
    pub payload: HashMap<String, String>,
}

impl PublishedEvent {
    pub fn new(stream_id: impl Into<String>, payload: HashMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream_id: stream_id.into(),
            timestamp: Utc::now().timestamp_millis(),
            payload,
        }
    }

    /// Payload value, empty when absent
    pub fn get(&self, key: &str) -> &str {
        self.payload.get(key).map_or("", String::as_str)
    }
}

/// Destination for rendered notifications
#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn publish(&self, event: &PublishedEvent) -> Result<(), PublishError>;
}

/// Records kept by [`InMemoryPublishSink::new`]
pub const DEFAULT_RETAINED_EVENTS: usize = 1024;

/// In-memory sink keeping the most recent published events.
///
/// Older records are evicted once `capacity` is reached.
#[derive(Debug)]
pub struct InMemoryPublishSink {
    events: RwLock<VecDeque<PublishedEvent>>,
    capacity: usize,
}

impl Default for InMemoryPublishSink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RETAINED_EVENTS)
    }
}

impl InMemoryPublishSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_RETAINED_EVENTS))),
            capacity,
        }
    }

    /// Retained events, oldest first
    pub async fn published(&self) -> Vec<PublishedEvent> {
        self.events.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl PublishSink for InMemoryPublishSink {
    async fn publish(&self, event: &PublishedEvent) -> Result<(), PublishError> {
        tracing::debug!(
            event_id = %event.id,
            stream_id = %event.stream_id,
            send_to = %event.get("send-to"),
            "Notification published to memory sink"
        );

        let mut events = self.events.write().await;
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_records_events() {
        let sink = InMemoryPublishSink::new();
        assert!(sink.is_empty().await);

        let payload = HashMap::from([("send-to".to_string(), "jane@example.com".to_string())]);
        let event = PublishedEvent::new("id_gov_notify_stream:1.0.0", payload);
        sink.publish(&event).await.unwrap();

        let published = sink.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0], event);
        assert_eq!(published[0].get("send-to"), "jane@example.com");
        assert_eq!(published[0].get("subject"), "");
        assert!(published[0].timestamp > 0);
    }

    #[tokio::test]
    async fn test_memory_sink_is_bounded() {
        let sink = InMemoryPublishSink::with_capacity(3);

        for i in 0..10 {
            let payload = HashMap::from([("subject".to_string(), i.to_string())]);
            sink.publish(&PublishedEvent::new("stream", payload))
                .await
                .unwrap();
        }

        let subjects: Vec<String> = sink
            .published()
            .await
            .iter()
            .map(|e| e.get("subject").to_string())
            .collect();
        assert_eq!(subjects, vec!["7", "8", "9"]);
        assert_eq!(sink.capacity(), 3);
    }
}
