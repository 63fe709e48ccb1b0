//! Redis pub/sub publish sink.
//!
//! Each record is serialized as JSON and published on the channel named by
//! its stream identifier.

use std::sync::Arc;

use async_trait::async_trait;

use crate::redis::RedisPool;

use super::publisher::{PublishError, PublishSink, PublishedEvent};

pub struct RedisPublishSink {
    pool: Arc<RedisPool>,
}

impl RedisPublishSink {
    pub fn new(pool: Arc<RedisPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PublishSink for RedisPublishSink {
    async fn publish(&self, event: &PublishedEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event)?;
        let receivers = self.pool.publish(&event.stream_id, &payload).await?;

        if receivers == 0 {
            tracing::warn!(
                stream_id = %event.stream_id,
                event_id = %event.id,
                "Published notification has no stream subscribers"
            );
        } else {
            tracing::debug!(
                stream_id = %event.stream_id,
                event_id = %event.id,
                receivers = receivers,
                "Published notification"
            );
        }

        Ok(())
    }
}
