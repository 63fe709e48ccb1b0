use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast;

use crate::config::RedisConfig;
use crate::event::{IdentityEvent, InboundEvent};
use crate::metrics::{EventMetrics, RedisMetrics};
use crate::notification::{HandleOutcome, NotificationHandler};
use crate::redis::{BackoffConfig, ExponentialBackoff};

const SOURCE: &str = "redis";

/// Channel subscribed when none is configured
pub const DEFAULT_EVENT_CHANNEL: &str = "identity:events";

/// Redis Pub/Sub subscriber feeding identity events to the handler.
///
/// Messages are handled one at a time per subscription. Lost connections are
/// retried with exponential backoff until shutdown.
pub struct RedisEventSubscriber {
    config: RedisConfig,
    handler: Arc<NotificationHandler>,
    backoff: BackoffConfig,
    shutdown: broadcast::Sender<()>,
}

impl RedisEventSubscriber {
    pub fn new(config: RedisConfig, handler: Arc<NotificationHandler>) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            backoff: BackoffConfig::from(&config),
            config,
            handler,
            shutdown,
        }
    }

    /// Override the reconnection backoff
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Configured channels, or the default event channel
    pub fn channels(&self) -> Vec<String> {
        if self.config.channels.is_empty() {
            vec![DEFAULT_EVENT_CHANNEL.to_string()]
        } else {
            self.config.channels.clone()
        }
    }

    /// Run the subscriber until a shutdown signal arrives
    pub async fn start(&self) -> anyhow::Result<()> {
        let channels = self.channels();
        tracing::info!(channels = ?channels, "Starting Redis event subscriber");

        let mut backoff = ExponentialBackoff::with_config(self.backoff.clone());
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            match self.run_subscription_loop(&channels, &mut backoff).await {
                Ok(()) => {
                    tracing::info!("Redis event subscriber stopped gracefully");
                    break;
                }
                Err(e) => {
                    RedisMetrics::set_connected(false);
                    RedisMetrics::record_reconnection();
                    let delay = backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Redis subscription error, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Shutdown during reconnect backoff");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        RedisMetrics::set_connected(false);
        Ok(())
    }

    async fn run_subscription_loop(
        &self,
        channels: &[String],
        backoff: &mut ExponentialBackoff,
    ) -> anyhow::Result<()> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in channels {
            if channel.contains('*') || channel.contains('?') || channel.contains('[') {
                pubsub.psubscribe(channel).await?;
                tracing::debug!(pattern = %channel, "Subscribed to pattern");
            } else {
                pubsub.subscribe(channel).await?;
                tracing::debug!(channel = %channel, "Subscribed to channel");
            }
        }

        tracing::info!("Redis subscription established");
        RedisMetrics::set_connected(true);
        backoff.reset();

        let mut message_stream = pubsub.on_message();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    return Ok(());
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(msg) => {
                            let channel = msg.get_channel_name().to_string();
                            let payload: String = match msg.get_payload() {
                                Ok(p) => p,
                                Err(e) => {
                                    tracing::warn!(error = %e, channel = %channel, "Failed to get message payload");
                                    EventMetrics::record_rejected(SOURCE);
                                    continue;
                                }
                            };

                            self.handle_payload(&channel, &payload).await;
                        }
                        None => {
                            anyhow::bail!("Redis message stream ended");
                        }
                    }
                }
            }
        }
    }

    /// Parse and handle one message. Malformed payloads are logged and dropped.
    #[tracing::instrument(name = "trigger.redis", skip(self, payload))]
    pub async fn handle_payload(&self, channel: &str, payload: &str) -> Option<HandleOutcome> {
        let inbound: InboundEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    channel = %channel,
                    payload = %payload,
                    "Failed to parse identity event"
                );
                EventMetrics::record_rejected(SOURCE);
                return None;
            }
        };

        if inbound.event_name.trim().is_empty() {
            tracing::warn!(channel = %channel, "Identity event without event name");
            EventMetrics::record_rejected(SOURCE);
            return None;
        }

        EventMetrics::record_received(SOURCE);
        let outcome = self.handler.handle(&IdentityEvent::from(inbound)).await;

        tracing::debug!(
            channel = %channel,
            event_id = %outcome.event_id,
            template_found = outcome.template_found,
            published = outcome.published,
            "Handled identity event from Redis"
        );

        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::notification::create_notification_handler;

    fn subscriber(channels: Vec<String>) -> RedisEventSubscriber {
        let mut settings = Settings::default();
        settings.storage.backend = "memory".to_string();
        let handler = Arc::new(create_notification_handler(&settings, None));
        let config = RedisConfig {
            channels,
            ..RedisConfig::default()
        };
        RedisEventSubscriber::new(config, handler)
    }

    #[test]
    fn test_default_channel() {
        assert_eq!(subscriber(vec![]).channels(), vec!["identity:events"]);
        assert_eq!(
            subscriber(vec!["tenant:*:events".to_string()]).channels(),
            vec!["tenant:*:events"]
        );
    }

    #[tokio::test]
    async fn test_handle_payload() {
        let subscriber = subscriber(vec![]);
        let payload = r#"{
            "event_name": "TRIGGER_NOTIFICATION",
            "properties": {
                "notification-event": "passwordReset",
                "user-name": "jane"
            }
        }"#;

        let outcome = subscriber
            .handle_payload("identity:events", payload)
            .await
            .unwrap();
        assert_eq!(outcome.notification_type, "passwordReset");
        assert!(outcome.published);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let subscriber = subscriber(vec![]);
        assert!(subscriber.handle_payload("identity:events", "not json").await.is_none());
        assert!(subscriber
            .handle_payload("identity:events", r#"{"event_name": " "}"#)
            .await
            .is_none());
    }
}
