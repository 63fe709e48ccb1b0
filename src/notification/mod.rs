//! Notification rendering and publishing.
//!
//! # Storage Backends
//!
//! Claims, template resources and the output stream each sit behind a trait
//! with an in-memory and a Redis implementation:
//!
//! - `memory`: DashMap-backed stores and an in-process sink (default for tests)
//! - `redis`: claims hashes, template keys and a Pub/Sub sink sharing one pool
//!
//! Use `create_notification_handler()` to wire a handler from configuration.

mod handler;
mod publisher;
mod redis_sink;
mod types;

use std::sync::Arc;

use crate::claims::{ClaimsResolver, InMemoryRealm, RealmService, RedisRealm};
use crate::config::{Settings, StorageConfig};
use crate::redis::RedisPool;
use crate::template::{
    InMemoryResourceStore, RedisResourceStore, ResourceStore, TemplateConfig, TemplateStore,
};
use crate::tenant::StaticTenantResolver;

pub use handler::{
    payload_keys, HandleOutcome, HandlerStats, HandlerStatsSnapshot, NotificationHandler,
    HANDLER_NAME,
};
pub use publisher::{
    InMemoryPublishSink, PublishError, PublishSink, PublishedEvent, DEFAULT_RETAINED_EVENTS,
};
pub use redis_sink::RedisPublishSink;
pub use types::{RenderedNotification, RenderedNotificationBuilder};

/// Bounded in-process sink used by the memory backend
fn memory_sink(storage: &StorageConfig) -> InMemoryPublishSink {
    InMemoryPublishSink::with_capacity(storage.memory_retained_events)
}

/// Create a notification handler based on configuration.
///
/// The `storage.backend` setting selects the adapters:
/// - `"redis"`: Redis-backed claims, templates and sink if a pool is provided
/// - `"memory"`: empty in-memory stores and a bounded recording sink
///
/// # Example
///
/// ```rust,ignore
/// let handler = create_notification_handler(&settings, Some(redis_pool.clone()));
/// ```
pub fn create_notification_handler(
    settings: &Settings,
    redis_pool: Option<Arc<RedisPool>>,
) -> NotificationHandler {
    let tenants = Arc::new(StaticTenantResolver::new(settings.tenants.clone()));
    let storage = &settings.storage;

    let (realm, resources, sink) = match (storage.backend.as_str(), redis_pool) {
        ("redis", Some(pool)) => {
            tracing::info!(
                backend = "redis",
                claims_prefix = %storage.claims_prefix,
                registry_prefix = %storage.registry_prefix,
                "Creating Redis storage backends"
            );
            (
                Arc::new(RedisRealm::new(pool.clone(), storage.claims_prefix.clone()))
                    as Arc<dyn RealmService>,
                Arc::new(RedisResourceStore::new(pool.clone(), storage.registry_prefix.clone()))
                    as Arc<dyn ResourceStore>,
                Arc::new(RedisPublishSink::new(pool)) as Arc<dyn PublishSink>,
            )
        }
        (backend, _) => {
            if backend == "redis" {
                tracing::warn!(
                    "Redis storage backend requested but no pool provided, falling back to memory"
                );
            } else {
                tracing::info!(backend = "memory", "Creating memory storage backends");
            }
            (
                Arc::new(InMemoryRealm::new()) as Arc<dyn RealmService>,
                Arc::new(InMemoryResourceStore::new()) as Arc<dyn ResourceStore>,
                Arc::new(memory_sink(storage)) as Arc<dyn PublishSink>,
            )
        }
    };

    let config = settings.notification.clone();
    let claims = ClaimsResolver::new(realm, tenants.clone(), config.identity_claim_prefix.clone());
    let templates = TemplateStore::new(resources, tenants, TemplateConfig::from(&config));

    tracing::info!(
        handler = HANDLER_NAME,
        stream_id = %config.stream_id,
        template_root = %config.template_root,
        "Notification handler created"
    );

    NotificationHandler::new(config, claims, templates, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::IdentityEvent;

    #[tokio::test]
    async fn test_memory_handler_from_settings() {
        let mut settings = Settings::default();
        settings.storage.backend = "memory".to_string();

        let handler = create_notification_handler(&settings, None);
        let outcome = handler.handle(&IdentityEvent::new("accountConfirmation")).await;

        assert!(outcome.published);
        assert!(!outcome.template_found);
    }

    #[tokio::test]
    async fn test_redis_without_pool_falls_back_to_memory() {
        let settings = Settings::default();
        assert_eq!(settings.storage.backend, "redis");

        let handler = create_notification_handler(&settings, None);
        let outcome = handler.handle(&IdentityEvent::new("accountLock")).await;
        assert!(outcome.published);
    }

    #[tokio::test]
    async fn test_memory_sink_retains_configured_events() {
        let mut settings = Settings::default();
        settings.storage.backend = "memory".to_string();
        settings.storage.memory_retained_events = 8;

        let sink = memory_sink(&settings.storage);
        for _ in 0..1000 {
            sink.publish(&PublishedEvent::new("stream", Default::default()))
                .await
                .unwrap();
        }

        assert_eq!(sink.len().await, 8);
        assert_eq!(sink.capacity(), 8);
    }
}
