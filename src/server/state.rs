use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::notification::{create_notification_handler, NotificationHandler};
use crate::redis::{PoolError, RedisPool};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub handler: Arc<NotificationHandler>,
    pub redis_pool: Option<Arc<RedisPool>>,
    pub start_time: Instant,
}

impl AppState {
    /// Build state from configuration. A Redis pool is created only for the
    /// `redis` storage backend.
    pub fn new(settings: Settings) -> Result<Self, PoolError> {
        let redis_pool = if settings.storage.backend == "redis" {
            Some(Arc::new(RedisPool::new(&settings.redis)?))
        } else {
            None
        };

        let handler = Arc::new(create_notification_handler(&settings, redis_pool.clone()));
        Ok(Self::with_handler(settings, handler, redis_pool))
    }

    /// Build state around an already-wired handler
    pub fn with_handler(
        settings: Settings,
        handler: Arc<NotificationHandler>,
        redis_pool: Option<Arc<RedisPool>>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            handler,
            redis_pool,
            start_time: Instant::now(),
        }
    }
}
