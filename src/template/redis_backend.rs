//! Redis-backed template resource store.
//!
//! Layout:
//! - `{prefix}:{tenant_id}:{path}` - raw resource content
//! - `{prefix}:{tenant_id}:{path}:media-type` - optional media type

use std::sync::Arc;

use async_trait::async_trait;

use crate::redis::RedisPool;

use super::resource::{Resource, ResourceError, ResourceStore};

pub struct RedisResourceStore {
    pool: Arc<RedisPool>,
    prefix: String,
}

impl RedisResourceStore {
    pub fn new(pool: Arc<RedisPool>, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    fn content_key(&self, tenant_id: i32, path: &str) -> String {
        format!("{}:{}:{}", self.prefix, tenant_id, path)
    }

    fn media_type_key(&self, tenant_id: i32, path: &str) -> String {
        format!("{}:media-type", self.content_key(tenant_id, path))
    }
}

#[async_trait]
impl ResourceStore for RedisResourceStore {
    async fn get(&self, tenant_id: i32, path: &str) -> Result<Resource, ResourceError> {
        let content = self
            .pool
            .get_bytes(&self.content_key(tenant_id, path))
            .await
            .map_err(|e| ResourceError::Unavailable(e.to_string()))?
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))?;

        let media_type = self
            .pool
            .get_string(&self.media_type_key(tenant_id, path))
            .await
            .map_err(|e| ResourceError::Unavailable(e.to_string()))?;

        Ok(Resource {
            content,
            media_type,
        })
    }
}
