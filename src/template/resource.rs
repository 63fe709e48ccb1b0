//! Tenant-scoped template resource storage

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// A stored resource: raw content plus the media type attached by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub content: Vec<u8>,
    pub media_type: Option<String>,
}

impl Resource {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Resource store error type
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value resource store, one configuration namespace per tenant
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Read the resource at `path` in the tenant's namespace
    async fn get(&self, tenant_id: i32, path: &str) -> Result<Resource, ResourceError>;
}

/// In-memory resource store
#[derive(Default)]
pub struct InMemoryResourceStore {
    resources: DashMap<(i32, String), Resource>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resource, replacing any previous one at the same path
    pub fn put(&self, tenant_id: i32, path: impl Into<String>, resource: Resource) {
        self.resources.insert((tenant_id, path.into()), resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn get(&self, tenant_id: i32, path: &str) -> Result<Resource, ResourceError> {
        self.resources
            .get(&(tenant_id, path.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }
}
