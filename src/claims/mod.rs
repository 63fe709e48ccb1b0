//! User claims and their placeholder contributions.
//!
//! Claims are named user attributes (`http://wso2.org/claims/givenname`,
//! `http://wso2.org/claims/identity/accountLocked`, ...) held by a user store.
//! The [`ClaimsResolver`] fetches them and folds them into the placeholder
//! map under flat `user.claim.*` keys.
//!
//! # Store Architecture
//!
//! - `UserStoreManager`: one user store (primary or secondary domain) of a tenant
//! - `RealmService`: locates the user store for a tenant id and store domain
//! - `DomainNameAware`: optional capability of stores that know their domain name
//!
//! Implementations:
//! - `InMemoryUserStore` / `InMemoryRealm`: DashMap-backed (default for tests)
//! - `RedisUserStore` / `RedisRealm`: claims stored as Redis hashes

mod memory_backend;
mod redis_backend;
mod resolver;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory_backend::{InMemoryRealm, InMemoryUserStore};
pub use redis_backend::{RedisRealm, RedisUserStore};
pub use resolver::{ClaimsResolver, CLAIM_KEY_PREFIX};

/// Profile whose claims are used for notifications
pub const DEFAULT_PROFILE: &str = "default";

/// Domain name reported for stores that declare none
pub const PRIMARY_DOMAIN: &str = "PRIMARY";

/// A single user claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub uri: String,
    pub value: String,
}

impl Claim {
    pub fn new(uri: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            value: value.into(),
        }
    }
}

/// User store error type
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User store not found for domain {domain} in tenant {tenant_id}")]
    StoreNotFound { domain: String, tenant_id: i32 },

    #[error("User store unavailable: {0}")]
    Unavailable(String),
}

/// Capability of user stores that know their configured domain name
pub trait DomainNameAware {
    /// Configured domain name, `None` when the store declares none
    fn domain_name(&self) -> Option<String>;
}

/// A user store of one tenant
#[async_trait]
pub trait UserStoreManager: Send + Sync {
    /// Fetch all claim values of a user for the given profile
    async fn user_claim_values(
        &self,
        username: &str,
        profile: &str,
    ) -> Result<Vec<Claim>, UserStoreError>;

    /// Tenant owning this store
    fn tenant_id(&self) -> i32;

    /// Domain name capability, for stores that have one
    fn domain_name_aware(&self) -> Option<&dyn DomainNameAware> {
        None
    }
}

/// Locates user stores by tenant and store domain
#[async_trait]
pub trait RealmService: Send + Sync {
    async fn user_store_manager(
        &self,
        tenant_id: i32,
        domain: &str,
    ) -> Result<Arc<dyn UserStoreManager>, UserStoreError>;
}

/// Domain name of a store, falling back to the primary domain for
/// domain-aware stores that declare none.
pub fn user_store_domain_name(store: &dyn UserStoreManager) -> Option<String> {
    store.domain_name_aware().map(|aware| {
        aware
            .domain_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| PRIMARY_DOMAIN.to_string())
    })
}
