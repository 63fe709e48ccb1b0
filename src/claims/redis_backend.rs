//! Redis-backed user stores.
//!
//! Claims of a user are stored as a hash keyed by claim uri:
//!
//! ```text
//! HSET {prefix}:{tenant_id}:{DOMAIN}:{username} http://wso2.org/claims/givenname Jane
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::redis::RedisPool;

use super::{Claim, DomainNameAware, RealmService, UserStoreError, UserStoreManager};

/// One user store domain of a tenant, read from Redis
pub struct RedisUserStore {
    pool: Arc<RedisPool>,
    prefix: String,
    tenant_id: i32,
    domain: String,
}

impl RedisUserStore {
    pub fn new(pool: Arc<RedisPool>, prefix: impl Into<String>, tenant_id: i32, domain: &str) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
            tenant_id,
            domain: domain.to_uppercase(),
        }
    }

    /// Hash key holding a user's claims
    pub fn user_key(&self, username: &str) -> String {
        format!("{}:{}:{}:{}", self.prefix, self.tenant_id, self.domain, username)
    }
}

impl DomainNameAware for RedisUserStore {
    fn domain_name(&self) -> Option<String> {
        Some(self.domain.clone())
    }
}

#[async_trait]
impl UserStoreManager for RedisUserStore {
    async fn user_claim_values(
        &self,
        username: &str,
        _profile: &str,
    ) -> Result<Vec<Claim>, UserStoreError> {
        let key = self.user_key(username);
        let fields = self
            .pool
            .hgetall(&key)
            .await
            .map_err(|e| UserStoreError::Unavailable(e.to_string()))?;

        if fields.is_empty() {
            return Err(UserStoreError::UserNotFound(username.to_string()));
        }

        Ok(fields
            .into_iter()
            .map(|(uri, value)| Claim { uri, value })
            .collect())
    }

    fn tenant_id(&self) -> i32 {
        self.tenant_id
    }

    fn domain_name_aware(&self) -> Option<&dyn DomainNameAware> {
        Some(self)
    }
}

/// Realm handing out [`RedisUserStore`]s for any tenant and domain
pub struct RedisRealm {
    pool: Arc<RedisPool>,
    prefix: String,
}

impl RedisRealm {
    pub fn new(pool: Arc<RedisPool>, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl RealmService for RedisRealm {
    async fn user_store_manager(
        &self,
        tenant_id: i32,
        domain: &str,
    ) -> Result<Arc<dyn UserStoreManager>, UserStoreError> {
        if domain.trim().is_empty() {
            return Err(UserStoreError::StoreNotFound {
                domain: domain.to_string(),
                tenant_id,
            });
        }
        Ok(Arc::new(RedisUserStore::new(
            self.pool.clone(),
            self.prefix.clone(),
            tenant_id,
            domain,
        )))
    }
}
