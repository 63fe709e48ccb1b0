//! In-memory user stores using DashMap

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Claim, DomainNameAware, RealmService, UserStoreError, UserStoreManager};

/// In-memory user store.
///
/// Holds claims per username for a single tenant. Mostly used in tests and
/// the `memory` storage backend.
pub struct InMemoryUserStore {
    tenant_id: i32,
    domain_name: Option<String>,
    users: DashMap<String, Vec<Claim>>,
}

impl InMemoryUserStore {
    pub fn new(tenant_id: i32, domain_name: Option<&str>) -> Self {
        Self {
            tenant_id,
            domain_name: domain_name.map(str::to_string),
            users: DashMap::new(),
        }
    }

    /// Replace all claims of a user
    pub fn set_claims(&self, username: &str, claims: Vec<Claim>) {
        self.users.insert(username.to_string(), claims);
    }

    /// Number of users in the store
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl DomainNameAware for InMemoryUserStore {
    fn domain_name(&self) -> Option<String> {
        self.domain_name.clone()
    }
}

#[async_trait]
impl UserStoreManager for InMemoryUserStore {
    async fn user_claim_values(
        &self,
        username: &str,
        _profile: &str,
    ) -> Result<Vec<Claim>, UserStoreError> {
        self.users
            .get(username)
            .map(|claims| claims.clone())
            .ok_or_else(|| UserStoreError::UserNotFound(username.to_string()))
    }

    fn tenant_id(&self) -> i32 {
        self.tenant_id
    }

    fn domain_name_aware(&self) -> Option<&dyn DomainNameAware> {
        Some(self)
    }
}

/// In-memory realm: user stores keyed by tenant id and (upper-cased) domain
#[derive(Default)]
pub struct InMemoryRealm {
    stores: DashMap<(i32, String), Arc<dyn UserStoreManager>>,
}

impl InMemoryRealm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the user store serving `domain` in a tenant
    pub fn register(&self, tenant_id: i32, domain: &str, store: Arc<dyn UserStoreManager>) {
        self.stores
            .insert((tenant_id, domain.to_uppercase()), store);
    }
}

#[async_trait]
impl RealmService for InMemoryRealm {
    async fn user_store_manager(
        &self,
        tenant_id: i32,
        domain: &str,
    ) -> Result<Arc<dyn UserStoreManager>, UserStoreError> {
        self.stores
            .get(&(tenant_id, domain.to_uppercase()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| UserStoreError::StoreNotFound {
                domain: domain.to_string(),
                tenant_id,
            })
    }
}
