//! Tenant domain resolution.
//!
//! Every claim lookup and template read is scoped to a single tenant. Events
//! name their tenant by domain (e.g. `acme.com`); the stores are keyed by the
//! numeric tenant id. This module maps between the two.
//!
//! The super tenant (`carbon.super`, id `-1234`) is always known.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

/// Domain of the super tenant
pub const SUPER_TENANT_DOMAIN: &str = "carbon.super";

/// Id of the super tenant
pub const SUPER_TENANT_ID: i32 = -1234;

#[derive(Debug, Error)]
pub enum TenantError {
    #[error("Unknown tenant domain: {0}")]
    UnknownDomain(String),

    #[error("Unknown tenant id: {0}")]
    UnknownId(i32),

    #[error("Tenant lookup failed: {0}")]
    Backend(String),
}

/// A configured tenant
#[derive(Debug, Clone, Deserialize)]
pub struct TenantEntry {
    pub domain: String,
    pub id: i32,
}

/// Maps tenant domains to ids and back
pub trait TenantResolver: Send + Sync {
    /// Resolve a tenant domain to its id
    fn tenant_id(&self, tenant_domain: &str) -> Result<i32, TenantError>;

    /// Resolve a tenant id to its domain
    fn tenant_domain(&self, tenant_id: i32) -> Result<String, TenantError>;
}

/// Tenant resolver backed by a fixed table (usually from configuration)
#[derive(Debug, Clone)]
pub struct StaticTenantResolver {
    by_domain: HashMap<String, i32>,
    by_id: HashMap<i32, String>,
}

impl Default for StaticTenantResolver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl StaticTenantResolver {
    /// Create a resolver from tenant entries. Domains are matched case-insensitively.
    pub fn new(entries: impl IntoIterator<Item = TenantEntry>) -> Self {
        let mut resolver = Self {
            by_domain: HashMap::new(),
            by_id: HashMap::new(),
        };
        resolver.insert(SUPER_TENANT_DOMAIN, SUPER_TENANT_ID);
        for entry in entries {
            resolver.insert(&entry.domain, entry.id);
        }
        resolver
    }

    fn insert(&mut self, domain: &str, id: i32) {
        let domain = domain.trim().to_lowercase();
        self.by_id.insert(id, domain.clone());
        self.by_domain.insert(domain, id);
    }

    /// Number of known tenants, including the super tenant
    pub fn len(&self) -> usize {
        self.by_domain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_domain.is_empty()
    }
}

impl TenantResolver for StaticTenantResolver {
    fn tenant_id(&self, tenant_domain: &str) -> Result<i32, TenantError> {
        self.by_domain
            .get(&tenant_domain.trim().to_lowercase())
            .copied()
            .ok_or_else(|| TenantError::UnknownDomain(tenant_domain.to_string()))
    }

    fn tenant_domain(&self, tenant_id: i32) -> Result<String, TenantError> {
        self.by_id
            .get(&tenant_id)
            .cloned()
            .ok_or(TenantError::UnknownId(tenant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> TenantEntry {
        TenantEntry {
            domain: "acme.com".to_string(),
            id: 7,
        }
    }

    #[test]
    fn test_super_tenant_always_known() {
        let resolver = StaticTenantResolver::default();
        assert_eq!(resolver.tenant_id("carbon.super").unwrap(), SUPER_TENANT_ID);
        assert_eq!(resolver.tenant_domain(SUPER_TENANT_ID).unwrap(), "carbon.super");
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_domain_lookup_is_case_insensitive() {
        let resolver = StaticTenantResolver::new(vec![acme()]);
        assert_eq!(resolver.tenant_id("ACME.com").unwrap(), 7);
        assert_eq!(resolver.tenant_domain(7).unwrap(), "acme.com");
    }

    #[test]
    fn test_unknown_tenant() {
        let resolver = StaticTenantResolver::new(vec![acme()]);
        assert!(matches!(
            resolver.tenant_id("globex.com"),
            Err(TenantError::UnknownDomain(_))
        ));
        assert!(matches!(resolver.tenant_domain(99), Err(TenantError::UnknownId(99))));
    }
}
