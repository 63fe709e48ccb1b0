//! Folds user claims into the placeholder map

use std::sync::Arc;

use crate::metrics::ClaimsMetrics;
use crate::template::PlaceholderMap;
use crate::tenant::TenantResolver;

use super::{
    user_store_domain_name, Claim, RealmService, UserStoreManager, DEFAULT_PROFILE,
};

/// Prefix of every claim-derived placeholder key
pub const CLAIM_KEY_PREFIX: &str = "user.claim.";

/// Resolves user claims into placeholder contributions.
///
/// Lookup failures are logged and contribute nothing; they never abort the
/// notification.
pub struct ClaimsResolver {
    realm: Arc<dyn RealmService>,
    tenants: Arc<dyn TenantResolver>,
    identity_prefix: String,
}

impl ClaimsResolver {
    pub fn new(
        realm: Arc<dyn RealmService>,
        tenants: Arc<dyn TenantResolver>,
        identity_prefix: impl Into<String>,
    ) -> Self {
        Self {
            realm,
            tenants,
            identity_prefix: identity_prefix.into(),
        }
    }

    /// Placeholder key for a claim uri.
    ///
    /// `http://wso2.org/claims/givenname` maps to `user.claim.givenname`;
    /// identity claims such as `http://wso2.org/claims/identity/accountLocked`
    /// map to `user.claim.identity.accountLocked`. A uri without a local
    /// segment (trailing `/`) has no key.
    pub fn claim_key(&self, uri: &str) -> Option<String> {
        let local = uri.rsplit_once('/').map_or(uri, |(_, local)| local).trim();
        if local.is_empty() {
            return None;
        }
        let marker = format!("/{}/", self.identity_prefix);
        if uri.contains(&marker) {
            Some(format!("{}{}.{}", CLAIM_KEY_PREFIX, self.identity_prefix, local))
        } else {
            Some(format!("{}{}", CLAIM_KEY_PREFIX, local))
        }
    }

    /// Insert claims with non-blank uri and value. Returns the number inserted.
    pub fn fold_claims(&self, claims: Vec<Claim>, placeholders: &mut PlaceholderMap) -> usize {
        let mut added = 0;
        for claim in claims {
            if claim.value.trim().is_empty() {
                continue;
            }
            let Some(key) = self.claim_key(&claim.uri) else {
                continue;
            };
            placeholders.insert(key, claim.value);
            added += 1;
        }
        added
    }

    /// Enrich from a store handle already bound to the event
    #[tracing::instrument(name = "claims.resolve_with_store", skip(self, store, placeholders))]
    pub async fn resolve_with_store(
        &self,
        username: &str,
        store: &dyn UserStoreManager,
        placeholders: &mut PlaceholderMap,
    ) -> usize {
        match store.user_claim_values(username, DEFAULT_PROFILE).await {
            Ok(claims) => {
                let added = self.fold_claims(claims, placeholders);
                tracing::debug!(username = %username, claims = added, "Resolved user claims");
                added
            }
            Err(e) => {
                let tenant_domain = self
                    .tenants
                    .tenant_domain(store.tenant_id())
                    .unwrap_or_else(|_| format!("<tenant {}>", store.tenant_id()));
                match user_store_domain_name(store) {
                    Some(domain) => tracing::error!(
                        error = %e,
                        username = %username,
                        user_store = %domain,
                        tenant_domain = %tenant_domain,
                        "Error occurred while retrieving user claim values"
                    ),
                    None => tracing::error!(
                        error = %e,
                        username = %username,
                        tenant_domain = %tenant_domain,
                        "Error occurred while retrieving user claim values"
                    ),
                }
                ClaimsMetrics::record_failure("store");
                0
            }
        }
    }

    /// Enrich by locating the user store from its domain and tenant domain.
    ///
    /// Fails closed: if the tenant or store cannot be resolved nothing is added.
    #[tracing::instrument(name = "claims.resolve_in_domain", skip(self, placeholders))]
    pub async fn resolve_in_domain(
        &self,
        username: &str,
        store_domain: &str,
        tenant_domain: &str,
        placeholders: &mut PlaceholderMap,
    ) -> usize {
        let tenant_id = match self.tenants.tenant_id(tenant_domain) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    username = %username,
                    tenant_domain = %tenant_domain,
                    "Cannot resolve tenant for claim lookup"
                );
                ClaimsMetrics::record_failure("domain");
                return 0;
            }
        };

        let store = match self.realm.user_store_manager(tenant_id, store_domain).await {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    username = %username,
                    user_store = %store_domain,
                    tenant_domain = %tenant_domain,
                    "Error occurred while retrieving user claim values"
                );
                ClaimsMetrics::record_failure("domain");
                return 0;
            }
        };

        self.resolve_with_store(username, store.as_ref(), placeholders)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{InMemoryRealm, InMemoryUserStore, UserStoreError};
    use crate::tenant::{StaticTenantResolver, TenantEntry, SUPER_TENANT_ID};
    use async_trait::async_trait;

    struct UnreachableStore;

    #[async_trait]
    impl UserStoreManager for UnreachableStore {
        async fn user_claim_values(
            &self,
            _username: &str,
            _profile: &str,
        ) -> Result<Vec<Claim>, UserStoreError> {
            Err(UserStoreError::Unavailable("connection refused".to_string()))
        }

        fn tenant_id(&self) -> i32 {
            SUPER_TENANT_ID
        }
    }

    fn resolver_with(realm: InMemoryRealm) -> ClaimsResolver {
        let tenants = StaticTenantResolver::new(vec![TenantEntry {
            domain: "acme.com".to_string(),
            id: 7,
        }]);
        ClaimsResolver::new(Arc::new(realm), Arc::new(tenants), "identity")
    }

    #[test]
    fn test_claim_key_plain_and_identity() {
        let resolver = resolver_with(InMemoryRealm::new());
        assert_eq!(
            resolver.claim_key("http://wso2.org/claims/givenname").as_deref(),
            Some("user.claim.givenname")
        );
        assert_eq!(
            resolver.claim_key("http://wso2.org/claims/identity/accountLocked").as_deref(),
            Some("user.claim.identity.accountLocked")
        );
        assert_eq!(resolver.claim_key("nickname").as_deref(), Some("user.claim.nickname"));
        assert_eq!(resolver.claim_key("http://wso2.org/claims/"), None);
        assert_eq!(resolver.claim_key(""), None);
    }

    #[test]
    fn test_blank_claims_are_skipped() {
        let resolver = resolver_with(InMemoryRealm::new());
        let mut placeholders = PlaceholderMap::new();

        let added = resolver.fold_claims(
            vec![
                Claim::new("", "orphan"),
                Claim::new("http://wso2.org/claims/", "no-local-segment"),
                Claim::new("http://wso2.org/claims/identity/", "true"),
                Claim::new("http://wso2.org/claims/lastname", "  "),
                Claim::new("http://wso2.org/claims/givenname", "Jane"),
            ],
            &mut placeholders,
        );

        assert_eq!(added, 1);
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders["user.claim.givenname"], "Jane");
        assert!(!placeholders.contains_key("user.claim."));
    }

    #[tokio::test]
    async fn test_resolve_with_store() {
        let store = InMemoryUserStore::new(SUPER_TENANT_ID, Some("PRIMARY"));
        store.set_claims(
            "jane",
            vec![
                Claim::new("http://wso2.org/claims/givenname", "Jane"),
                Claim::new("http://wso2.org/claims/identity/accountLocked", "true"),
            ],
        );
        let resolver = resolver_with(InMemoryRealm::new());
        let mut placeholders = PlaceholderMap::new();

        let added = resolver
            .resolve_with_store("jane", &store, &mut placeholders)
            .await;

        assert_eq!(added, 2);
        assert_eq!(placeholders["user.claim.givenname"], "Jane");
        assert_eq!(placeholders["user.claim.identity.accountLocked"], "true");
    }

    #[tokio::test]
    async fn test_store_failure_contributes_nothing() {
        let resolver = resolver_with(InMemoryRealm::new());
        let mut placeholders = PlaceholderMap::new();
        placeholders.insert("user-name".to_string(), "jane".to_string());

        let added = resolver
            .resolve_with_store("jane", &UnreachableStore, &mut placeholders)
            .await;

        assert_eq!(added, 0);
        assert_eq!(placeholders.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_in_domain() {
        let realm = InMemoryRealm::new();
        let store = Arc::new(InMemoryUserStore::new(7, Some("SECONDARY")));
        store.set_claims("bob", vec![Claim::new("http://wso2.org/claims/givenname", "Bob")]);
        realm.register(7, "secondary", store);

        let resolver = resolver_with(realm);
        let mut placeholders = PlaceholderMap::new();
        let added = resolver
            .resolve_in_domain("bob", "SECONDARY", "acme.com", &mut placeholders)
            .await;

        assert_eq!(added, 1);
        assert_eq!(placeholders["user.claim.givenname"], "Bob");
    }

    #[tokio::test]
    async fn test_resolve_in_domain_fails_closed() {
        let resolver = resolver_with(InMemoryRealm::new());
        let mut placeholders = PlaceholderMap::new();

        // Unknown tenant
        let added = resolver
            .resolve_in_domain("bob", "PRIMARY", "globex.com", &mut placeholders)
            .await;
        assert_eq!(added, 0);

        // Known tenant, unknown store domain
        let added = resolver
            .resolve_in_domain("bob", "PRIMARY", "acme.com", &mut placeholders)
            .await;
        assert_eq!(added, 0);
        assert!(placeholders.is_empty());
    }
}
