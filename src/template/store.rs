//! Template resolution from the tenant-scoped resource store

use std::sync::Arc;

use crate::config::NotificationConfig;
use crate::metrics::TemplateMetrics;
use crate::tenant::TenantResolver;

use super::resource::{ResourceError, ResourceStore};
use super::types::{EmailTemplate, TemplateError, TemplateResult};

/// Section delimiter of the raw storage form
const SECTION_DELIMITER: char = '|';

/// Maximum number of sections (subject, body, footer)
const MAX_SECTIONS: usize = 3;

/// Template lookup settings
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    /// Root path of the template collection, ending in '/'
    pub root: String,
    /// Content type used when the resource declares none
    pub default_content_type: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self::from(&NotificationConfig::default())
    }
}

impl From<&NotificationConfig> for TemplateConfig {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            root: config.template_root.clone(),
            default_content_type: config.default_content_type.clone(),
        }
    }
}

/// Parse the raw `subject|body|footer` form.
///
/// Trailing empty sections are dropped before counting, so `subject|body|`
/// is a valid template with an empty footer. Missing trailing sections are
/// empty; more than three sections is an error.
pub fn parse_template(
    path: &str,
    notification_type: &str,
    locale: &str,
    content_type: &str,
    raw: &str,
) -> TemplateResult<EmailTemplate> {
    let mut sections: Vec<&str> = raw.split(SECTION_DELIMITER).collect();
    while sections.len() > 1 && sections.last().is_some_and(|s| s.is_empty()) {
        sections.pop();
    }

    if sections.len() > MAX_SECTIONS {
        return Err(TemplateError::TooManySections {
            path: path.to_string(),
            sections: sections.len(),
        });
    }

    let section = |i: usize| sections.get(i).map_or_else(String::new, |s| s.to_string());

    Ok(EmailTemplate {
        notification_type: notification_type.to_string(),
        subject: section(0),
        body: section(1),
        footer: section(2),
        locale: locale.to_string(),
        content_type: content_type.to_string(),
    })
}

/// Resolves localized templates for a tenant
pub struct TemplateStore {
    resources: Arc<dyn ResourceStore>,
    tenants: Arc<dyn TenantResolver>,
    config: TemplateConfig,
}

impl TemplateStore {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        tenants: Arc<dyn TenantResolver>,
        config: TemplateConfig,
    ) -> Self {
        Self {
            resources,
            tenants,
            config,
        }
    }

    /// Resource path: `{root}{type}/{type}.{locale}`
    pub fn resource_path(&self, notification_type: &str, locale: &str) -> String {
        format!(
            "{}{}/{}.{}",
            self.config.root, notification_type, notification_type, locale
        )
    }

    /// Load and parse a template, reporting why it is unavailable
    pub async fn load(
        &self,
        notification_type: &str,
        locale: &str,
        tenant_domain: &str,
    ) -> TemplateResult<EmailTemplate> {
        let path = self.resource_path(notification_type, locale);
        let tenant_id = self.tenants.tenant_id(tenant_domain)?;

        let resource = self
            .resources
            .get(tenant_id, &path)
            .await
            .map_err(|e| match e {
                ResourceError::NotFound(_) => TemplateError::NotFound(path.clone()),
                other => TemplateError::Storage(other),
            })?;

        let content_type = resource
            .media_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.config.default_content_type.clone());

        let raw = String::from_utf8(resource.content)
            .map_err(|_| TemplateError::InvalidEncoding(path.clone()))?;

        tracing::debug!(
            path = %path,
            tenant_domain = %tenant_domain,
            template = %raw,
            "Read email template"
        );

        parse_template(&path, notification_type, locale, &content_type, &raw)
    }

    /// Resolve a template; every failure is logged and yields `None`.
    #[tracing::instrument(name = "template.resolve", skip(self))]
    pub async fn resolve(
        &self,
        notification_type: &str,
        locale: &str,
        tenant_domain: &str,
    ) -> Option<EmailTemplate> {
        match self.load(notification_type, locale, tenant_domain).await {
            Ok(template) => {
                TemplateMetrics::record("found");
                Some(template)
            }
            Err(e) => {
                if e.is_not_found() {
                    tracing::debug!(
                        error = %e,
                        tenant_domain = %tenant_domain,
                        "Email template not found"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        notification_type = %notification_type,
                        locale = %locale,
                        tenant_domain = %tenant_domain,
                        "Error occurred while reading email template"
                    );
                }
                TemplateMetrics::record(e.kind());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{InMemoryResourceStore, Resource};
    use crate::tenant::{StaticTenantResolver, TenantEntry, SUPER_TENANT_ID};

    const CONFIRM_PATH: &str = "/identity/email/accountConfirmation/accountConfirmation.en_US";

    fn store_with(resources: InMemoryResourceStore) -> TemplateStore {
        let tenants = StaticTenantResolver::new(vec![TenantEntry {
            domain: "acme.com".to_string(),
            id: 7,
        }]);
        TemplateStore::new(
            Arc::new(resources),
            Arc::new(tenants),
            TemplateConfig::default(),
        )
    }

    fn parse(raw: &str) -> TemplateResult<EmailTemplate> {
        parse_template("p", "t", "en_US", "text/plain", raw)
    }

    #[test]
    fn test_parse_three_sections() {
        let template = parse("Subject|Body|Footer").unwrap();
        assert_eq!(template.subject, "Subject");
        assert_eq!(template.body, "Body");
        assert_eq!(template.footer, "Footer");
    }

    #[test]
    fn test_parse_missing_sections_are_empty() {
        let template = parse("Only subject").unwrap();
        assert_eq!(template.subject, "Only subject");
        assert_eq!(template.body, "");
        assert_eq!(template.footer, "");

        let template = parse("Subject|Body").unwrap();
        assert_eq!(template.body, "Body");
        assert_eq!(template.footer, "");
    }

    #[test]
    fn test_parse_trailing_empty_sections_dropped() {
        let template = parse("Subject|Body|Footer|").unwrap();
        assert_eq!(template.footer, "Footer");
    }

    #[test]
    fn test_parse_rejects_more_than_three_sections() {
        let err = parse("a|b|c|d").unwrap_err();
        assert!(matches!(err, TemplateError::TooManySections { sections: 4, .. }));
        assert_eq!(err.kind(), "invalid");
    }

    #[test]
    fn test_resource_path() {
        let store = store_with(InMemoryResourceStore::new());
        assert_eq!(
            store.resource_path("accountConfirmation", "en_US"),
            CONFIRM_PATH
        );
    }

    #[tokio::test]
    async fn test_resolve_with_declared_media_type() {
        let resources = InMemoryResourceStore::new();
        resources.put(
            SUPER_TENANT_ID,
            CONFIRM_PATH,
            Resource::new("Welcome|<p>Hi</p>|Thanks").with_media_type("text/html"),
        );
        let store = store_with(resources);

        let template = store
            .resolve("accountConfirmation", "en_US", "carbon.super")
            .await
            .unwrap();

        assert_eq!(template.notification_type, "accountConfirmation");
        assert_eq!(template.subject, "Welcome");
        assert_eq!(template.body, "<p>Hi</p>");
        assert_eq!(template.locale, "en_US");
        assert_eq!(template.content_type, "text/html");
    }

    #[tokio::test]
    async fn test_blank_media_type_defaults() {
        let resources = InMemoryResourceStore::new();
        resources.put(
            SUPER_TENANT_ID,
            CONFIRM_PATH,
            Resource::new("s|b|f").with_media_type(" "),
        );
        let store = store_with(resources);

        let template = store
            .resolve("accountConfirmation", "en_US", "carbon.super")
            .await
            .unwrap();
        assert_eq!(template.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_resolve_is_tenant_scoped() {
        let resources = InMemoryResourceStore::new();
        resources.put(SUPER_TENANT_ID, CONFIRM_PATH, Resource::new("s|b|f"));
        let store = store_with(resources);

        // Same path, other tenant: no cross-tenant fallback
        assert!(store
            .resolve("accountConfirmation", "en_US", "acme.com")
            .await
            .is_none());
        assert!(matches!(
            store.load("accountConfirmation", "en_US", "acme.com").await,
            Err(TemplateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_failures_yield_none() {
        let resources = InMemoryResourceStore::new();
        resources.put(SUPER_TENANT_ID, CONFIRM_PATH, Resource::new("a|b|c|d"));
        resources.put(
            SUPER_TENANT_ID,
            "/identity/email/accountLock/accountLock.en_US",
            Resource::new(vec![0xff, 0xfe, b'|']),
        );
        let store = store_with(resources);

        assert!(store
            .resolve("accountConfirmation", "en_US", "carbon.super")
            .await
            .is_none());
        assert!(matches!(
            store.load("accountLock", "en_US", "carbon.super").await,
            Err(TemplateError::InvalidEncoding(_))
        ));
        assert!(matches!(
            store.load("accountConfirmation", "en_US", "unknown.org").await,
            Err(TemplateError::Tenant(_))
        ));
    }
}
