use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::claims::ClaimsResolver;
use crate::config::NotificationConfig;
use crate::event::{properties, EventProperty, IdentityEvent};
use crate::metrics::{EventMetrics, PublishMetrics};
use crate::template::{extract_placeholders, EmailTemplate, PlaceholderMap, TemplateStore};

use super::publisher::{PublishSink, PublishedEvent};
use super::types::RenderedNotification;

/// Handler name registered with the event framework
pub const HANDLER_NAME: &str = "NotificationSender";

/// Output payload keys
pub mod payload_keys {
    pub const SUBJECT_TEMPLATE: &str = "subject-template";
    pub const BODY_TEMPLATE: &str = "body-template";
    pub const FOOTER_TEMPLATE: &str = "footer-template";
    pub const LOCALE: &str = "locale";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const SEND_TO: &str = "send-to";
    pub const SUBJECT: &str = "subject";
    pub const BODY: &str = "body";
    pub const FOOTER: &str = "footer";
}

/// Result of handling one identity event
#[derive(Debug, Clone, Serialize)]
pub struct HandleOutcome {
    /// Identifier of the published record
    pub event_id: Uuid,
    /// Notification type the template was looked up for
    pub notification_type: String,
    /// Number of claim placeholders contributed by the user store
    pub claims_resolved: usize,
    /// Whether a template was resolved
    pub template_found: bool,
    /// Whether the sink accepted the record
    pub published: bool,
    pub notification: RenderedNotification,
}

/// Statistics for the notification handler
#[derive(Debug, Default)]
pub struct HandlerStats {
    /// Total events handled
    pub events_handled: AtomicU64,
    /// Events rendered without a template
    pub templates_missing: AtomicU64,
    /// Events without a recipient address
    pub recipients_missing: AtomicU64,
    /// Records accepted by the sink
    pub published: AtomicU64,
    /// Records the sink failed to accept
    pub publish_failed: AtomicU64,
}

impl HandlerStats {
    pub fn snapshot(&self) -> HandlerStatsSnapshot {
        HandlerStatsSnapshot {
            events_handled: self.events_handled.load(Ordering::Relaxed),
            templates_missing: self.templates_missing.load(Ordering::Relaxed),
            recipients_missing: self.recipients_missing.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            publish_failed: self.publish_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of handler statistics
#[derive(Debug, Clone, Serialize)]
pub struct HandlerStatsSnapshot {
    pub events_handled: u64,
    pub templates_missing: u64,
    pub recipients_missing: u64,
    pub published: u64,
    pub publish_failed: u64,
}

/// Renders identity events into email notifications and publishes them.
///
/// Handling never fails: missing claims, templates or recipients degrade the
/// rendered record, and every handled event is published exactly once.
pub struct NotificationHandler {
    config: NotificationConfig,
    claims: ClaimsResolver,
    templates: TemplateStore,
    sink: Arc<dyn PublishSink>,
    stats: HandlerStats,
}

impl NotificationHandler {
    pub fn new(
        config: NotificationConfig,
        claims: ClaimsResolver,
        templates: TemplateStore,
        sink: Arc<dyn PublishSink>,
    ) -> Self {
        Self {
            config,
            claims,
            templates,
            sink,
            stats: HandlerStats::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        HANDLER_NAME
    }

    pub fn stats(&self) -> HandlerStatsSnapshot {
        self.stats.snapshot()
    }

    /// Handle one identity event
    #[tracing::instrument(
        name = "notification.handle",
        skip(self, event),
        fields(
            event_name = %event.event_name(),
            notification_type = %event.notification_type()
        )
    )]
    pub async fn handle(&self, event: &IdentityEvent) -> HandleOutcome {
        let started = Instant::now();
        let notification_type = event.notification_type().to_string();

        let mut placeholders: PlaceholderMap = event
            .properties()
            .iter()
            .filter_map(|(name, value)| match value {
                EventProperty::Text(text) => Some((name.clone(), text.clone())),
                _ => None,
            })
            .collect();

        let claims_resolved = self.resolve_claims(event, &mut placeholders).await;

        let send_to = match self.placeholder(&placeholders, &self.config.email_claim_key) {
            Some(address) => address.to_string(),
            None => {
                self.stats.recipients_missing.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    username = event.text(properties::USER_NAME).unwrap_or_default(),
                    "No recipient address resolved, publishing with empty send-to"
                );
                String::new()
            }
        };

        let locale = self
            .placeholder(&placeholders, &self.config.locale_claim_key)
            .unwrap_or(self.config.default_locale.as_str())
            .to_string();

        let tenant_domain = event
            .non_blank(properties::TENANT_DOMAIN)
            .unwrap_or(self.config.default_tenant_domain.as_str());

        let template = self
            .templates
            .resolve(&notification_type, &locale, tenant_domain)
            .await;
        let template_found = template.is_some();
        match &template {
            Some(template) => {
                let unresolved = Self::unresolved_placeholders(template, &placeholders);
                if !unresolved.is_empty() {
                    tracing::debug!(
                        unresolved = ?unresolved,
                        "Template placeholders without values are left as-is"
                    );
                }
            }
            None => {
                self.stats.templates_missing.fetch_add(1, Ordering::Relaxed);
            }
        }

        let notification = RenderedNotification::builder(send_to)
            .send_from(event.text(properties::SEND_FROM).unwrap_or_default())
            .locale(locale)
            .content_type(self.config.default_content_type.as_str())
            .template(template, &placeholders)
            .build();

        let record = PublishedEvent::new(
            self.config.stream_id.as_str(),
            Self::payload(event, &notification_type, placeholders, &notification),
        );
        let published = self.publish(&record).await;

        self.stats.events_handled.fetch_add(1, Ordering::Relaxed);
        EventMetrics::record_handled(started.elapsed());

        HandleOutcome {
            event_id: record.id,
            notification_type,
            claims_resolved,
            template_found,
            published,
            notification,
        }
    }

    /// Enrich with user claims through the bound store handle, or through the
    /// store domain and tenant domain when no handle is bound.
    async fn resolve_claims(&self, event: &IdentityEvent, placeholders: &mut PlaceholderMap) -> usize {
        let Some(username) = event.non_blank(properties::USER_NAME) else {
            tracing::debug!("No username on event, skipping claim lookup");
            return 0;
        };

        if let Some(store) = event.user_store() {
            return self
                .claims
                .resolve_with_store(username, store.as_ref(), placeholders)
                .await;
        }

        match (
            event.non_blank(properties::USER_STORE_DOMAIN),
            event.non_blank(properties::TENANT_DOMAIN),
        ) {
            (Some(store_domain), Some(tenant_domain)) => {
                self.claims
                    .resolve_in_domain(username, store_domain, tenant_domain, placeholders)
                    .await
            }
            _ => {
                tracing::debug!(
                    username = %username,
                    "No user store bound and no store/tenant domain, skipping claim lookup"
                );
                0
            }
        }
    }

    fn unresolved_placeholders(template: &EmailTemplate, placeholders: &PlaceholderMap) -> Vec<String> {
        let mut seen = HashSet::new();
        [&template.subject, &template.body, &template.footer]
            .into_iter()
            .flat_map(|section| extract_placeholders(section))
            .filter(|name| !placeholders.contains_key(name))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    fn placeholder<'a>(&self, placeholders: &'a PlaceholderMap, key: &str) -> Option<&'a str> {
        placeholders
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Flat output payload. Later entries override earlier ones, so rendered
    /// fields win over placeholders of the same name.
    fn payload(
        event: &IdentityEvent,
        notification_type: &str,
        placeholders: PlaceholderMap,
        notification: &RenderedNotification,
    ) -> HashMap<String, String> {
        let text = |name: &str| event.text(name).unwrap_or_default().to_string();

        let mut payload = HashMap::with_capacity(placeholders.len() + 14);
        payload.insert(
            properties::NOTIFICATION_EVENT.to_string(),
            notification_type.to_string(),
        );
        for name in [
            properties::USER_NAME,
            properties::USER_STORE_DOMAIN,
            properties::TENANT_DOMAIN,
            properties::SEND_FROM,
        ] {
            payload.insert(name.to_string(), text(name));
        }

        payload.extend(placeholders);

        let (subject_template, body_template, footer_template) = notification
            .template()
            .map(|t| (t.subject.clone(), t.body.clone(), t.footer.clone()))
            .unwrap_or_default();

        for (key, value) in [
            (payload_keys::SUBJECT_TEMPLATE, subject_template),
            (payload_keys::BODY_TEMPLATE, body_template),
            (payload_keys::FOOTER_TEMPLATE, footer_template),
            (payload_keys::LOCALE, notification.locale().to_string()),
            (payload_keys::CONTENT_TYPE, notification.content_type().to_string()),
            (payload_keys::SEND_TO, notification.send_to().to_string()),
            (payload_keys::SUBJECT, notification.subject().to_string()),
            (payload_keys::BODY, notification.body().to_string()),
            (payload_keys::FOOTER, notification.footer().to_string()),
        ] {
            payload.insert(key.to_string(), value);
        }

        payload
    }

    async fn publish(&self, record: &PublishedEvent) -> bool {
        match self.sink.publish(record).await {
            Ok(()) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                PublishMetrics::record_published();
                tracing::debug!(
                    event_id = %record.id,
                    stream_id = %record.stream_id,
                    "Notification published"
                );
                true
            }
            Err(e) => {
                self.stats.publish_failed.fetch_add(1, Ordering::Relaxed);
                PublishMetrics::record_failed();
                tracing::error!(
                    error = %e,
                    event_id = %record.id,
                    stream_id = %record.stream_id,
                    "Failed to publish notification"
                );
                false
            }
        }
    }
}
