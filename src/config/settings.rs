use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::tenant::TenantEntry;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Known tenants (the super tenant is always registered)
    #[serde(default)]
    pub tenants: Vec<TenantEntry>,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Channels carrying inbound identity events (patterns allowed)
    #[serde(default)]
    pub channels: Vec<String>,
    /// First delay before resubscribing after a lost connection
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
    /// Subscribe to the event channels (only with the redis backend)
    #[serde(default = "default_true")]
    pub subscribe_enabled: bool,
}

/// Backing store selection for claims, templates and the publish sink
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// "redis" or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Key prefix for user claim hashes
    #[serde(default = "default_claims_prefix")]
    pub claims_prefix: String,
    /// Key prefix for template resources
    #[serde(default = "default_registry_prefix")]
    pub registry_prefix: String,
    /// Published records kept by the memory sink
    #[serde(default = "default_memory_retained_events")]
    pub memory_retained_events: usize,
}

/// Template resolution and publishing settings
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Root path of the email template collection
    #[serde(default = "default_template_root")]
    pub template_root: String,
    #[serde(default = "default_locale")]
    pub default_locale: String,
    #[serde(default = "default_content_type")]
    pub default_content_type: String,
    /// Tenant used when an event carries no tenant domain
    #[serde(default = "default_tenant_domain")]
    pub default_tenant_domain: String,
    /// Stream that receives rendered notifications
    #[serde(default = "default_stream_id")]
    pub stream_id: String,
    /// Path segment marking identity (system) claims
    #[serde(default = "default_identity_prefix")]
    pub identity_claim_prefix: String,
    #[serde(default = "default_email_claim_key")]
    pub email_claim_key: String,
    #[serde(default = "default_locale_claim_key")]
    pub locale_claim_key: String,
}

/// OpenTelemetry exporter settings
#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_reconnect_initial_ms() -> u64 {
    500
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_backend() -> String {
    "redis".to_string()
}

fn default_claims_prefix() -> String {
    "identity:claims".to_string()
}

fn default_registry_prefix() -> String {
    "identity:registry".to_string()
}

fn default_memory_retained_events() -> usize {
    crate::notification::DEFAULT_RETAINED_EVENTS
}

fn default_true() -> bool {
    true
}

fn default_template_root() -> String {
    "/identity/email/".to_string()
}

fn default_locale() -> String {
    "en_US".to_string()
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

fn default_tenant_domain() -> String {
    crate::tenant::SUPER_TENANT_DOMAIN.to_string()
}

fn default_stream_id() -> String {
    "id_gov_notify_stream:1.0.0".to_string()
}

fn default_identity_prefix() -> String {
    "identity".to_string()
}

fn default_email_claim_key() -> String {
    "user.claim.emailaddress".to_string()
}

fn default_locale_claim_key() -> String {
    "user.claim.locality".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "identity-notification-handler".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("redis.url", default_redis_url())?
            .set_default("storage.backend", default_backend())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, REDIS__URL, NOTIFICATION__DEFAULT_LOCALE, ...
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("redis.channels"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// The Redis event subscriber runs only with the redis backend
    pub fn subscriber_enabled(&self) -> bool {
        self.storage.backend == "redis" && self.redis.subscribe_enabled
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            redis: RedisConfig::default(),
            storage: StorageConfig::default(),
            notification: NotificationConfig::default(),
            tenants: Vec::new(),
            otel: OtelConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            channels: vec![],
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            subscribe_enabled: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            claims_prefix: default_claims_prefix(),
            registry_prefix: default_registry_prefix(),
            memory_retained_events: default_memory_retained_events(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            template_root: default_template_root(),
            default_locale: default_locale(),
            default_content_type: default_content_type(),
            default_tenant_domain: default_tenant_domain(),
            stream_id: default_stream_id(),
            identity_claim_prefix: default_identity_prefix(),
            email_claim_key: default_email_claim_key(),
            locale_claim_key: default_locale_claim_key(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8082);
    }

    #[test]
    fn test_notification_defaults() {
        let config = NotificationConfig::default();
        assert_eq!(config.template_root, "/identity/email/");
        assert_eq!(config.default_locale, "en_US");
        assert_eq!(config.default_content_type, "text/plain");
        assert_eq!(config.default_tenant_domain, "carbon.super");
        assert_eq!(config.stream_id, "id_gov_notify_stream:1.0.0");
        assert_eq!(config.email_claim_key, "user.claim.emailaddress");
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "storage": { "backend": "memory" },
            "tenants": [{ "domain": "acme.com", "id": 7 }]
        }))
        .unwrap();

        assert_eq!(settings.storage.backend, "memory");
        assert_eq!(settings.storage.claims_prefix, "identity:claims");
        assert_eq!(settings.tenants.len(), 1);
        assert_eq!(settings.notification.default_locale, "en_US");
        assert!(!settings.otel.enabled);
    }

    #[test]
    fn test_subscriber_enabled_only_with_redis_backend() {
        let mut settings = Settings::default();
        assert!(settings.subscriber_enabled());

        settings.redis.subscribe_enabled = false;
        assert!(!settings.subscriber_enabled());

        settings.redis.subscribe_enabled = true;
        settings.storage.backend = "memory".to_string();
        assert!(!settings.subscriber_enabled());
    }

    #[test]
    fn test_memory_retained_events_default() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "storage": { "backend": "memory" }
        }))
        .unwrap();
        assert_eq!(settings.storage.memory_retained_events, 1024);
        assert!(settings.redis.subscribe_enabled);
    }
}
