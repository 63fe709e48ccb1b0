//! Inbound identity lifecycle events.
//!
//! An event carries an event name plus a bag of typed properties. Only a few
//! property names are interpreted by the handler (see [`properties`]); every
//! string-valued property also becomes a template placeholder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::claims::UserStoreManager;

/// Well-known event property names
pub mod properties {
    /// Notification type used to pick the template
    pub const NOTIFICATION_EVENT: &str = "notification-event";
    pub const USER_NAME: &str = "user-name";
    /// In-process user store handle
    pub const USER_STORE_MANAGER: &str = "userStoreManager";
    pub const USER_STORE_DOMAIN: &str = "userstore-domain";
    pub const TENANT_DOMAIN: &str = "tenant-domain";
    /// Sender address override
    pub const SEND_FROM: &str = "send-from";
}

/// A typed event property value
#[derive(Clone)]
pub enum EventProperty {
    Text(String),
    UserStore(Arc<dyn UserStoreManager>),
    Other(serde_json::Value),
}

impl fmt::Debug for EventProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::UserStore(store) => f
                .debug_tuple("UserStore")
                .field(&store.tenant_id())
                .finish(),
            Self::Other(v) => f.debug_tuple("Other").field(v).finish(),
        }
    }
}

impl From<serde_json::Value> for EventProperty {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Other(other),
        }
    }
}

/// Identity lifecycle event (user registration, password reset, account lock, ...)
#[derive(Debug, Clone)]
pub struct IdentityEvent {
    event_name: String,
    properties: HashMap<String, EventProperty>,
}

impl IdentityEvent {
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            properties: HashMap::new(),
        }
    }

    /// Add a property, replacing any previous value under the same name
    pub fn with_property(mut self, name: impl Into<String>, value: EventProperty) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Add a string property
    pub fn with_text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_property(name, EventProperty::Text(value.into()))
    }

    /// Bind a user store handle to the event
    pub fn with_user_store(self, store: Arc<dyn UserStoreManager>) -> Self {
        self.with_property(properties::USER_STORE_MANAGER, EventProperty::UserStore(store))
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn properties(&self) -> &HashMap<String, EventProperty> {
        &self.properties
    }

    /// String value of a property, if the property exists and is a string
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.properties.get(name) {
            Some(EventProperty::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Non-blank string value of a property
    pub fn non_blank(&self, name: &str) -> Option<&str> {
        self.text(name).filter(|s| !s.trim().is_empty())
    }

    /// The bound user store handle, if any
    pub fn user_store(&self) -> Option<&Arc<dyn UserStoreManager>> {
        match self.properties.get(properties::USER_STORE_MANAGER) {
            Some(EventProperty::UserStore(store)) => Some(store),
            _ => None,
        }
    }

    /// Notification type: the `notification-event` property, else the event name
    pub fn notification_type(&self) -> &str {
        self.non_blank(properties::NOTIFICATION_EVENT)
            .unwrap_or(&self.event_name)
    }
}

/// Wire form of an event received over HTTP or Redis.
///
/// Store handles cannot cross the wire, so claims for these events are
/// resolved through the user store domain and tenant domain properties.
#[derive(Debug, Deserialize)]
pub struct InboundEvent {
    pub event_name: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl From<InboundEvent> for IdentityEvent {
    fn from(inbound: InboundEvent) -> Self {
        inbound
            .properties
            .into_iter()
            .fold(IdentityEvent::new(inbound.event_name), |event, (name, value)| {
                event.with_property(name, value.into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_type_prefers_property() {
        let event = IdentityEvent::new("TRIGGER_NOTIFICATION")
            .with_text(properties::NOTIFICATION_EVENT, "passwordReset");
        assert_eq!(event.notification_type(), "passwordReset");

        let event = IdentityEvent::new("accountConfirmation");
        assert_eq!(event.notification_type(), "accountConfirmation");

        let event = IdentityEvent::new("accountLock").with_text(properties::NOTIFICATION_EVENT, "  ");
        assert_eq!(event.notification_type(), "accountLock");
    }

    #[test]
    fn test_text_ignores_non_string_values() {
        let event = IdentityEvent::new("test")
            .with_text("a", "1")
            .with_property("b", EventProperty::Other(json!(42)));

        assert_eq!(event.text("a"), Some("1"));
        assert_eq!(event.text("b"), None);
        assert_eq!(event.text("missing"), None);
        assert!(event.user_store().is_none());
    }

    #[test]
    fn test_inbound_event_conversion() {
        let inbound: InboundEvent = serde_json::from_value(json!({
            "event_name": "TRIGGER_NOTIFICATION",
            "properties": {
                "notification-event": "accountConfirmation",
                "user-name": "jane",
                "attempts": 3
            }
        }))
        .unwrap();

        let event = IdentityEvent::from(inbound);
        assert_eq!(event.event_name(), "TRIGGER_NOTIFICATION");
        assert_eq!(event.notification_type(), "accountConfirmation");
        assert_eq!(event.text(properties::USER_NAME), Some("jane"));
        assert!(matches!(
            event.properties().get("attempts"),
            Some(EventProperty::Other(_))
        ));
    }
}
