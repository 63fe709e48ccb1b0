use serde::Serialize;

use crate::template::{substitute, EmailTemplate, PlaceholderMap};

/// A fully rendered notification, ready for the output stream.
///
/// Built once per event through [`RenderedNotificationBuilder`] and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedNotification {
    send_to: String,
    send_from: String,
    subject: String,
    body: String,
    footer: String,
    locale: String,
    content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<EmailTemplate>,
}

impl RenderedNotification {
    /// Create a builder for a notification to `send_to`
    pub fn builder(send_to: impl Into<String>) -> RenderedNotificationBuilder {
        RenderedNotificationBuilder::new(send_to)
    }

    pub fn send_to(&self) -> &str {
        &self.send_to
    }

    pub fn send_from(&self) -> &str {
        &self.send_from
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn footer(&self) -> &str {
        &self.footer
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Source template, absent when none was resolved
    pub fn template(&self) -> Option<&EmailTemplate> {
        self.template.as_ref()
    }
}

/// Builder for [`RenderedNotification`]
#[derive(Debug, Clone)]
pub struct RenderedNotificationBuilder {
    send_to: String,
    send_from: String,
    subject: String,
    body: String,
    footer: String,
    locale: String,
    content_type: String,
    template: Option<EmailTemplate>,
}

impl RenderedNotificationBuilder {
    /// Create a builder; the recipient is the only required field
    pub fn new(send_to: impl Into<String>) -> Self {
        Self {
            send_to: send_to.into(),
            send_from: String::new(),
            subject: String::new(),
            body: String::new(),
            footer: String::new(),
            locale: String::new(),
            content_type: String::new(),
            template: None,
        }
    }

    /// Set the sender address
    pub fn send_from(mut self, send_from: impl Into<String>) -> Self {
        self.send_from = send_from.into();
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Render subject, body and footer from a template.
    ///
    /// Without a template the three fields stay empty. With one, its locale
    /// and content type replace the builder's.
    pub fn template(mut self, template: Option<EmailTemplate>, placeholders: &PlaceholderMap) -> Self {
        if let Some(template) = &template {
            self.subject = substitute(&template.subject, placeholders);
            self.body = substitute(&template.body, placeholders);
            self.footer = substitute(&template.footer, placeholders);
            self.locale = template.locale.clone();
            self.content_type = template.content_type.clone();
        }
        self.template = template;
        self
    }

    /// Build the notification
    pub fn build(self) -> RenderedNotification {
        RenderedNotification {
            send_to: self.send_to,
            send_from: self.send_from,
            subject: self.subject,
            body: self.body,
            footer: self.footer,
            locale: self.locale,
            content_type: self.content_type,
            template: self.template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> EmailTemplate {
        EmailTemplate {
            notification_type: "passwordReset".to_string(),
            subject: "Reset for {user-name}".to_string(),
            body: "Code: {code}".to_string(),
            footer: "{unknown}".to_string(),
            locale: "fr_FR".to_string(),
            content_type: "text/html".to_string(),
        }
    }

    #[test]
    fn test_builder_renders_template() {
        let placeholders: PlaceholderMap = [
            ("user-name".to_string(), "jane".to_string()),
            ("code".to_string(), "1234".to_string()),
        ]
        .into_iter()
        .collect();

        let notification = RenderedNotification::builder("jane@example.com")
            .send_from("noreply@example.com")
            .locale("en_US")
            .content_type("text/plain")
            .template(Some(template()), &placeholders)
            .build();

        assert_eq!(notification.send_to(), "jane@example.com");
        assert_eq!(notification.send_from(), "noreply@example.com");
        assert_eq!(notification.subject(), "Reset for jane");
        assert_eq!(notification.body(), "Code: 1234");
        assert_eq!(notification.footer(), "{unknown}");
        assert_eq!(notification.locale(), "fr_FR");
        assert_eq!(notification.content_type(), "text/html");
        assert_eq!(notification.template(), Some(&template()));
    }

    #[test]
    fn test_builder_without_template() {
        let notification = RenderedNotificationBuilder::new("")
            .locale("en_US")
            .content_type("text/plain")
            .template(None, &PlaceholderMap::new())
            .build();

        assert_eq!(notification.send_to(), "");
        assert_eq!(notification.subject(), "");
        assert_eq!(notification.body(), "");
        assert_eq!(notification.footer(), "");
        assert_eq!(notification.locale(), "en_US");
        assert!(notification.template().is_none());
    }
}
