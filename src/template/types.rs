//! Template types and error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tenant::TenantError;

use super::resource::ResourceError;

/// Template resolution error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found at {0}")]
    NotFound(String),

    #[error("Template at {path} has {sections} sections; \"|\" is not allowed inside a section")]
    TooManySections { path: String, sections: usize },

    #[error("Template at {0} is not valid UTF-8")]
    InvalidEncoding(String),

    #[error("Tenant resolution failed: {0}")]
    Tenant(#[from] TenantError),

    #[error("Template storage error: {0}")]
    Storage(ResourceError),
}

impl TemplateError {
    /// Expected outcome, logged at debug level only
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Metric label for this failure
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::TooManySections { .. } | Self::InvalidEncoding(_) => "invalid",
            Self::Tenant(_) | Self::Storage(_) => "error",
        }
    }
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// A localized email template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    /// Notification type the template serves (e.g. "accountConfirmation")
    pub notification_type: String,

    /// Subject with `{placeholder}` tokens
    pub subject: String,

    /// Body with `{placeholder}` tokens
    pub body: String,

    /// Footer with `{placeholder}` tokens
    pub footer: String,

    /// Locale the template was served for
    pub locale: String,

    /// Media type declared by the stored resource
    pub content_type: String,
}
