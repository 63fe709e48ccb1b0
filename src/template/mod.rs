//! Email template system.
//!
//! This module provides:
//! - Template resources stored per tenant under
//!   `{root}{notification_type}/{notification_type}.{locale}`
//! - Parsing of the raw `subject|body|footer` storage form
//! - Placeholder extraction and substitution for `{name}` tokens
//!
//! # Example
//!
//! ```ignore
//! let store = TemplateStore::new(resources, tenants, TemplateConfig::default());
//!
//! // Stored as "Welcome {user.claim.givenname}|Hi {user.claim.givenname}|Thanks"
//! let template = store.resolve("accountConfirmation", "en_US", "carbon.super").await;
//!
//! let mut placeholders = PlaceholderMap::new();
//! placeholders.insert("user.claim.givenname".into(), "Jane".into());
//!
//! let subject = substitute(&template.unwrap().subject, &placeholders);
//! assert_eq!(subject, "Welcome Jane");
//! ```

mod placeholder;
mod redis_backend;
mod resource;
mod store;
mod types;

pub use placeholder::{extract_placeholders, substitute, PlaceholderMap};
pub use redis_backend::RedisResourceStore;
pub use resource::{InMemoryResourceStore, Resource, ResourceError, ResourceStore};
pub use store::{parse_template, TemplateConfig, TemplateStore};
pub use types::{EmailTemplate, TemplateError, TemplateResult};
