// Infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod redis;

// Domain layer (business logic)
pub mod claims;
pub mod event;
pub mod notification;
pub mod template;
pub mod tenant;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;

// Supporting modules
pub mod telemetry;
