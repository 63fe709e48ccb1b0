//! Event intake: HTTP endpoint and Redis Pub/Sub subscriber.

mod http;
mod redis;

pub use http::{receive_event, EventResponse};
pub use self::redis::RedisEventSubscriber;
