//! Redis connectivity shared by the storage adapters and the event subscriber.

mod backoff;
pub mod pool;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use pool::{PoolError, RedisPool};
