//! Redis connection pool for the storage adapters.
//!
//! Holds one lazily-established multiplexed connection shared by all
//! adapters (claims, template resources, publish sink). A dropped connection
//! is discarded so the next command reconnects.

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError, RedisResult};
use tokio::sync::RwLock;

use crate::config::RedisConfig;

/// Error type for Redis pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
}

/// Shared Redis connection for command traffic.
///
/// The Pub/Sub subscriber uses its own dedicated connection.
pub struct RedisPool {
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    url: String,
}

impl RedisPool {
    /// Create a pool. No connection is made until the first command.
    pub fn new(config: &RedisConfig) -> Result<Self, PoolError> {
        let client = Client::open(config.url.as_str())?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            url: config.url.clone(),
        })
    }

    /// Get the shared connection, establishing it if needed.
    pub async fn get_connection(&self) -> Result<MultiplexedConnection, PoolError> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        self.connect().await
    }

    async fn connect(&self) -> Result<MultiplexedConnection, PoolError> {
        let mut conn_guard = self.connection.write().await;

        // Another task may have connected while we waited
        if let Some(ref c) = *conn_guard {
            return Ok(c.clone());
        }

        match self.client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                *conn_guard = Some(conn.clone());
                tracing::info!("Redis pool connection established");
                Ok(conn)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to Redis");
                Err(PoolError::Redis(e))
            }
        }
    }

    /// Run a command on the shared connection, dropping the connection on I/O failure.
    pub async fn execute<F, T, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = RedisResult<T>>,
    {
        let conn = self.get_connection().await?;

        match f(conn).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if e.is_connection_dropped() || e.is_io_error() {
                    let mut conn_guard = self.connection.write().await;
                    *conn_guard = None;
                }
                Err(PoolError::Redis(e))
            }
        }
    }

    /// GET a binary value
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, PoolError> {
        let key = key.to_string();
        self.execute(|mut conn| async move { conn.get(key).await })
            .await
    }

    /// GET a string value
    pub async fn get_string(&self, key: &str) -> Result<Option<String>, PoolError> {
        let key = key.to_string();
        self.execute(|mut conn| async move { conn.get(key).await })
            .await
    }

    /// HGETALL
    pub async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, PoolError> {
        let key = key.to_string();
        self.execute(|mut conn| async move { conn.hgetall(key).await })
            .await
    }

    /// PUBLISH, returning the number of subscribers that received the message
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<i64, PoolError> {
        let channel = channel.to_string();
        let payload = payload.to_string();
        self.execute(|mut conn| async move { conn.publish(channel, payload).await })
            .await
    }

    /// Ping Redis to check connectivity.
    pub async fn ping(&self) -> Result<(), PoolError> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
