//! Redis implementation of the queue backend.
//!
//! Each queue is a Redis list. Producers `LPUSH` encoded envelopes and
//! consumers `BRPOP` them, so every list is FIFO.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod controller;
mod error;
mod pool;

pub use controller::RedisQueueController;
pub use error::Error;
pub use pool::{PooledConnection, RedisPool};

use async_trait::async_trait;
use courier_queue::{QueueBackend, Result, WireFormat, queue_key};

/// Default Redis URL.
pub const DEFAULT_URL: &str = "redis://127.0.0.1:6379";

/// Default pool size.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Options for the Redis backend.
#[derive(Clone, Debug)]
pub struct RedisQueueOptions {
    /// Wire format of stored envelopes.
    pub format: WireFormat,

    /// Maximum number of simultaneous connections.
    pub max_connections: usize,

    /// Redis URL, e.g. `redis://127.0.0.1:6379/0`.
    pub url: String,
}

impl Default for RedisQueueOptions {
    fn default() -> Self {
        Self {
            format: WireFormat::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            url: DEFAULT_URL.to_string(),
        }
    }
}

/// Redis backend: a connection pool plus the wire format.
///
/// Clones share the pool. Call [`QueueBackend::cleanup`] at shutdown to drop
/// its connections.
#[derive(Clone, Debug)]
pub struct RedisBackend {
    format: WireFormat,
    pool: RedisPool,
}

impl RedisBackend {
    /// Creates a backend with its own pool. Does not connect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the URL is invalid.
    pub fn new(options: RedisQueueOptions) -> Result<Self, Error> {
        let pool = RedisPool::new(options.url, options.max_connections)?;

        Ok(Self::with_pool(pool, options.format))
    }

    /// Creates a backend on an existing pool.
    #[must_use]
    pub const fn with_pool(pool: RedisPool, format: WireFormat) -> Self {
        Self { format, pool }
    }

    /// Wire format of stored envelopes.
    #[must_use]
    pub const fn format(&self) -> WireFormat {
        self.format
    }

    /// The shared connection pool.
    #[must_use]
    pub const fn pool(&self) -> &RedisPool {
        &self.pool
    }
}

#[async_trait]
impl QueueBackend for RedisBackend {
    type Controller = RedisQueueController;

    fn controller(&self, name: &str) -> Self::Controller {
        RedisQueueController::new(self.clone(), queue_key(name))
    }

    async fn cleanup(&self) -> Result<()> {
        self.pool.close().await;

        Ok(())
    }
}
