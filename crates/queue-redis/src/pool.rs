use crate::error::Error;

use std::fmt::{self, Debug};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use redis::Client;
use redis::aio::MultiplexedConnection;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

struct PoolState {
    idle: SyncMutex<Vec<MultiplexedConnection>>,
    permits: Arc<Semaphore>,
}

/// A bounded pool of Redis connections.
///
/// Connections are opened on first use. Clones share the same connections.
/// [`RedisPool::close`] drops every connection; the pool reopens lazily if it
/// is used again.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
    max_connections: usize,
    state: Arc<Mutex<Option<Arc<PoolState>>>>,
    url: String,
}

impl RedisPool {
    /// Creates a pool for `url` holding at most `max_connections` connections.
    ///
    /// No connection is opened yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `url` is not a valid Redis URL.
    pub fn new<U>(url: U, max_connections: usize) -> Result<Self, Error>
    where
        U: Into<String>,
    {
        let url = url.into();
        let client = Client::open(url.as_str()).map_err(|source| Error::Url {
            url: url.clone(),
            source,
        })?;

        Ok(Self {
            client,
            max_connections: max_connections.max(1),
            state: Arc::new(Mutex::new(None)),
            url,
        })
    }

    /// Maximum number of simultaneous connections.
    #[must_use]
    pub const fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Whether connections are currently held open.
    pub async fn is_open(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Checks out a connection, waiting while all of them are in use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] if the pool is closed while waiting, or
    /// [`Error::Redis`] if a new connection cannot be opened.
    pub async fn get(&self) -> Result<PooledConnection, Error> {
        let state = self.state().await;
        let permit = Arc::clone(&state.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;

        let idle = state.idle.lock().pop();
        let connection = match idle {
            Some(connection) => connection,
            None => {
                debug!(url = %self.url, "opening redis connection");
                self.client.get_multiplexed_async_connection().await?
            }
        };

        Ok(PooledConnection {
            connection,
            state,
            _permit: permit,
        })
    }

    /// Drops every connection. Closing a closed pool does nothing.
    pub async fn close(&self) {
        if let Some(state) = self.state.lock().await.take() {
            state.permits.close();
            state.idle.lock().clear();
            info!(url = %self.url, "closed redis connection pool");
        }
    }

    async fn state(&self) -> Arc<PoolState> {
        let mut state = self.state.lock().await;

        Arc::clone(state.get_or_insert_with(|| {
            info!(
                url = %self.url,
                max_connections = self.max_connections,
                "creating redis connection pool"
            );
            Arc::new(PoolState {
                idle: SyncMutex::new(Vec::with_capacity(self.max_connections)),
                permits: Arc::new(Semaphore::new(self.max_connections)),
            })
        }))
    }
}

impl Debug for RedisPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisPool")
            .field("url", &self.url)
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

/// A connection checked out of a [`RedisPool`].
///
/// Dropping it closes the connection. Call [`PooledConnection::release`] once
/// a command has completed to hand it back to the pool instead, so that a
/// connection abandoned mid-command (for example a cancelled blocking pop) is
/// never reused.
pub struct PooledConnection {
    connection: MultiplexedConnection,
    state: Arc<PoolState>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Returns the connection to the pool.
    pub fn release(self) {
        let Self {
            connection, state, ..
        } = self;

        if !state.permits.is_closed() {
            state.idle.lock().push(connection);
        }
    }
}

impl Deref for PooledConnection {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}
