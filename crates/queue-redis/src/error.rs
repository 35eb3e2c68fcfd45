use thiserror::Error;

/// Errors that can occur talking to Redis.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection pool was shut down while waiting for a connection.
    #[error("connection pool has been shut down")]
    PoolClosed,

    /// Redis rejected a command or could not be reached.
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    /// The configured URL is not a valid Redis URL.
    #[error("invalid redis url {url}: {source}")]
    Url {
        /// The offending URL.
        url: String,

        /// Why it was rejected.
        source: redis::RedisError,
    },
}

impl From<Error> for courier_queue::Error {
    fn from(error: Error) -> Self {
        Self::Connection(error.to_string())
    }
}
