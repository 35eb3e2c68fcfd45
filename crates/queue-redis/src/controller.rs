use crate::RedisBackend;

use async_trait::async_trait;
use courier_queue::{Message, QueueController, ReceiveOptions, Result, Timeout};
use tracing::trace;

/// Controller for one Redis list.
#[derive(Clone, Debug)]
pub struct RedisQueueController {
    backend: RedisBackend,
    key: String,
}

impl RedisQueueController {
    pub(crate) const fn new(backend: RedisBackend, key: String) -> Self {
        Self { backend, key }
    }
}

// BRPOP takes seconds, with zero meaning forever.
fn brpop_timeout(wait: Timeout) -> f64 {
    match wait {
        Timeout::Forever => 0.0,
        Timeout::After(duration) => duration.as_secs_f64(),
    }
}

#[async_trait]
impl QueueController for RedisQueueController {
    type Backend = RedisBackend;

    fn key(&self) -> &str {
        &self.key
    }

    async fn send(&self, message: &Message<RedisBackend>) -> Result<()> {
        let entry = message.encode(self.backend.format())?;
        let mut connection = self.backend.pool().get().await?;

        let length: u64 = redis::cmd("LPUSH")
            .arg(&self.key)
            .arg(entry.as_ref())
            .query_async(&mut *connection)
            .await
            .map_err(crate::Error::from)?;
        connection.release();

        trace!(key = %self.key, length, "pushed entry");
        Ok(())
    }

    async fn receive(&self, options: &ReceiveOptions) -> Result<Option<Message<RedisBackend>>> {
        let mut connection = self.backend.pool().get().await?;

        let popped: Option<(String, Vec<u8>)> = redis::cmd("BRPOP")
            .arg(&self.key)
            .arg(brpop_timeout(options.wait()))
            .query_async(&mut *connection)
            .await
            .map_err(crate::Error::from)?;
        connection.release();

        popped
            .map(|(_, entry)| {
                Message::decode(&entry, self.backend.format(), self.backend.clone())
            })
            .transpose()
    }

    async fn count(&self) -> Result<u64> {
        let mut connection = self.backend.pool().get().await?;

        let length: u64 = redis::cmd("LLEN")
            .arg(&self.key)
            .query_async(&mut *connection)
            .await
            .map_err(crate::Error::from)?;
        connection.release();

        Ok(length)
    }
}
