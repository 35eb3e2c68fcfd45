use crate::MemoryBackend;

use async_trait::async_trait;
use courier_queue::{Message, QueueController, ReceiveOptions, Result};

/// Controller for one list of a [`MemoryBackend`].
#[derive(Clone, Debug)]
pub struct MemoryQueueController {
    backend: MemoryBackend,
    key: String,
}

impl MemoryQueueController {
    pub(crate) const fn new(backend: MemoryBackend, key: String) -> Self {
        Self { backend, key }
    }
}

#[async_trait]
impl QueueController for MemoryQueueController {
    type Backend = MemoryBackend;

    fn key(&self) -> &str {
        &self.key
    }

    async fn send(&self, message: &Message<MemoryBackend>) -> Result<()> {
        let entry = message.encode(self.backend.format())?;
        self.backend.push(&self.key, entry).await;

        Ok(())
    }

    async fn receive(&self, options: &ReceiveOptions) -> Result<Option<Message<MemoryBackend>>> {
        match self.backend.pop(&self.key, options.wait()).await {
            Some(entry) => {
                Message::decode(&entry, self.backend.format(), self.backend.clone()).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.backend.len(&self.key).await)
    }
}
