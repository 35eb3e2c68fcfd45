use crate::controller::QueueBackend;
use crate::message::Message;
use crate::payload::Payload;

use std::error::Error;

use async_trait::async_trait;

/// Computes the reply to a request received by [`crate::Queue::serve`].
#[async_trait]
pub trait Handler<B>: Send + Sync
where
    B: QueueBackend,
{
    /// The error type for the handler.
    type Error: Error + Send + Sync + 'static;

    /// Handles one request and returns the reply payload.
    async fn handle(&self, request: &Message<B>) -> Result<Payload, Self::Error>;
}
