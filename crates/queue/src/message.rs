use crate::codec::{self, Envelope, WireFormat};
use crate::controller::QueueBackend;
use crate::error::Result;
use crate::options::ReceiveOptions;
use crate::payload::Payload;
use crate::queue::Queue;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Prefix of the logical name of every response queue.
pub const RESPONSE_QUEUE_PREFIX: &str = "response:";

/// A message sent through a queue.
///
/// Besides the envelope, a message keeps the backend it travelled through so
/// that replies go out through the same kind of backend. The backend is never
/// part of the encoded form.
#[derive(Clone, Debug)]
pub struct Message<B>
where
    B: QueueBackend,
{
    envelope: Envelope,
    backend: B,
}

impl<B> Message<B>
where
    B: QueueBackend,
{
    pub(crate) fn new(queue_name: String, payload: Payload, backend: B) -> Self {
        Self {
            envelope: Envelope {
                id: Uuid::new_v4().to_string(),
                timestamp: Utc::now(),
                queue_name,
                payload,
            },
            backend,
        }
    }

    /// Rebuilds a message from a decoded envelope.
    #[must_use]
    pub const fn from_envelope(envelope: Envelope, backend: B) -> Self {
        Self { envelope, backend }
    }

    /// Decodes a message read from `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if `bytes` is not a valid envelope.
    pub fn decode(bytes: &[u8], format: WireFormat, backend: B) -> Result<Self> {
        codec::decode(bytes, format).map(|envelope| Self::from_envelope(envelope, backend))
    }

    /// Encodes the envelope for storage in the backend.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if the envelope cannot be encoded.
    pub fn encode(&self, format: WireFormat) -> Result<Bytes> {
        codec::encode(&self.envelope, format)
    }

    /// Unique identifier, assigned at send time.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.envelope.id
    }

    /// Creation time.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.envelope.timestamp
    }

    /// Logical name of the queue this message was sent to.
    #[must_use]
    pub fn queue_name(&self) -> &str {
        &self.envelope.queue_name
    }

    /// The message body.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.envelope.payload
    }

    /// The full envelope.
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Decodes a structured payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if the payload is opaque or has
    /// the wrong shape.
    pub fn data_as<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.envelope.payload.decode()
    }

    /// Logical name of the queue replies to this message go through.
    #[must_use]
    pub fn response_queue_name(&self) -> String {
        format!("{RESPONSE_QUEUE_PREFIX}{}", self.envelope.id)
    }

    /// Queue replies to this message go through, on the same backend.
    #[must_use]
    pub fn response_queue(&self) -> Queue<B> {
        Queue::new(self.response_queue_name(), self.backend.clone())
    }

    /// Sends a reply to this message.
    ///
    /// # Errors
    ///
    /// Propagates connection and serialization failures from the backend.
    pub async fn respond<P>(&self, payload: P) -> Result<Self>
    where
        P: Into<Payload> + Send,
    {
        self.response_queue().send(payload).await
    }

    /// Sends a reply built from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] if `value` has no JSON form, or
    /// propagates backend failures.
    pub async fn respond_json<T>(&self, value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.respond(Payload::json(value)?).await
    }

    /// Waits for the reply to this message.
    ///
    /// Returns `Ok(None)` if no reply arrived within the configured wait.
    ///
    /// # Errors
    ///
    /// Propagates connection and serialization failures from the backend.
    pub async fn receive_response(&self, options: &ReceiveOptions) -> Result<Option<Self>> {
        self.response_queue().receive(options).await
    }
}
