use crate::controller::{QueueBackend, QueueController};
use crate::error::Result;
use crate::handler::Handler;
use crate::listener::Listener;
use crate::message::Message;
use crate::options::ReceiveOptions;
use crate::payload::Payload;

use serde::Serialize;
use tracing::{debug, warn};

/// A named queue on some backend.
///
/// Constructing a queue performs no I/O.
#[derive(Clone, Debug)]
pub struct Queue<B>
where
    B: QueueBackend,
{
    backend: B,
    controller: B::Controller,
    name: String,
}

impl<B> Queue<B>
where
    B: QueueBackend,
{
    /// Creates a handle to the logical queue `name` on `backend`.
    pub fn new<N>(name: N, backend: B) -> Self
    where
        N: Into<String>,
    {
        let name = name.into();
        let controller = backend.controller(&name);

        Self {
            backend,
            controller,
            name,
        }
    }

    /// Logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend key of the underlying list.
    #[must_use]
    pub fn key(&self) -> &str {
        self.controller.key()
    }

    /// The backend this queue lives on.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Sends `payload` and returns the message that was sent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connection`] if the backend fails, or
    /// [`crate::Error::Serialization`] if the message cannot be encoded.
    pub async fn send<P>(&self, payload: P) -> Result<Message<B>>
    where
        P: Into<Payload> + Send,
    {
        let message = Message::new(self.name.clone(), payload.into(), self.backend.clone());

        debug!(queue = %self.name, id = %message.id(), "sending message");
        self.controller.send(&message).await?;

        Ok(message)
    }

    /// Sends any serializable value as a structured payload.
    ///
    /// # Errors
    ///
    /// Same as [`Queue::send`], plus [`crate::Error::Serialization`] if
    /// `value` has no JSON form.
    pub async fn send_json<T>(&self, value: &T) -> Result<Message<B>>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send(Payload::json(value)?).await
    }

    /// Receives the oldest message.
    ///
    /// Returns `Ok(None)` if nothing arrived within the configured wait.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connection`] if the backend fails, or
    /// [`crate::Error::Serialization`] if the popped entry cannot be decoded.
    pub async fn receive(&self, options: &ReceiveOptions) -> Result<Option<Message<B>>> {
        let message = self.controller.receive(options).await?;

        if let Some(message) = &message {
            debug!(queue = %self.name, id = %message.id(), "received message");
        }

        Ok(message)
    }

    /// Number of messages waiting.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connection`] if the backend fails.
    pub async fn count(&self) -> Result<u64> {
        self.controller.count().await
    }

    /// Sends `payload` and waits for the reply to it.
    ///
    /// Returns `Ok(None)` if no reply arrived within the configured wait.
    ///
    /// # Errors
    ///
    /// Propagates failures from the send and from the receive of the reply.
    pub async fn query<P>(&self, payload: P, options: &ReceiveOptions) -> Result<Option<Message<B>>>
    where
        P: Into<Payload> + Send,
    {
        let request = self.send(payload).await?;

        request.receive_response(options).await
    }

    /// Like [`Queue::query`] for any serializable request.
    ///
    /// # Errors
    ///
    /// Same as [`Queue::query`], plus [`crate::Error::Serialization`] if
    /// `value` has no JSON form.
    pub async fn query_json<T>(
        &self,
        value: &T,
        options: &ReceiveOptions,
    ) -> Result<Option<Message<B>>>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.query(Payload::json(value)?, options).await
    }

    /// Returns a listener yielding messages until a receive comes back empty.
    #[must_use]
    pub fn listen(&self, options: ReceiveOptions) -> Listener<B> {
        Listener::new(self.clone(), options)
    }

    /// Answers requests with `handler` until the listener runs dry.
    ///
    /// Requests the handler fails on are logged and left without a reply.
    /// Returns how many requests were answered.
    ///
    /// # Errors
    ///
    /// Propagates failures to send a reply.
    pub async fn serve<H>(&self, options: ReceiveOptions, handler: &H) -> Result<usize>
    where
        H: Handler<B>,
    {
        let mut listener = self.listen(options);
        let mut answered = 0;

        while let Some(request) = listener.next_message().await {
            match handler.handle(&request).await {
                Ok(response) => {
                    request.respond(response).await?;
                    answered += 1;
                }
                Err(error) => {
                    warn!(queue = %self.name, id = %request.id(), %error, "handler failed");
                }
            }
        }

        Ok(answered)
    }
}
