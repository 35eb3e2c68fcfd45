use crate::controller::QueueBackend;
use crate::error::Result;
use crate::message::Message;
use crate::options::ReceiveOptions;
use crate::queue::Queue;

use futures::Stream;
use tracing::warn;

/// Pulls messages from a queue one receive at a time.
///
/// The sequence ends the first time a receive comes back empty, and stays
/// ended: build a new listener to resume.
///
/// [`Listener::next_message`] also ends the sequence when a receive fails,
/// logging the error instead of returning it. Use
/// [`Listener::try_next_message`] to see the error.
#[derive(Debug)]
pub struct Listener<B>
where
    B: QueueBackend,
{
    finished: bool,
    options: ReceiveOptions,
    queue: Queue<B>,
}

impl<B> Listener<B>
where
    B: QueueBackend,
{
    pub(crate) const fn new(queue: Queue<B>, options: ReceiveOptions) -> Self {
        Self {
            finished: false,
            options,
            queue,
        }
    }

    /// Whether the sequence has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// The next message, or `Ok(None)` once the sequence has ended.
    ///
    /// # Errors
    ///
    /// Returns the receive error. The sequence is ended afterwards.
    pub async fn try_next_message(&mut self) -> Result<Option<Message<B>>> {
        if self.finished {
            return Ok(None);
        }

        let next = self.queue.receive(&self.options).await;

        if !matches!(next, Ok(Some(_))) {
            self.finished = true;
        }

        next
    }

    /// The next message, or `None` once the sequence has ended.
    pub async fn next_message(&mut self) -> Option<Message<B>> {
        match self.try_next_message().await {
            Ok(message) => message,
            Err(error) => {
                warn!(queue = %self.queue.name(), %error, "stopped listening");
                None
            }
        }
    }

    /// Adapts the listener into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Message<B>> + Send {
        futures::stream::unfold(self, |mut listener| async move {
            listener
                .next_message()
                .await
                .map(|message| (message, listener))
        })
    }
}
