use crate::error::Result;
use crate::message::Message;
use crate::options::ReceiveOptions;

use std::fmt::Debug;

use async_trait::async_trait;

/// A backend that queues can be built on.
///
/// A backend value is plain data: the configuration and shared connection
/// state needed to build a controller for any queue name. Messages carry a
/// clone of it so replies use the same backend as the request.
#[async_trait]
pub trait QueueBackend: Clone + Debug + Send + Sync + 'static {
    /// Controller type for this backend.
    type Controller: QueueController<Backend = Self>;

    /// Creates the controller for the logical queue `name`.
    ///
    /// Must not perform any I/O; connections are only used lazily.
    fn controller(&self, name: &str) -> Self::Controller;

    /// Releases shared resources such as connection pools.
    ///
    /// Calling this more than once is a no-op.
    async fn cleanup(&self) -> Result<()>;
}

/// Moves encoded envelopes in and out of one backend list.
#[async_trait]
pub trait QueueController: Clone + Debug + Send + Sync + 'static {
    /// Backend this controller belongs to.
    type Backend: QueueBackend<Controller = Self>;

    /// Backend key of the list this controller works on.
    fn key(&self) -> &str;

    /// Encodes `message` and appends it to the list.
    async fn send(&self, message: &Message<Self::Backend>) -> Result<()>;

    /// Pops the oldest message, waiting as long as `options` allows.
    ///
    /// Returns `Ok(None)` if the wait elapsed with nothing to pop.
    async fn receive(&self, options: &ReceiveOptions) -> Result<Option<Message<Self::Backend>>>;

    /// Current number of messages in the list.
    async fn count(&self) -> Result<u64>;
}
