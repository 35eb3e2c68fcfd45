//! Correlated request/response messaging over list-backed brokers.
//!
//! A [`Queue`] wraps one backend list. Producers [`Queue::send`] payloads,
//! consumers [`Queue::receive`] or [`Queue::listen`], and a request can be
//! answered with [`Message::respond`]: the reply goes to the queue named
//! `"response:" + id`, where [`Queue::query`] is waiting for it.
//!
//! Backends implement [`QueueBackend`] and [`QueueController`].
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod codec;

/// Backend and controller interfaces.
pub mod controller;

mod error;

/// Request handlers for [`Queue::serve`].
pub mod handler;

/// Queue name fingerprints and backend keys.
pub mod hash;

/// Pull-based iteration over a queue.
pub mod listener;

/// Messages and reply correlation.
pub mod message;

/// Receive options.
pub mod options;

/// Message bodies.
pub mod payload;

/// Named queues.
pub mod queue;

pub use codec::{Envelope, WireFormat};
pub use controller::{QueueBackend, QueueController};
pub use error::{Error, Result};
pub use handler::Handler;
pub use hash::{fingerprint, queue_key};
pub use listener::Listener;
pub use message::{Message, RESPONSE_QUEUE_PREFIX};
pub use options::{ReceiveOptions, Timeout};
pub use payload::Payload;
pub use queue::Queue;
