//! In-memory (single process) implementation of the queue backend for tests
//! and local development.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod controller;

pub use controller::MemoryQueueController;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use courier_queue::{QueueBackend, Result, Timeout, WireFormat, queue_key};
use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, timeout_at};
use tracing::info;

#[derive(Debug, Default)]
struct MemoryList {
    entries: VecDeque<Bytes>,
    notify: Arc<Notify>,
}

/// In-memory list store shared by every queue built from clones of it.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    format: WireFormat,
    // Bumped by every cleanup.
    generation: Arc<AtomicU64>,
    lists: Arc<Mutex<HashMap<String, MemoryList>>>,
}

impl MemoryBackend {
    /// Creates an empty backend using the JSON wire format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend using `format`.
    #[must_use]
    pub fn with_format(format: WireFormat) -> Self {
        Self {
            format,
            generation: Arc::default(),
            lists: Arc::default(),
        }
    }

    /// Wire format envelopes are stored in.
    #[must_use]
    pub const fn format(&self) -> WireFormat {
        self.format
    }

    /// Pushes an already-encoded entry onto the list for logical queue `name`.
    pub async fn push_raw(&self, name: &str, entry: Bytes) {
        self.push(&queue_key(name), entry).await;
    }

    pub(crate) async fn push(&self, key: &str, entry: Bytes) {
        let mut lists = self.lists.lock().await;
        let list = lists.entry(key.to_string()).or_default();

        list.entries.push_front(entry);
        list.notify.notify_waiters();
    }

    pub(crate) async fn pop(&self, key: &str, wait: Timeout) -> Option<Bytes> {
        let deadline = match wait {
            Timeout::Forever => None,
            Timeout::After(duration) => Some(Instant::now() + duration),
        };

        let generation = self.generation.load(Ordering::Acquire);

        loop {
            let mut lists = self.lists.lock().await;

            // Waiters from before a cleanup give up instead of waiting on a fresh list.
            if self.generation.load(Ordering::Acquire) != generation {
                return None;
            }

            let list = lists.entry(key.to_string()).or_default();

            if let Some(entry) = list.entries.pop_back() {
                Self::prune(&mut lists, key);
                return Some(entry);
            }

            let notify = Arc::clone(&list.notify);
            let timed_out = {
                let notified = notify.notified();
                tokio::pin!(notified);
                // Registered before the lock is released so no push can be missed.
                notified.as_mut().enable();
                drop(lists);

                match deadline {
                    Some(deadline) => timeout_at(deadline, notified).await.is_err(),
                    None => {
                        notified.await;
                        false
                    }
                }
            };

            if timed_out {
                drop(notify);
                Self::prune(&mut *self.lists.lock().await, key);
                return None;
            }
        }
    }

    pub(crate) async fn len(&self, key: &str) -> u64 {
        self.lists
            .lock()
            .await
            .get(key)
            .map_or(0, |list| list.entries.len() as u64)
    }

    // Drops a list that is empty and has no one waiting on it.
    fn prune(lists: &mut HashMap<String, MemoryList>, key: &str) {
        if lists
            .get(key)
            .is_some_and(|list| list.entries.is_empty() && Arc::strong_count(&list.notify) == 1)
        {
            lists.remove(key);
        }
    }
}

#[async_trait]
impl QueueBackend for MemoryBackend {
    type Controller = MemoryQueueController;

    fn controller(&self, name: &str) -> Self::Controller {
        MemoryQueueController::new(self.clone(), queue_key(name))
    }

    async fn cleanup(&self) -> Result<()> {
        let mut lists = self.lists.lock().await;

        if !lists.is_empty() {
            info!(lists = lists.len(), "discarding in-memory queues");
        }

        self.generation.fetch_add(1, Ordering::AcqRel);
        for list in lists.values() {
            list.notify.notify_waiters();
        }
        lists.clear();

        Ok(())
    }
}
