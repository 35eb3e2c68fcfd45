use std::time::Duration;

/// How long a receive may wait for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeout {
    /// Block until a message arrives.
    Forever,

    /// Give up after the duration and report that no message arrived.
    After(Duration),
}

/// Options for a single receive.
///
/// There is no default: callers pick between blocking forever
/// and a bounded wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiveOptions {
    timeout: Timeout,
}

impl ReceiveOptions {
    /// Wait until a message arrives.
    #[must_use]
    pub const fn wait_forever() -> Self {
        Self {
            timeout: Timeout::Forever,
        }
    }

    /// Wait at most `timeout`. A zero duration waits forever, like the
    /// backend's own blocking pop.
    #[must_use]
    pub const fn timeout(timeout: Duration) -> Self {
        if timeout.is_zero() {
            Self::wait_forever()
        } else {
            Self {
                timeout: Timeout::After(timeout),
            }
        }
    }

    /// Wait at most `secs` seconds; zero waits forever.
    #[must_use]
    pub const fn timeout_secs(secs: u64) -> Self {
        Self::timeout(Duration::from_secs(secs))
    }

    /// The configured wait.
    #[must_use]
    pub const fn wait(&self) -> Timeout {
        self.timeout
    }
}
