//! Fan-out notification topics backed by `tokio::sync::broadcast`.
//!
//! Each outbound notification (event batches, completed analyses) gets its own
//! [`Topic`]. Publishing never blocks: subscribers that fall more than the
//! channel capacity behind lose the oldest messages and observe
//! `RecvError::Lagged`.

use tokio::sync::broadcast;

/// Default buffer capacity per topic.
const DEFAULT_CAPACITY: usize = 64;

/// A named fan-out channel for one payload type.
pub struct Topic<T> {
    name: &'static str,
    sender: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Topic<T> {
    /// Create a topic with a specific buffer capacity (at least 1).
    #[must_use]
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { name, sender }
    }

    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, DEFAULT_CAPACITY)
    }

    /// Publish to all current subscribers. Returns how many received it.
    pub fn publish(&self, payload: T) -> usize {
        // A send error only means there are zero receivers.
        self.sender.send(payload).map_or_else(
            |_| {
                tracing::trace!(topic = self.name, "published with no subscribers");
                0
            },
            |receivers| receivers,
        )
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}
