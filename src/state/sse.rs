use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Fan-out of session events to every connected SSE client.
///
/// Slow clients lag and skip events rather than slowing the session down.
pub struct EventHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventHub {
    /// Hub buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::Sender::new(capacity),
        }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Publish `event`, returning how many subscribers will see it.
    pub fn publish(&self, event: ServerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// True when at least one client listens.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}
