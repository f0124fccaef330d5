//! In-process change notifier using tokio broadcast channels.
//!
//! Events only reach subscribers in the same process. Publishing to a topic
//! nobody subscribed to drops the event.

use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use futures::Stream;
use teamgate_core::notify::{ChangeEvent, ChangeNotifier};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

/// Stream of change events for one topic.
pub type ChangeStream = Pin<Box<dyn Stream<Item = ChangeEvent> + Send>>;

#[derive(Clone)]
pub struct MemoryNotifier {
    channels: Arc<DashMap<String, broadcast::Sender<ChangeEvent>>>,
    capacity: usize,
}

impl MemoryNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes to `topic`. Events published before this call are not
    /// replayed; a subscriber that falls behind silently skips the events
    /// it missed.
    pub fn subscribe(&self, topic: &str) -> ChangeStream {
        let rx = self
            .channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        let stream = BroadcastStream::new(rx).filter_map(|result| result.ok());
        Box::pin(stream)
    }
}

impl ChangeNotifier for MemoryNotifier {
    fn publish(&self, topic: &str, payload: serde_json::Value) {
        let abandoned = {
            let Some(tx) = self.channels.get(topic) else {
                trace!(topic, "no subscribers, dropping notification");
                return;
            };
            tx.send(ChangeEvent {
                topic: topic.to_string(),
                payload,
            })
            .is_err()
        };
        // The shard guard must be released before removal. A subscriber that
        // arrives in between keeps the channel alive.
        if abandoned {
            trace!(topic, "all subscribers gone, pruning topic");
            self.channels
                .remove_if(topic, |_, tx| tx.receiver_count() == 0);
        }
    }
}
