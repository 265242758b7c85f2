//! Topic-addressed fan-out for document events.
//!
//! Each topic owns a `tokio::sync::broadcast` channel created on first
//! subscription and dropped when its last subscriber leaves. Publishing never
//! waits on subscribers; a subscriber that falls more than `capacity` messages
//! behind skips the ones it missed. Nothing is retained for late subscribers.

use std::collections::{HashMap, HashSet};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::models::BroadcastMessage;

struct Topic {
    sender: broadcast::Sender<BroadcastMessage>,
    subscribers: HashSet<Uuid>,
}

pub struct BroadcastHub {
    topics: RwLock<HashMap<String, Topic>>,
    capacity: usize,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register `connection_id` on `topic` and hand back its receiving end.
    pub async fn subscribe(&self, topic: &str, connection_id: Uuid) -> broadcast::Receiver<BroadcastMessage> {
        let mut topics = self.topics.write().await;
        let entry = topics.entry(topic.to_string()).or_insert_with(|| {
            let (sender, _rx) = broadcast::channel::<BroadcastMessage>(self.capacity);
            Topic { sender, subscribers: HashSet::new() }
        });
        entry.subscribers.insert(connection_id);
        debug!("Connection {} subscribed to {} ({} subscribers)", connection_id, topic, entry.subscribers.len());
        entry.sender.subscribe()
    }

    /// Forget `connection_id`; the topic goes away with its last subscriber.
    pub async fn unsubscribe(&self, topic: &str, connection_id: Uuid) {
        let mut topics = self.topics.write().await;
        if let Some(entry) = topics.get_mut(topic) {
            entry.subscribers.remove(&connection_id);
            if entry.subscribers.is_empty() {
                topics.remove(topic);
                debug!("Topic {} has no subscribers left, dropped", topic);
            }
        }
    }

    /// Deliver `message` to everyone currently on `topic`. Returns how many
    /// receivers it reached; 0 when nobody listens.
    pub async fn publish(&self, topic: &str, message: BroadcastMessage) -> usize {
        let topics = self.topics.read().await;
        match topics.get(topic) {
            Some(entry) => entry.sender.send(message).unwrap_or(0),
            None => 0,
        }
    }

    /// (topics, subscriptions)
    pub async fn stats(&self) -> (usize, usize) {
        let topics = self.topics.read().await;
        let subscriptions = topics.values().map(|t| t.subscribers.len()).sum();
        (topics.len(), subscriptions)
    }
}
