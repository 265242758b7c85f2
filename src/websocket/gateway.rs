use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::models::{document_topic, BroadcastMessage, DocumentEvent};
use crate::services::doc_lifecycle_service::DocLifecycleService;
use crate::websocket::broadcast::BroadcastHub;
use crate::websocket::msg_presence_handler::handle_presence_message;
use crate::websocket::msg_update_handler::handle_update_message;

/// Applies inbound document events and republishes them on the document topic
pub struct CollaborationGateway {
    docs: Arc<DocLifecycleService>,
    hub: Arc<BroadcastHub>,
}

impl CollaborationGateway {
    pub fn new(docs: Arc<DocLifecycleService>, hub: Arc<BroadcastHub>) -> Self {
        Self { docs, hub }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Handle one event from `sender_id` on `document_id`'s topic.
    ///
    /// Every event is rebroadcast exactly once, whether or not an UPDATE could
    /// be persisted. Returns the number of subscribers reached.
    pub async fn handle_event(&self, document_id: &str, sender_id: Uuid, mut event: DocumentEvent) -> usize {
        event.normalize(document_id, Utc::now());
        debug!("{} from {} on document {}", event.action(), event.user_id(), document_id);

        match &mut event {
            DocumentEvent::Update(update) => {
                let stored = handle_update_message(&self.docs, update).await;
                debug!(
                    "Rebroadcasting update on {} ({})",
                    document_id,
                    if stored { "stored" } else { "not stored" }
                );
            }
            ephemeral => handle_presence_message(ephemeral),
        }

        self.publish(document_id, sender_id, &event).await
    }

    async fn publish(&self, document_id: &str, sender_id: Uuid, event: &DocumentEvent) -> usize {
        let content = match serde_json::to_string(event) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to serialize {} event for {}: {}", event.action(), document_id, e);
                return 0;
            }
        };
        let topic = document_topic(document_id);
        self.hub
            .publish(&topic, BroadcastMessage { sender_id, content })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DocumentStore, MemoryDocumentStore};
    use crate::models::{CursorEvent, PresenceEvent, UpdateEvent};
    use crate::services::doc_lifecycle_service::DocLimits;
    use crate::services::session_service::StaticSessionDirectory;
    use crate::services::update_policy::UpdatePolicy;
    use chrono::Duration;
    use serde_json::{json, Value};
    use tokio::sync::broadcast::Receiver;

    struct Fixture {
        store: Arc<MemoryDocumentStore>,
        docs: Arc<DocLifecycleService>,
        gateway: CollaborationGateway,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryDocumentStore::new());
        let docs = Arc::new(DocLifecycleService::new(
            store.clone(),
            Arc::new(StaticSessionDirectory::open()),
            UpdatePolicy::LastWriteWins,
            DocLimits::default(),
        ));
        let hub = Arc::new(BroadcastHub::new(16));
        let gateway = CollaborationGateway::new(docs.clone(), hub);
        Fixture { store, docs, gateway }
    }

    fn update(content: &str, version: i64) -> DocumentEvent {
        DocumentEvent::Update(UpdateEvent {
            document_id: String::new(),
            content: content.to_string(),
            version,
            user_id: "ada".to_string(),
            user_name: "Ada".to_string(),
            timestamp: None,
        })
    }

    async fn next_json(rx: &mut Receiver<BroadcastMessage>) -> Value {
        let msg = rx.recv().await.unwrap();
        serde_json::from_str(&msg.content).unwrap()
    }

    #[tokio::test]
    async fn update_is_persisted_and_carries_authoritative_version() {
        let f = fixture();
        let doc = f.docs.get_or_create(42).await.unwrap();
        let mut rx = f.gateway.hub().subscribe(&document_topic(&doc.document_id), Uuid::new_v4()).await;

        f.docs.apply_update(&doc.document_id, "first".into(), 0).await.unwrap();
        let reached = f.gateway.handle_event(&doc.document_id, Uuid::new_v4(), update("second", 0)).await;
        assert_eq!(reached, 1);

        let out = next_json(&mut rx).await;
        assert_eq!(out["action"], "UPDATE");
        assert_eq!(out["documentId"], doc.document_id.as_str());
        assert_eq!(out["content"], "second");
        assert_eq!(out["version"], 2);
        assert!(out["timestamp"].is_string());

        let stored = f.docs.read_by_document_id(&doc.document_id).await.unwrap();
        assert_eq!(stored.content, "second");
    }

    #[tokio::test]
    async fn failed_update_on_expired_document_is_still_rebroadcast() {
        let f = fixture();
        let past = Utc::now() - Duration::hours(48);
        let expired = f
            .store
            .create_document(42, past, past + Duration::hours(24))
            .await
            .unwrap();
        let mut rx = f.gateway.hub().subscribe(&document_topic(&expired.document_id), Uuid::new_v4()).await;

        let reached = f.gateway.handle_event(&expired.document_id, Uuid::new_v4(), update("ghost", 7)).await;
        assert_eq!(reached, 1);

        let out = next_json(&mut rx).await;
        assert_eq!(out["content"], "ghost");
        // Left as received
        assert_eq!(out["version"], 7);

        let stored = f.store.get_by_document_id(&expired.document_id).await.unwrap().unwrap();
        assert_eq!(stored.version, 0);
        assert_eq!(stored.content, "");
    }

    #[tokio::test]
    async fn oversized_update_is_rebroadcast_but_not_stored() {
        let f = fixture();
        let doc = f.docs.get_or_create(42).await.unwrap();
        let mut rx = f.gateway.hub().subscribe(&document_topic(&doc.document_id), Uuid::new_v4()).await;

        let too_big = "b".repeat(DocLimits::default().max_content_bytes + 1);
        f.gateway.handle_event(&doc.document_id, Uuid::new_v4(), update(&too_big, 0)).await;

        let out = next_json(&mut rx).await;
        assert_eq!(out["version"], 0);
        assert_eq!(f.docs.read_by_document_id(&doc.document_id).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn cursor_and_presence_never_touch_the_store() {
        let f = fixture();
        let mut rx = f.gateway.hub().subscribe(&document_topic("unknown"), Uuid::new_v4()).await;

        let cursor = DocumentEvent::CursorMove(CursorEvent {
            document_id: "something-else".to_string(),
            user_id: "ada".to_string(),
            user_name: "Ada".to_string(),
            position: json!({"line": 1, "ch": 3}),
            timestamp: None,
        });
        let join = DocumentEvent::UserJoin(PresenceEvent {
            document_id: String::new(),
            user_id: "ada".to_string(),
            user_name: "Ada".to_string(),
            timestamp: None,
        });
        let leave = DocumentEvent::UserLeave(PresenceEvent {
            document_id: String::new(),
            user_id: "ada".to_string(),
            user_name: "Ada".to_string(),
            timestamp: None,
        });
        f.gateway.handle_event("unknown", Uuid::new_v4(), cursor).await;
        f.gateway.handle_event("unknown", Uuid::new_v4(), join).await;
        f.gateway.handle_event("unknown", Uuid::new_v4(), leave).await;

        let first = next_json(&mut rx).await;
        assert_eq!(first["action"], "CURSOR_MOVE");
        assert_eq!(first["documentId"], "unknown");
        assert_eq!(first["position"], json!({"line": 1, "ch": 3}));
        let second = next_json(&mut rx).await;
        assert_eq!(second["action"], "USER_JOIN");
        let third = next_json(&mut rx).await;
        assert_eq!(third["action"], "USER_LEAVE");
        assert_eq!(third["documentId"], "unknown");
        assert_eq!(third["userName"], "Ada");

        assert_eq!(f.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sender_receives_its_own_echo() {
        let f = fixture();
        let doc = f.docs.get_or_create(42).await.unwrap();
        let me = Uuid::new_v4();
        let mut rx = f.gateway.hub().subscribe(&document_topic(&doc.document_id), me).await;

        f.gateway.handle_event(&doc.document_id, me, update("echo", 0)).await;
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.sender_id, me);
    }
}
