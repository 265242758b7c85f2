use tracing::{info, warn};

use crate::models::UpdateEvent;
use crate::services::doc_lifecycle_service::DocLifecycleService;

/// Persist an UPDATE event.
///
/// On success the event's version becomes the stored one. On failure the
/// event is left as received and the error is only logged: the caller
/// rebroadcasts it either way.
pub async fn handle_update_message(docs: &DocLifecycleService, update: &mut UpdateEvent) -> bool {
    info!(
        "Update received for document {}: user={}, client version={}, {} bytes",
        update.document_id,
        update.user_id,
        update.version,
        update.content.len()
    );

    match docs
        .apply_update(&update.document_id, update.content.clone(), update.version)
        .await
    {
        Ok(view) => {
            update.version = view.version;
            true
        }
        Err(e) => {
            warn!(
                "Update from {} on document {} not persisted, rebroadcasting anyway: {}",
                update.user_id, update.document_id, e
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::services::doc_lifecycle_service::DocLimits;
    use crate::services::session_service::StaticSessionDirectory;
    use crate::services::update_policy::UpdatePolicy;
    use std::sync::Arc;

    fn update(document_id: &str, content: &str) -> UpdateEvent {
        UpdateEvent {
            document_id: document_id.to_string(),
            content: content.to_string(),
            version: 5,
            user_id: "ada".to_string(),
            user_name: "Ada".to_string(),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn reports_whether_the_update_was_stored() {
        let docs = DocLifecycleService::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(StaticSessionDirectory::open()),
            UpdatePolicy::LastWriteWins,
            DocLimits::default(),
        );
        let doc = docs.get_or_create(42).await.unwrap();

        let mut stored = update(&doc.document_id, "hello");
        assert!(handle_update_message(&docs, &mut stored).await);
        assert_eq!(stored.version, 1);

        let mut lost = update("missing", "hello");
        assert!(!handle_update_message(&docs, &mut lost).await);
        assert_eq!(lost.version, 5);
    }
}
