use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::store::{DocumentStore, StoreError, StoreResult};
use crate::models::CollaborativeDocument;

#[derive(Default)]
struct Tables {
    docs: HashMap<Uuid, CollaborativeDocument>,
    by_session: HashMap<i64, Uuid>,
    by_document: HashMap<String, Uuid>,
}

impl Tables {
    fn remove(&mut self, id: &Uuid) -> Option<CollaborativeDocument> {
        let doc = self.docs.remove(id)?;
        self.by_session.remove(&doc.session_id);
        self.by_document.remove(&doc.document_id);
        Some(doc)
    }
}

/// Process-local document store, used when no database is configured
#[derive(Default)]
pub struct MemoryDocumentStore {
    tables: RwLock<Tables>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document(
        &self,
        session_id: i64,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<CollaborativeDocument> {
        let mut tables = self.tables.write().await;
        if tables.by_session.contains_key(&session_id) {
            return Err(StoreError::DuplicateSession(session_id));
        }
        let doc = CollaborativeDocument::new(session_id, created_at, expires_at);
        tables.by_session.insert(session_id, doc.id);
        tables.by_document.insert(doc.document_id.clone(), doc.id);
        tables.docs.insert(doc.id, doc.clone());
        debug!("Created document {} for session {}", doc.document_id, session_id);
        Ok(doc)
    }

    async fn get_by_session_id(&self, session_id: i64) -> StoreResult<Option<CollaborativeDocument>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_session
            .get(&session_id)
            .and_then(|id| tables.docs.get(id))
            .cloned())
    }

    async fn get_by_document_id(&self, document_id: &str) -> StoreResult<Option<CollaborativeDocument>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_document
            .get(document_id)
            .and_then(|id| tables.docs.get(id))
            .cloned())
    }

    async fn update_content(&self, doc: &CollaborativeDocument, expected_version: Option<i64>) -> StoreResult<i64> {
        let mut tables = self.tables.write().await;
        let stored = tables.docs.get_mut(&doc.id).ok_or_else(|| {
            StoreError::Unavailable(format!("Document '{}' no longer stored", doc.document_id))
        })?;
        if !stored.is_active {
            return Err(StoreError::Inactive(doc.document_id.clone()));
        }
        if let Some(expected) = expected_version {
            if stored.version != expected {
                return Err(StoreError::VersionMismatch {
                    document_id: doc.document_id.clone(),
                    expected,
                });
            }
        }
        stored.replace_content(doc.content.clone(), doc.updated_at);
        Ok(stored.version)
    }

    async fn deactivate_session(&self, session_id: i64, now: DateTime<Utc>) -> StoreResult<Option<String>> {
        let mut tables = self.tables.write().await;
        let Some(id) = tables.by_session.get(&session_id).copied() else {
            return Ok(None);
        };
        match tables.docs.get_mut(&id) {
            Some(stored) if stored.is_active => {
                stored.deactivate(now);
                Ok(Some(stored.document_id.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.tables.write().await.remove(&id);
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<CollaborativeDocument>> {
        let tables = self.tables.read().await;
        Ok(tables
            .docs
            .values()
            .filter(|d| d.expires_at < now)
            .cloned()
            .collect())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let expired: Vec<Uuid> = tables
            .docs
            .values()
            .filter(|d| d.expires_at < now)
            .map(|d| d.id)
            .collect();
        for id in &expired {
            tables.remove(id);
        }
        Ok(expired.len() as u64)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.tables.read().await.docs.len() as u64)
    }
}
