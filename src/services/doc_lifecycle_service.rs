use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{DocumentStore, StoreError};
use crate::models::{CollaborativeDocument, DocError, DocumentView};
use crate::services::session_service::SessionDirectory;
use crate::services::update_policy::UpdatePolicy;

/// Size and lifetime bounds applied to every document
#[derive(Debug, Clone, Copy)]
pub struct DocLimits {
    pub max_content_bytes: usize,
    pub ttl: chrono::Duration,
}

impl Default for DocLimits {
    fn default() -> Self {
        Self {
            max_content_bytes: 10 * 1024 * 1024,
            ttl: chrono::Duration::hours(24),
        }
    }
}

/// Creates, reads, updates and deactivates session documents
pub struct DocLifecycleService {
    store: Arc<dyn DocumentStore>,
    sessions: Arc<dyn SessionDirectory>,
    policy: UpdatePolicy,
    limits: DocLimits,
}

/// Reject missing and expired documents
fn live(doc: Option<CollaborativeDocument>, key: &str, now: DateTime<Utc>) -> Result<CollaborativeDocument, DocError> {
    let doc = doc.ok_or_else(|| DocError::DocumentNotFound(key.to_string()))?;
    if doc.is_expired(now) {
        return Err(DocError::DocumentExpired(doc.document_id));
    }
    Ok(doc)
}

impl DocLifecycleService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        sessions: Arc<dyn SessionDirectory>,
        policy: UpdatePolicy,
        limits: DocLimits,
    ) -> Self {
        Self { store, sessions, policy, limits }
    }

    pub fn limits(&self) -> DocLimits {
        self.limits
    }

    /// Return the session's live document, creating it on first use.
    ///
    /// An expired document still occupying the session is removed and replaced
    /// by a fresh one with a new opaque id.
    pub async fn get_or_create(&self, session_id: i64) -> Result<DocumentView, DocError> {
        if !self.sessions.session_exists(session_id).await? {
            return Err(DocError::SessionNotFound(session_id));
        }

        let now = Utc::now();
        if let Some(doc) = self.store.get_by_session_id(session_id).await? {
            if !doc.is_expired(now) {
                debug!("Reusing document {} for session {}", doc.document_id, session_id);
                return Ok(doc.into());
            }
            info!("Document {} of session {} expired, replacing it", doc.document_id, session_id);
            self.store.delete(doc.id).await?;
        }

        match self.store.create_document(session_id, now, now + self.limits.ttl).await {
            Ok(doc) => {
                info!("Created document {} for session {}", doc.document_id, session_id);
                Ok(doc.into())
            }
            Err(StoreError::DuplicateSession(_)) => {
                // A concurrent caller created it first
                let doc = self.store.get_by_session_id(session_id).await?;
                Ok(live(doc, &session_id.to_string(), now)?.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn read_by_document_id(&self, document_id: &str) -> Result<DocumentView, DocError> {
        let doc = self.store.get_by_document_id(document_id).await?;
        Ok(live(doc, document_id, Utc::now())?.into())
    }

    pub async fn read_by_session_id(&self, session_id: i64) -> Result<DocumentView, DocError> {
        let doc = self.store.get_by_session_id(session_id).await?;
        Ok(live(doc, &session_id.to_string(), Utc::now())?.into())
    }

    /// Replace the document's content wholesale and bump its version.
    ///
    /// Whether `client_version` matters is up to the configured [`UpdatePolicy`].
    pub async fn apply_update(
        &self,
        document_id: &str,
        content: String,
        client_version: i64,
    ) -> Result<DocumentView, DocError> {
        let now = Utc::now();
        let mut doc = live(self.store.get_by_document_id(document_id).await?, document_id, now)?;

        let size = content.len();
        if size > self.limits.max_content_bytes {
            return Err(DocError::ContentTooLarge {
                size,
                limit: self.limits.max_content_bytes,
            });
        }
        if !doc.is_active {
            return Err(DocError::DocumentInactive(doc.document_id));
        }

        let expected = self.policy.admit(doc.version, client_version)?;
        if client_version != doc.version {
            debug!(
                "Document {} updated from stale version {} (stored {})",
                document_id, client_version, doc.version
            );
        }
        doc.replace_content(content, now);

        match self.store.update_content(&doc, expected).await {
            Ok(version) => {
                doc.version = version;
                Ok(doc.into())
            }
            Err(StoreError::Inactive(_)) => {
                warn!("Document {} was deactivated while being updated", document_id);
                Err(DocError::DocumentInactive(document_id.to_string()))
            }
            Err(StoreError::VersionMismatch { expected, .. }) => {
                let current = self
                    .store
                    .get_by_document_id(document_id)
                    .await?
                    .map_or(expected, |d| d.version);
                warn!("Concurrent update on document {} rejected", document_id);
                Err(DocError::VersionConflict {
                    expected: current,
                    actual: client_version,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Freeze the session's document. No-op if there is none or it is already inactive.
    pub async fn deactivate(&self, session_id: i64) -> Result<(), DocError> {
        match self.store.deactivate_session(session_id, Utc::now()).await? {
            Some(document_id) => info!("Deactivated document {} of session {}", document_id, session_id),
            None => debug!("No active document to deactivate for session {}", session_id),
        }
        Ok(())
    }
}
