use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::CollaborativeDocument;

/// Errors raised by a document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("A document already exists for session '{0}'")]
    DuplicateSession(i64),

    #[error("Document '{document_id}' changed concurrently (expected version {expected})")]
    VersionMismatch { document_id: String, expected: i64 },

    #[error("Document '{0}' is no longer active")]
    Inactive(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable record of one collaborative document per session.
///
/// Implementations hold no business rules beyond uniqueness: one document per
/// `session_id` and one per `document_id`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a fresh, empty document. Fails with `DuplicateSession` if the
    /// session already owns one.
    async fn create_document(
        &self,
        session_id: i64,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<CollaborativeDocument>;

    async fn get_by_session_id(&self, session_id: i64) -> StoreResult<Option<CollaborativeDocument>>;

    async fn get_by_document_id(&self, document_id: &str) -> StoreResult<Option<CollaborativeDocument>>;

    /// Store `doc`'s content, size and `updated_at` and increment the stored
    /// version by one. Activity flag and expiry are never written here.
    ///
    /// Fails with `Inactive` once the row is deactivated, and with
    /// `VersionMismatch` when `expected_version` no longer matches the row.
    /// Returns the new stored version.
    async fn update_content(&self, doc: &CollaborativeDocument, expected_version: Option<i64>) -> StoreResult<i64>;

    /// Mark the session's document inactive. Only `is_active` and `updated_at`
    /// change. Returns the document id when an active row was switched off.
    async fn deactivate_session(&self, session_id: i64, now: DateTime<Utc>) -> StoreResult<Option<String>>;

    /// Remove one document by internal id. Missing rows are not an error.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Documents whose `expires_at` is strictly before `now`.
    async fn list_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<CollaborativeDocument>>;

    /// Remove every document whose `expires_at` is strictly before `now`,
    /// active or not. Returns the number of rows removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    /// Number of stored documents, for diagnostics.
    async fn count(&self) -> StoreResult<u64>;
}
