use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The collaborative document bound to one learning session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollaborativeDocument {
    pub id: Uuid,
    pub session_id: i64,
    pub document_id: String,
    pub content: String,
    pub version: i64,
    pub size_in_bytes: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CollaborativeDocument {
    /// A fresh, empty document. Identifiers are generated here and never change.
    pub fn new(session_id: i64, now: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            document_id: new_document_token(),
            content: String::new(),
            version: 0,
            size_in_bytes: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Replace the whole content and bump the version by exactly one.
    pub fn replace_content(&mut self, content: String, now: DateTime<Utc>) {
        self.size_in_bytes = content.len() as i64;
        self.content = content;
        self.version += 1;
        self.updated_at = now;
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }
}

/// Random, unguessable handle exposed to clients and used as the topic key.
fn new_document_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Document as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: Uuid,
    pub document_id: String,
    pub session_id: i64,
    pub content: String,
    pub version: i64,
    pub size_in_bytes: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<CollaborativeDocument> for DocumentView {
    fn from(doc: CollaborativeDocument) -> Self {
        Self {
            id: doc.id,
            document_id: doc.document_id,
            session_id: doc.session_id,
            content: doc.content,
            version: doc.version,
            size_in_bytes: doc.size_in_bytes,
            is_active: doc.is_active,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            expires_at: doc.expires_at,
        }
    }
}

/// Request payload for replacing a document's content
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdateRequest {
    pub content: String,
    /// Version the client last saw. Advisory under last-write-wins.
    #[serde(default)]
    pub version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_starts_empty_at_version_zero() {
        let now = Utc::now();
        let doc = CollaborativeDocument::new(42, now, now + chrono::Duration::hours(24));
        assert_eq!(doc.version, 0);
        assert_eq!(doc.content, "");
        assert_eq!(doc.size_in_bytes, 0);
        assert!(doc.is_active);
        assert_eq!(doc.document_id.len(), 32);
        assert_ne!(doc.document_id, doc.id.simple().to_string());
    }

    #[test]
    fn replace_content_tracks_byte_length() {
        let now = Utc::now();
        let mut doc = CollaborativeDocument::new(1, now, now + chrono::Duration::hours(24));
        doc.replace_content("héllo".to_string(), now);
        assert_eq!(doc.version, 1);
        assert_eq!(doc.size_in_bytes, 6);
        doc.replace_content(String::new(), now);
        assert_eq!(doc.version, 2);
        assert_eq!(doc.size_in_bytes, 0);
    }

    #[test]
    fn view_serializes_camel_case() {
        let now = Utc::now();
        let view = DocumentView::from(CollaborativeDocument::new(7, now, now));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["sessionId"], 7);
        assert_eq!(json["sizeInBytes"], 0);
        assert_eq!(json["isActive"], true);
        assert!(json.get("documentId").is_some());
        assert!(json.get("expiresAt").is_some());
    }
}
