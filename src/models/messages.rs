use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    #[serde(default)]
    pub document_id: String,
    pub content: String,
    /// Client's view of the version on the way in, authoritative on the way out
    #[serde(default)]
    pub version: i64,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorEvent {
    #[serde(default)]
    pub document_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default, alias = "content")]
    pub position: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    #[serde(default)]
    pub document_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Envelope exchanged on a document topic, in both directions
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action")]
pub enum DocumentEvent {
    #[serde(rename = "UPDATE")]
    Update(UpdateEvent),
    #[serde(rename = "CURSOR_MOVE")]
    CursorMove(CursorEvent),
    #[serde(rename = "USER_JOIN")]
    UserJoin(PresenceEvent),
    #[serde(rename = "USER_LEAVE")]
    UserLeave(PresenceEvent),
}

impl DocumentEvent {
    pub fn action(&self) -> &'static str {
        match self {
            DocumentEvent::Update(_) => "UPDATE",
            DocumentEvent::CursorMove(_) => "CURSOR_MOVE",
            DocumentEvent::UserJoin(_) => "USER_JOIN",
            DocumentEvent::UserLeave(_) => "USER_LEAVE",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            DocumentEvent::Update(e) => &e.user_id,
            DocumentEvent::CursorMove(e) => &e.user_id,
            DocumentEvent::UserJoin(e) | DocumentEvent::UserLeave(e) => &e.user_id,
        }
    }

    /// Credit the event to the authenticated sender, whatever the client claimed.
    pub fn attribute_to(&mut self, user_id: &str, user_name: &str) {
        let (id, name) = match self {
            DocumentEvent::Update(e) => (&mut e.user_id, &mut e.user_name),
            DocumentEvent::CursorMove(e) => (&mut e.user_id, &mut e.user_name),
            DocumentEvent::UserJoin(e) | DocumentEvent::UserLeave(e) => (&mut e.user_id, &mut e.user_name),
        };
        *id = user_id.to_string();
        *name = user_name.to_string();
    }

    /// Pin the event to `document_id` and stamp it if the client did not.
    pub fn normalize(&mut self, document_id: &str, now: DateTime<Utc>) {
        let (doc, ts) = match self {
            DocumentEvent::Update(e) => (&mut e.document_id, &mut e.timestamp),
            DocumentEvent::CursorMove(e) => (&mut e.document_id, &mut e.timestamp),
            DocumentEvent::UserJoin(e) | DocumentEvent::UserLeave(e) => {
                (&mut e.document_id, &mut e.timestamp)
            }
        };
        if doc.as_str() != document_id {
            *doc = document_id.to_string();
        }
        if ts.is_none() {
            *ts = Some(now);
        }
    }
}

/// Serialized event fanned out on a topic
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    pub sender_id: Uuid,
    pub content: String,
}

/// Topic address for a document
pub fn document_topic(document_id: &str) -> String {
    format!("document/{}", document_id)
}
