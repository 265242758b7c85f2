use tracing::debug;

use crate::models::DocumentEvent;

/// CURSOR_MOVE, USER_JOIN and USER_LEAVE are relayed as-is and never touch the store.
pub fn handle_presence_message(event: &DocumentEvent) {
    match event {
        DocumentEvent::CursorMove(cursor) => {
            debug!("Cursor of {} moved on document {}", cursor.user_id, cursor.document_id);
        }
        DocumentEvent::UserJoin(presence) => {
            debug!("{} ({}) joined document {}", presence.user_name, presence.user_id, presence.document_id);
        }
        DocumentEvent::UserLeave(presence) => {
            debug!("{} ({}) left document {}", presence.user_name, presence.user_id, presence.document_id);
        }
        DocumentEvent::Update(_) => {}
    }
}
