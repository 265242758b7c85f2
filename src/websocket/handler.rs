use std::sync::Arc;
use axum::{
    extract::{Path, State, Extension, ws::{Message, WebSocket, WebSocketUpgrade}},
    http::StatusCode,
    response::Response,
    Json,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, error, debug};
use futures_util::{StreamExt, SinkExt};
use uuid::Uuid;

use crate::auth::auth::{ensure_session_member, Principal};
use crate::models::{document_topic, DocumentEvent, ErrorResponse};
use crate::state::AppState;
use crate::websocket::connctx::ConnCtx;

// Leaves the topic and forgets the connection however the socket ends
struct SubscriptionGuard {
    state: Arc<AppState>,
    topic: String,
    connection_id: Uuid,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(ctx) = self.state.connections.release(&self.connection_id) {
            debug!("Released connection {} of {} on {}", self.connection_id, ctx.user_id, ctx.document_id);
        }
        let state = self.state.clone();
        let topic = std::mem::take(&mut self.topic);
        let connection_id = self.connection_id;
        tokio::spawn(async move {
            state.hub().unsubscribe(&topic, connection_id).await;
        });
    }
}

/// WebSocket handler
pub async fn websocket_handler(
    Path(document_id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    info!("New WebSocket connection attempt by {} on {}", principal.id(), document_id);

    // Only known, live documents can be joined, and only by session members
    let doc = state.docs.read_by_document_id(&document_id).await?;
    ensure_session_member(state.sessions.as_ref(), &principal, doc.session_id).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, document_id, principal, state)))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, document_id: String, principal: Principal, state: Arc<AppState>) {

    // Generate unique connection ID to identify this client
    let connection_id = Uuid::new_v4();
    let topic = document_topic(&document_id);

    // Subscribe before anything is read so the sender sees its own echo
    let mut rbc = state.hub().subscribe(&topic, connection_id).await;
    state.connections.register(
        connection_id,
        ConnCtx {
            user_id: principal.id().to_string(),
            document_id: document_id.clone(),
        },
    );
    let _guard = SubscriptionGuard {
        state: state.clone(),
        topic: topic.clone(),
        connection_id,
    };
    info!("WebSocket connection established for document_id: {} with connection_id: {}", document_id, connection_id);

    let (mut sender, mut receiver) = socket.split();

    // Read client frames and hand them to the gateway
    let reader_state = state.clone();
    let reader_doc_id = document_id.clone();
    let author = principal;
    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!("WebSocket receive error on {}: {}", connection_id, e);
                    break;
                }
            };
            reader_state.connections.touch(&connection_id);

            let mut event: DocumentEvent = match serde_json::from_str(&text) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Dropping malformed frame for document {}: {}", reader_doc_id, e);
                    continue;
                }
            };
            event.attribute_to(author.id(), author.display_name());
            reader_state.gateway.handle_event(&reader_doc_id, connection_id, event).await;
        }
    });

    // Forward everything published on the topic to this client
    let writer_doc_id = document_id.clone();
    let mut write_task = tokio::spawn(async move {
        loop {
            match rbc.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg.content)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Connection {} on {} lagged, skipped {} messages", connection_id, writer_doc_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        res = (&mut read_task) => {
            write_task.abort();
            if let Err(e) = res { error!("Reader task failed: {}", e); }
        }
        res = (&mut write_task) => {
            read_task.abort();
            if let Err(e) = res { error!("Writer task failed: {}", e); }
        }
    };
    info!("WebSocket connection {} terminated", connection_id);
}
