use crate::{auth::auth, models::{DocumentUpdateRequest, DocumentView, ErrorResponse}, state::AppState};
use axum::{extract::{State, Path, Extension}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::debug;

/// Replace a document's content outside of a live connection.
///
/// Connected clients are not notified; only WebSocket updates are broadcast.
pub async fn update_doc(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<auth::Principal>,
    Path(document_id): Path<String>,
    Json(request): Json<DocumentUpdateRequest>,
) -> Result<(StatusCode, Json<DocumentView>), (StatusCode, Json<ErrorResponse>)> {

    let doc = state.docs.read_by_document_id(&document_id).await?;
    auth::ensure_session_member(state.sessions.as_ref(), &principal, doc.session_id).await?;

    let updated = state
        .docs
        .apply_update(&document_id, request.content, request.version)
        .await?;
    debug!("{} saved version {} of {}", principal.id(), updated.version, document_id);

    Ok((StatusCode::OK, Json(updated)))
}
