use crate::{auth::auth, models::{DocumentView, ErrorResponse}, state::AppState};
use axum::{extract::{State, Path, Extension}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

/// Get the session's document, creating it on first use
pub async fn get_or_create_session_doc(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<auth::Principal>,
    Path(session_id): Path<i64>,
) -> Result<(StatusCode, Json<DocumentView>), (StatusCode, Json<ErrorResponse>)> {

    // Ensure the caller is a participant or a service
    auth::ensure_session_member(state.sessions.as_ref(), &principal, session_id).await?;

    let doc = state.docs.get_or_create(session_id).await?;
    info!("{} opened document {} of session {}", principal.id(), doc.document_id, session_id);

    Ok((StatusCode::OK, Json(doc)))
}

/// Get the session's document without creating it
pub async fn get_session_doc(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<auth::Principal>,
    Path(session_id): Path<i64>,
) -> Result<(StatusCode, Json<DocumentView>), (StatusCode, Json<ErrorResponse>)> {

    auth::ensure_session_member(state.sessions.as_ref(), &principal, session_id).await?;

    let doc = state.docs.read_by_session_id(session_id).await?;
    Ok((StatusCode::OK, Json(doc)))
}
