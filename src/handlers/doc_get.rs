use crate::{auth::auth, models::{DocumentView, ErrorResponse}, state::AppState};
use axum::{extract::{State, Path, Extension}, http::StatusCode, Json};
use std::sync::Arc;

/// Get a document by its opaque id
pub async fn get_doc(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<auth::Principal>,
    Path(document_id): Path<String>,
) -> Result<(StatusCode, Json<DocumentView>), (StatusCode, Json<ErrorResponse>)> {

    let doc = state.docs.read_by_document_id(&document_id).await?;
    auth::ensure_session_member(state.sessions.as_ref(), &principal, doc.session_id).await?;

    Ok((StatusCode::OK, Json(doc)))
}
