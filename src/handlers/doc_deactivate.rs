use crate::{auth::auth, models::ErrorResponse, state::AppState};
use axum::{extract::{State, Path, Extension}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

/// Freeze the session's document once the session ends
pub async fn deactivate_session_doc(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<auth::Principal>,
    Path(session_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {

    // Only the session service ends sessions
    let service = auth::ensure_service(&principal)?;

    state.docs.deactivate(session_id).await?;
    info!("Session {} document deactivated by {}", session_id, service);

    Ok(StatusCode::NO_CONTENT)
}
