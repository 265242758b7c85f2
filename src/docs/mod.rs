use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Document store unreachable", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Get or create the document of a learning session
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/document",
    params(("session_id" = i64, Path, description = "Learning session id")),
    responses(
        (status = 200, description = "The session's document", body = DocumentView),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 503, description = "Session service unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_or_create_session_doc_doc() {}

/// Get the document of a learning session
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}/document",
    params(("session_id" = i64, Path, description = "Learning session id")),
    responses(
        (status = 200, description = "The session's document", body = DocumentView),
        (status = 404, description = "No document for this session", body = ErrorResponse),
        (status = 410, description = "Document expired", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_session_doc_doc() {}

/// Deactivate the document of an ended session (services only)
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/document/deactivate",
    params(("session_id" = i64, Path, description = "Learning session id")),
    responses(
        (status = 204, description = "Document deactivated, or nothing to deactivate"),
        (status = 403, description = "Caller is not a service", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn deactivate_session_doc_doc() {}

/// Get a document by its opaque id
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}",
    params(("document_id" = String, Path, description = "Opaque document id")),
    responses(
        (status = 200, description = "The document", body = DocumentView),
        (status = 404, description = "Unknown document", body = ErrorResponse),
        (status = 410, description = "Document expired", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_doc_doc() {}

/// Replace a document's content
#[utoipa::path(
    put,
    path = "/api/v1/documents/{document_id}",
    params(("document_id" = String, Path, description = "Opaque document id")),
    request_body = DocumentUpdateRequest,
    responses(
        (status = 200, description = "Saved document", body = DocumentView),
        (status = 409, description = "Document inactive or version conflict", body = ErrorResponse),
        (status = 410, description = "Document expired", body = ErrorResponse),
        (status = 413, description = "Content too large", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn update_doc_doc() {}

/// Open the collaboration stream of a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}/ws",
    params(("document_id" = String, Path, description = "Opaque document id")),
    responses(
        (status = 101, description = "Switching to WebSocket"),
        (status = 403, description = "Caller is not a participant", body = ErrorResponse),
        (status = 404, description = "Unknown document", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn websocket_doc() {}

/// Runtime diagnostics (services only)
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse),
        (status = 403, description = "Caller is not a service", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        get_or_create_session_doc_doc,
        get_session_doc_doc,
        deactivate_session_doc_doc,
        get_doc_doc,
        update_doc_doc,
        websocket_doc,
        diagnostics_doc,
    ),
    components(
        schemas(HealthResponse, DocumentView, DocumentUpdateRequest, ErrorResponse, DiagnosticsResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
