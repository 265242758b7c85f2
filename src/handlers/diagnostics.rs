use crate::{auth::auth, models::{DiagnosticsResponse, ErrorResponse}, state::AppState};
use axum::{extract::{State, Extension}, http::StatusCode, Json};
use std::sync::Arc;
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::{info, warn};

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Runtime figures for operators
pub async fn diagnostics(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<auth::Principal>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), (StatusCode, Json<ErrorResponse>)> {

    let _ = auth::ensure_service(&principal)?;

    let (n_topics, n_subscribers) = state.hub().stats().await;
    let n_conn = state.connections.count();
    let n_documents = match state.store.count().await {
        Ok(n) => n,
        Err(e) => {
            warn!("Could not count documents: {}", e);
            0
        }
    };

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Topics: {}, Docs: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        n_topics,
        n_documents
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn: n_conn as u32,
            n_topics: n_topics as u32,
            n_subscribers: n_subscribers as u32,
            n_documents,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ))
}
