use crate::{auth::auth::{self, ApiError}, models::{DiagnosticsResponse, Identity}, state::AppState};
use axum::{extract::{State, Extension}, http::StatusCode, Json};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Report collaboration and process statistics
pub async fn diagnostics(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), ApiError> {

    // Only administrators may look at server internals
    auth::ensure_admin(&identity)?;

    let n_files = state.registry.file_count() as u32;
    let n_presences = state.registry.entry_count().await as u32;
    let n_identities = state.identities.cached_identities() as u32;

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
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Files: {}, Presences: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_files,
        n_presences
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            service: state.config.service_name.clone(),
            n_files,
            n_presences,
            n_identities,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ))
}
