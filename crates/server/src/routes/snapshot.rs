// crates/server/src/routes/snapshot.rs
//! Snapshot endpoint polled by the dashboard.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use pokestrator_monitor_core::{
    build_snapshot, read_log_tail, LogReadError, Snapshot, NO_ACTIVITY_WARNING,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const NO_STORE: &str = "no-store, no-cache, must-revalidate";

/// Snapshot served when the log cannot be read: an empty parse with the
/// read failure as the first warning.
pub fn degraded_snapshot(log_path: &str, err: &LogReadError) -> Snapshot {
    let warnings = vec![
        format!("Unable to read log file at {log_path}: {err}"),
        NO_ACTIVITY_WARNING.to_string(),
    ];
    Snapshot::empty(log_path, warnings, Utc::now())
}

/// GET /api/state - Rebuild the orchestrator snapshot from the log tail.
///
/// Always 200 with a snapshot when the log is missing or unreadable. Parsing
/// runs on the blocking pool since a full window can be a few MB of text.
pub async fn get_state(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let log_path = state.log_path_display();

    let snapshot = match read_log_tail(&state.log_path, state.read_window).await {
        Ok(text) => tokio::task::spawn_blocking(move || build_snapshot(&text, &log_path))
            .await
            .map_err(|e| ApiError::Internal(format!("Task join error: {}", e)))?,
        Err(err) => {
            tracing::warn!(path = %log_path, error = %err, "Log unreadable, serving empty snapshot");
            degraded_snapshot(&log_path, &err)
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));

    Ok((headers, Json(snapshot)))
}

/// Create the snapshot routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/state", get(get_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_degraded_snapshot_puts_read_error_first() {
        let err = LogReadError::NotFound {
            path: PathBuf::from("/tmp/nope.log"),
        };
        let snap = degraded_snapshot("/tmp/nope.log", &err);

        assert_eq!(snap.warnings.len(), 2);
        assert!(snap.warnings[0].starts_with("Unable to read log file at /tmp/nope.log: "));
        assert!(snap.warnings[0].contains("not found"));
        assert_eq!(snap.warnings[1], NO_ACTIVITY_WARNING);
        assert_eq!(snap.log_path, "/tmp/nope.log");
        assert!(snap.subagents.is_empty());
        assert!(snap.recent_requests.is_empty());
    }
}
