// crates/server/src/state.rs
//! Application state for the Axum server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state accessible from all route handlers.
///
/// Nothing here is mutable: every poll re-reads the log from scratch.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Orchestrator log to tail on each snapshot request.
    pub log_path: PathBuf,
    /// Physical lines read from the end of the log per request.
    pub read_window: usize,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(log_path: impl Into<PathBuf>, read_window: usize) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            log_path: log_path.into(),
            read_window,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Log path as shown to the dashboard.
    pub fn log_path_display(&self) -> String {
        self.log_path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_new() {
        let state = AppState::new("logs/pokestrator.log", 100);
        assert!(state.uptime_secs() < 1);
        assert_eq!(state.read_window, 100);
        assert_eq!(state.log_path_display(), "logs/pokestrator.log");
    }

    #[test]
    fn test_uptime_increases() {
        let state = AppState::new("x.log", 10);
        let initial = state.uptime_secs();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(state.uptime_secs() >= initial);
    }
}
