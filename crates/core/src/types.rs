// crates/core/src/types.rs
//! Status enums and the `LogEntry` display line shared across the engine.
//!
//! Every timestamp leaving the engine goes through [`to_iso`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Render an instant the way every snapshot field carries it:
/// ISO-8601 UTC with millisecond precision (`2024-01-01T10:00:00.000Z`).
pub fn to_iso(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// One line of display history attached to a request, subagent, or card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
pub struct LogEntry {
    pub timestamp: Option<String>,
    pub text: String,
}

impl LogEntry {
    pub fn new(timestamp: Option<&DateTime<Utc>>, text: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.map(to_iso),
            text: text.into(),
        }
    }
}

/// Lifecycle of one orchestration request.
///
/// Starts `Running`; only a completion event moves it to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Running,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Status of a named subagent, also used for derived subagent cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum SubagentStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl SubagentStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Idle | Self::Running)
    }
}

impl From<RequestStatus> for SubagentStatus {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Running => Self::Running,
            RequestStatus::Completed => Self::Completed,
            RequestStatus::Failed => Self::Failed,
        }
    }
}

/// Status shown on the orchestrator node. `Idle` when nothing was reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl From<RequestStatus> for OrchestratorStatus {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Running => Self::Running,
            RequestStatus::Completed => Self::Completed,
            RequestStatus::Failed => Self::Failed,
        }
    }
}

/// Routing decision taken for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    #[default]
    Unknown,
    Match,
    BuildNew,
    Template,
}

impl Branch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Match => "match",
            Self::BuildNew => "build_new",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Branch {
    type Err = std::convert::Infallible;

    /// Unrecognised branch names map to `Unknown`; parsing never fails.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "match" => Self::Match,
            "build_new" => Self::BuildNew,
            "template" => Self::Template,
            _ => Self::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_to_iso_has_millis_and_zulu() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(to_iso(&ts), "2024-01-01T10:00:00.000Z");
    }

    #[test]
    fn test_status_serialization_is_lowercase() {
        let json = serde_json::to_string(&SubagentStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let json = serde_json::to_string(&OrchestratorStatus::Idle).unwrap();
        assert_eq!(json, "\"idle\"");
    }

    #[test]
    fn test_branch_round_trips_through_str() {
        assert_eq!("build_new".parse::<Branch>().unwrap(), Branch::BuildNew);
        assert_eq!("match".parse::<Branch>().unwrap(), Branch::Match);
        assert_eq!("whatever".parse::<Branch>().unwrap(), Branch::Unknown);
        assert_eq!(serde_json::to_string(&Branch::BuildNew).unwrap(), "\"build_new\"");
    }

    #[test]
    fn test_request_status_terminality() {
        assert!(!RequestStatus::Running.is_terminal());
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Failed.is_terminal());
        assert!(SubagentStatus::Idle.is_active());
        assert!(!SubagentStatus::Failed.is_active());
    }
}
