// crates/core/src/snapshot.rs
//! Immutable, display-ready snapshot derived from accumulated requests.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::accumulator::{reconstruct, Request};
use crate::types::{to_iso, Branch, LogEntry, OrchestratorStatus, RequestStatus, SubagentStatus};

/// Log entries shown on the orchestrator node and on each subagent card.
pub const DISPLAY_LOG_LIMIT: usize = 8;

/// Number of requests listed in `recentRequests`.
pub const RECENT_REQUEST_LIMIT: usize = 8;

pub const NO_ACTIVITY_WARNING: &str = "No orchestrator activity found yet.";

/// Everything the dashboard needs for one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub generated_at: String,
    pub log_path: String,
    pub warnings: Vec<String>,
    pub orchestrator: OrchestratorView,
    pub subagents: Vec<SubagentCard>,
    pub recent_requests: Vec<RequestSummary>,
}

/// The orchestrator node, mirroring the active request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorView {
    pub status: OrchestratorStatus,
    pub request_id: Option<String>,
    pub task_description: String,
    pub branch: Branch,
    pub started_at: Option<String>,
    pub last_updated_at: Option<String>,
    pub logs: Vec<LogEntry>,
}

impl OrchestratorView {
    pub fn idle() -> Self {
        Self {
            status: OrchestratorStatus::Idle,
            request_id: None,
            task_description: String::new(),
            branch: Branch::Unknown,
            started_at: None,
            last_updated_at: None,
            logs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SubagentCard {
    pub name: String,
    pub status: SubagentStatus,
    pub description: String,
    /// Request whose instance of this subagent backs the card.
    pub request_id: String,
    pub last_updated_at: Option<String>,
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SubagentSummary {
    pub name: String,
    pub status: SubagentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../dashboard/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub id: String,
    pub task_description: String,
    pub status: RequestStatus,
    pub branch: Branch,
    pub accepted_at: Option<String>,
    pub completed_at: Option<String>,
    pub last_updated_at: Option<String>,
    pub subagents: Vec<SubagentSummary>,
}

impl RequestSummary {
    fn from_request(request: &Request) -> Self {
        Self {
            id: request.id.clone(),
            task_description: request.task_description.clone(),
            status: request.status,
            branch: request.branch,
            accepted_at: request.accepted_at.as_ref().map(to_iso),
            completed_at: request.completed_at.as_ref().map(to_iso),
            last_updated_at: request.last_updated_at.as_ref().map(to_iso),
            subagents: request
                .subagents_in_order()
                .map(|s| SubagentSummary {
                    name: s.name.clone(),
                    status: s.status,
                })
                .collect(),
        }
    }
}

impl Snapshot {
    /// An idle snapshot carrying only `warnings`; used when the log cannot be read.
    pub fn empty(log_path: &str, warnings: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            generated_at: to_iso(&now),
            log_path: log_path.to_string(),
            warnings,
            orchestrator: OrchestratorView::idle(),
            subagents: Vec::new(),
            recent_requests: Vec::new(),
        }
    }
}

/// Parse `text` and derive a snapshot stamped with the current time.
pub fn build_snapshot(text: &str, log_path: &str) -> Snapshot {
    build_snapshot_at(text, log_path, Utc::now())
}

/// [`build_snapshot`] with an explicit generation time.
pub fn build_snapshot_at(text: &str, log_path: &str, now: DateTime<Utc>) -> Snapshot {
    let requests = reconstruct(text);
    derive_snapshot(&requests, log_path, now)
}

/// Requests in chronological order: by `acceptedAt`, else `lastUpdatedAt`,
/// with missing timestamps earliest. Ties keep first-seen order.
pub fn chronological(requests: &[Request]) -> Vec<&Request> {
    let mut ordered: Vec<&Request> = requests.iter().collect();
    ordered.sort_by_key(|r| r.sort_key());
    ordered
}

/// The request the orchestrator node mirrors: the latest running one, else
/// the latest overall.
pub fn select_active<'a>(ordered: &[&'a Request]) -> Option<&'a Request> {
    ordered
        .iter()
        .rev()
        .find(|r| r.status == RequestStatus::Running)
        .or_else(|| ordered.last())
        .copied()
}

/// Project accumulated requests into the immutable snapshot.
pub fn derive_snapshot(requests: &[Request], log_path: &str, now: DateTime<Utc>) -> Snapshot {
    let ordered = chronological(requests);
    let active = select_active(&ordered);

    let mut warnings = Vec::new();
    if active.is_none() {
        warnings.push(NO_ACTIVITY_WARNING.to_string());
    }

    let orchestrator = active.map_or_else(OrchestratorView::idle, orchestrator_view);
    let subagents = subagent_cards(&ordered, active);
    let recent_requests = ordered
        .iter()
        .rev()
        .take(RECENT_REQUEST_LIMIT)
        .map(|r| RequestSummary::from_request(r))
        .collect();

    tracing::debug!(
        requests = requests.len(),
        active = active.map(|r| r.id.as_str()),
        "derived snapshot"
    );

    Snapshot {
        generated_at: to_iso(&now),
        log_path: log_path.to_string(),
        warnings,
        orchestrator,
        subagents,
        recent_requests,
    }
}

fn orchestrator_view(request: &Request) -> OrchestratorView {
    OrchestratorView {
        status: request.status.into(),
        request_id: Some(request.id.clone()),
        task_description: request.task_description.clone(),
        branch: request.branch,
        started_at: request.sort_key().as_ref().map(to_iso),
        last_updated_at: request.last_updated_at.as_ref().map(to_iso),
        logs: request.logs.last(DISPLAY_LOG_LIMIT),
    }
}

/// One card per subagent name ever seen, sorted by name.
///
/// A card is backed by the active request's instance when it has one, else by
/// the most recently touched request that ran that name. Only cards backed by
/// the active request show live status; all others are `idle`.
fn subagent_cards(ordered: &[&Request], active: Option<&Request>) -> Vec<SubagentCard> {
    let names: BTreeSet<&str> = ordered
        .iter()
        .flat_map(|r| r.subagent_order.iter().map(String::as_str))
        .collect();

    names
        .into_iter()
        .filter_map(|name| {
            let from_active = active.filter(|r| r.subagents.contains_key(name));
            let backing = from_active.or_else(|| most_recent_with(ordered, name))?;
            let subagent = backing.subagents.get(name)?;

            let status = match from_active {
                Some(request) => match request.status {
                    RequestStatus::Running => subagent.status,
                    terminal => terminal.into(),
                },
                None => SubagentStatus::Idle,
            };

            Some(SubagentCard {
                name: name.to_string(),
                status,
                description: subagent.description.clone(),
                request_id: backing.id.clone(),
                last_updated_at: subagent.last_updated_at.as_ref().map(to_iso),
                logs: subagent.logs.last(DISPLAY_LOG_LIMIT),
            })
        })
        .collect()
}

/// Latest-touched request containing `name`; later chronological position breaks ties.
fn most_recent_with<'a>(ordered: &[&'a Request], name: &str) -> Option<&'a Request> {
    ordered
        .iter()
        .filter(|r| r.subagents.contains_key(name))
        .max_by_key(|r| r.last_updated_at)
        .copied()
}
