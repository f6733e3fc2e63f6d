// crates/core/src/accumulator.rs
//! Single-pass request/subagent accumulator.
//!
//! [`RequestAccumulator`] is the mutable half of the pipeline: feed it logical
//! lines in file order via [`process_line`](RequestAccumulator::process_line),
//! then call [`finish`](RequestAccumulator::finish) to hand the reconstructed
//! requests to snapshot derivation. Nothing is mutated after `finish`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::assembler::assemble_logical_lines;
use crate::classifier::{classify, find_request_id, OrchestratorEvent};
use crate::grammar::{parse_record, LogRecord};
use crate::ring::BoundedLog;
use crate::text::{clip, clip_text, TASK_DESCRIPTION_CLIP};
use crate::types::{Branch, LogEntry, RequestStatus, SubagentStatus};

/// Log entries retained per request.
pub const REQUEST_LOG_CAPACITY: usize = 16;

/// Log entries retained per subagent.
pub const SUBAGENT_LOG_CAPACITY: usize = 16;

/// A named worker scoped to exactly one request.
#[derive(Debug, Clone)]
pub struct Subagent {
    pub name: String,
    pub status: SubagentStatus,
    pub description: String,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub logs: BoundedLog,
}

impl Subagent {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: SubagentStatus::Idle,
            description: String::new(),
            last_updated_at: None,
            logs: BoundedLog::new(SUBAGENT_LOG_CAPACITY),
        }
    }

    fn touch(&mut self, ts: DateTime<Utc>) {
        self.last_updated_at = Some(self.last_updated_at.map_or(ts, |prev| prev.max(ts)));
    }

    fn log(&mut self, ts: DateTime<Utc>, text: &str) {
        let text = clip(text);
        if !text.is_empty() {
            self.logs.push(LogEntry::new(Some(&ts), text));
        }
    }
}

/// One orchestration request, from acceptance to terminal status.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: String,
    pub task_description: String,
    pub status: RequestStatus,
    pub branch: Branch,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub logs: BoundedLog,
    /// Subagent names in first-seen order; always the key set of `subagents`.
    pub subagent_order: Vec<String>,
    pub subagents: HashMap<String, Subagent>,
}

impl Request {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            task_description: String::new(),
            status: RequestStatus::Running,
            branch: Branch::Unknown,
            accepted_at: None,
            completed_at: None,
            last_updated_at: None,
            logs: BoundedLog::new(REQUEST_LOG_CAPACITY),
            subagent_order: Vec::new(),
            subagents: HashMap::new(),
        }
    }

    /// Subagents in first-seen order.
    pub fn subagents_in_order(&self) -> impl Iterator<Item = &Subagent> {
        self.subagent_order
            .iter()
            .filter_map(|name| self.subagents.get(name))
    }

    /// `acceptedAt`, falling back to `lastUpdatedAt`; the chronological sort key.
    pub fn sort_key(&self) -> Option<DateTime<Utc>> {
        self.accepted_at.or(self.last_updated_at)
    }

    fn touch(&mut self, ts: DateTime<Utc>) {
        self.last_updated_at = Some(self.last_updated_at.map_or(ts, |prev| prev.max(ts)));
    }

    fn log(&mut self, ts: DateTime<Utc>, text: &str) {
        let text = clip(text);
        if !text.is_empty() {
            self.logs.push(LogEntry::new(Some(&ts), text));
        }
    }

    fn subagent_mut(&mut self, name: &str, ts: DateTime<Utc>) -> &mut Subagent {
        self.touch(ts);
        if !self.subagents.contains_key(name) {
            self.subagent_order.push(name.to_string());
        }
        let subagent = self
            .subagents
            .entry(name.to_string())
            .or_insert_with(|| Subagent::new(name));
        subagent.touch(ts);
        subagent
    }

    /// Mark a subagent as working. Under an already-finished request it takes
    /// the request's terminal status instead.
    fn start_subagent(&mut self, name: &str, ts: DateTime<Utc>) -> &mut Subagent {
        let status = match self.status {
            RequestStatus::Running => SubagentStatus::Running,
            terminal => terminal.into(),
        };
        let subagent = self.subagent_mut(name, ts);
        subagent.status = status;
        subagent
    }

    /// Move to a terminal status and cascade it to every still-active subagent.
    ///
    /// The first terminal status sticks; later completion events only log.
    fn finish(&mut self, status: RequestStatus, ts: DateTime<Utc>) {
        self.touch(ts);
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.completed_at = Some(ts);
        for subagent in self.subagents.values_mut() {
            if subagent.status.is_active() {
                subagent.status = status.into();
                subagent.touch(ts);
            }
        }
    }
}

/// Completion status implied by a callback delivery code: any `2xx`-looking
/// code is success, everything else (4xx, 5xx, `dry_run`) is failure.
pub fn callback_status(code: &str) -> RequestStatus {
    if code.starts_with('2') {
        RequestStatus::Completed
    } else {
        RequestStatus::Failed
    }
}

/// Mutable model built during one left-to-right pass over the log.
#[derive(Debug, Default)]
pub struct RequestAccumulator {
    requests: Vec<Request>,
    index: HashMap<String, usize>,
    /// Most recently seen request id; correlates events that carry none.
    latest_hint: Option<String>,
    skipped_records: usize,
}

impl RequestAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one logical line (header plus folded continuations).
    pub fn process_line(&mut self, line: &str) {
        if let Some(record) = parse_record(line) {
            self.process_record(&record);
        }
    }

    /// Apply one structured record. Records without a valid timestamp are skipped.
    pub fn process_record(&mut self, record: &LogRecord<'_>) {
        let Some(ts) = record.timestamp else {
            self.skipped_records += 1;
            tracing::debug!(logger = record.logger, "skipping record with invalid timestamp");
            return;
        };

        if let Some(id) = find_request_id(record.message) {
            self.latest_hint = Some(id.to_string());
        }

        if let Some(event) = classify(record.message) {
            self.apply(event, ts);
        }
    }

    pub fn latest_hint(&self) -> Option<&str> {
        self.latest_hint.as_deref()
    }

    /// Number of records dropped for an unparseable timestamp.
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    /// Hand over the reconstructed requests in first-seen order.
    pub fn finish(self) -> Vec<Request> {
        self.requests
    }

    fn request_mut(&mut self, id: &str) -> &mut Request {
        let idx = match self.index.get(id) {
            Some(&idx) => idx,
            None => {
                self.requests.push(Request::new(id));
                let idx = self.requests.len() - 1;
                self.index.insert(id.to_string(), idx);
                idx
            }
        };
        &mut self.requests[idx]
    }

    fn apply(&mut self, event: OrchestratorEvent<'_>, ts: DateTime<Utc>) {
        tracing::trace!(kind = event.kind(), "applying event");
        match event {
            OrchestratorEvent::Accepted {
                request_id,
                task_description,
            } => {
                self.latest_hint = Some(request_id.to_string());
                let request = self.request_mut(request_id);
                request.task_description = clip_text(task_description, TASK_DESCRIPTION_CLIP);
                request.accepted_at = Some(ts);
                request.touch(ts);
                let text = if request.task_description.is_empty() {
                    "Accepted task".to_string()
                } else {
                    format!("Accepted task: {}", request.task_description)
                };
                request.log(ts, &text);
            }
            OrchestratorEvent::RouteDecision {
                branch,
                request_id,
                subagent,
            } => {
                let Some(id) = request_id
                    .map(str::to_string)
                    .or_else(|| self.latest_hint.clone())
                else {
                    return;
                };
                let request = self.request_mut(&id);
                request.branch = branch;
                request.touch(ts);
                let text = match subagent {
                    Some(name) => format!("Route decided: {branch} ({name})"),
                    None => format!("Route decided: {branch}"),
                };
                request.log(ts, &text);
            }
            OrchestratorEvent::BuildNewRun {
                request_id,
                subagent,
            } => {
                let request = self.request_mut(request_id);
                request.branch = Branch::BuildNew;
                let text = format!("Running subagent: {subagent}");
                request.start_subagent(subagent, ts).log(ts, &text);
                request.log(ts, &text);
            }
            OrchestratorEvent::RunningSubagent {
                request_id,
                subagent,
                description,
            } => {
                let request = self.request_mut(request_id);
                let text = format!("Running subagent: {subagent}");
                let worker = request.start_subagent(subagent, ts);
                let description = clip(description);
                if !description.is_empty() {
                    worker.description = description;
                }
                worker.log(ts, &text);
                request.log(ts, &text);
            }
            OrchestratorEvent::RunStarted {
                request_id,
                subagent,
            } => {
                self.request_mut(request_id)
                    .start_subagent(subagent, ts)
                    .log(ts, "Claude run started");
            }
            OrchestratorEvent::StreamText {
                request_id,
                subagent,
                text,
                ..
            } => {
                self.request_mut(request_id)
                    .subagent_mut(subagent, ts)
                    .log(ts, text);
            }
            OrchestratorEvent::StreamTools {
                request_id,
                subagent,
                tools,
                ..
            } => {
                self.request_mut(request_id)
                    .subagent_mut(subagent, ts)
                    .log(ts, &format!("Using tools: {tools}"));
            }
            OrchestratorEvent::StreamResult {
                request_id,
                subagent,
                text,
                ..
            } => {
                self.request_mut(request_id)
                    .subagent_mut(subagent, ts)
                    .log(ts, &format!("Result ready: {text}"));
            }
            OrchestratorEvent::CallbackSent {
                request_id,
                status_code,
            } => {
                let request = self.request_mut(request_id);
                request.log(ts, &format!("Callback sent (status {status_code})"));
                request.finish(callback_status(status_code), ts);
            }
            OrchestratorEvent::ProcessingError { request_id, detail } => {
                let request = self.request_mut(request_id);
                let detail = if detail.trim().is_empty() {
                    "Request failed"
                } else {
                    detail
                };
                request.log(ts, detail);
                request.finish(RequestStatus::Failed, ts);
            }
            OrchestratorEvent::ProgressCallbackSent {
                request_id,
                status_code,
            } => {
                let request = self.request_mut(request_id);
                request.touch(ts);
                request.log(ts, &format!("Progress update sent (status {status_code})"));
            }
            OrchestratorEvent::RunTimedOut {
                request_id,
                subagent,
            } => {
                self.request_mut(request_id)
                    .subagent_mut(subagent, ts)
                    .log(ts, "Claude run timed out");
            }
            OrchestratorEvent::RunNoOutput {
                request_id,
                subagent,
            } => {
                self.request_mut(request_id)
                    .subagent_mut(subagent, ts)
                    .log(ts, "Claude run produced no output");
            }
            OrchestratorEvent::FallbackExecution { request_id } => {
                let request = self.request_mut(request_id);
                request.touch(ts);
                request.log(ts, "Claude SDK unavailable; using fallback response");
            }
        }
    }
}

/// Run the whole accumulation pass over raw log text.
pub fn reconstruct(text: &str) -> Vec<Request> {
    let lines = assemble_logical_lines(text);
    let mut acc = RequestAccumulator::new();
    for line in &lines {
        acc.process_line(line);
    }
    tracing::debug!(
        logical_lines = lines.len(),
        skipped_records = acc.skipped_records(),
        "log accumulation pass complete"
    );
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RID: &str = "11111111-1111-1111-1111-111111111111";
    const RID2: &str = "22222222-2222-2222-2222-222222222222";

    fn line(sec: u32, message: &str) -> String {
        format!("2024-01-01 10:00:{sec:02},000 INFO pokestrator.agent {message}\n")
    }

    fn texts(log: &BoundedLog) -> Vec<String> {
        log.to_vec().into_iter().map(|e| e.text).collect()
    }

    #[test]
    fn test_event_without_accept_creates_request() {
        let text = line(0, &format!("starting claude run request_id={RID} subagent=b"));
        let requests = reconstruct(&text);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, RID);
        assert!(requests[0].accepted_at.is_none());
        assert_eq!(requests[0].status, RequestStatus::Running);
        assert_eq!(requests[0].subagents["b"].status, SubagentStatus::Running);
    }

    #[test]
    fn test_hint_only_line_creates_nothing() {
        let text = line(0, &format!("claude event request_id={RID} subagent=b idx=1 type=X"));
        assert!(reconstruct(&text).is_empty());
    }

    #[test]
    fn test_route_without_any_hint_is_ignored() {
        let text = line(0, "orchestrator route=match subagent=b");
        assert!(reconstruct(&text).is_empty());
    }

    #[test]
    fn test_route_follows_latest_hint() {
        let mut text = line(0, &format!("accepted orchestrate request_id={RID} task_description=one"));
        text += &line(1, &format!("accepted orchestrate request_id={RID2} task_description=two"));
        text += &line(2, "orchestrator route=build_new subagent_name=fresh_bot");
        let requests = reconstruct(&text);
        assert_eq!(requests[0].branch, Branch::Unknown);
        assert_eq!(requests[1].branch, Branch::BuildNew);
        assert_eq!(
            texts(&requests[1].logs).last().map(String::as_str),
            Some("Route decided: build_new (fresh_bot)")
        );
    }

    #[test]
    fn test_shapeless_line_moves_hint() {
        let mut text = line(0, &format!("accepted orchestrate request_id={RID} task_description=one"));
        text += &line(1, &format!("accepted orchestrate request_id={RID2} task_description=two"));
        text += &line(2, &format!("poke callback outgoing request_id={RID} message=x"));
        text += &line(3, "orchestrator route=match subagent=b");
        let requests = reconstruct(&text);
        assert_eq!(requests[0].branch, Branch::Match);
        assert_eq!(requests[1].branch, Branch::Unknown);
    }

    #[test]
    fn test_subagent_order_is_first_seen_and_deduplicated() {
        let mut text = String::new();
        for (i, name) in ["b", "a", "b", "c", "a"].iter().enumerate() {
            text += &line(i as u32, &format!("starting claude run request_id={RID} subagent={name}"));
        }
        let requests = reconstruct(&text);
        assert_eq!(requests[0].subagent_order, vec!["b", "a", "c"]);
        assert_eq!(requests[0].subagents.len(), 3);
    }

    #[test]
    fn test_failed_callback_cascades_failure() {
        let mut text = line(0, &format!("running subagent request_id={RID} subagent=b description=x"));
        text += &line(1, &format!("poke callback sent request_id={RID} status=500 response=err"));
        let requests = reconstruct(&text);
        assert_eq!(requests[0].status, RequestStatus::Failed);
        assert_eq!(requests[0].subagents["b"].status, SubagentStatus::Failed);
    }

    #[test]
    fn test_dry_run_callback_counts_as_failed() {
        assert_eq!(callback_status("dry_run"), RequestStatus::Failed);
        assert_eq!(callback_status("204"), RequestStatus::Completed);
        assert_eq!(callback_status("404"), RequestStatus::Failed);
    }

    #[test]
    fn test_terminal_status_never_reverts() {
        let mut text = line(0, &format!("Error while processing request {RID}: boom"));
        text += &line(1, &format!("poke callback sent request_id={RID} status=200"));
        text += &line(2, &format!("accepted orchestrate request_id={RID} task_description=again"));
        text += &line(3, &format!("starting claude run request_id={RID} subagent=late"));
        let requests = reconstruct(&text);
        assert_eq!(requests[0].status, RequestStatus::Failed);
        assert_eq!(requests[0].subagents["late"].status, SubagentStatus::Failed);
        assert_eq!(
            requests[0].completed_at.map(|t| crate::types::to_iso(&t)).as_deref(),
            Some("2024-01-01T10:00:00.000Z")
        );
    }

    #[test]
    fn test_invalid_timestamp_record_changes_nothing() {
        let text = format!(
            "2024-02-30 10:00:00,000 INFO orch accepted orchestrate request_id={RID} task_description=x\n"
        );
        let mut acc = RequestAccumulator::new();
        for l in assemble_logical_lines(&text) {
            acc.process_line(&l);
        }
        assert_eq!(acc.skipped_records(), 1);
        assert!(acc.latest_hint().is_none());
        assert!(acc.finish().is_empty());
    }

    #[test]
    fn test_request_log_is_bounded() {
        let mut text = String::new();
        for i in 0..40 {
            text += &line(
                i % 60,
                &format!("poke progress callback sent request_id={RID} status={i}"),
            );
        }
        let requests = reconstruct(&text);
        assert_eq!(requests[0].logs.len(), REQUEST_LOG_CAPACITY);
        assert_eq!(
            texts(&requests[0].logs).last().map(String::as_str),
            Some("Progress update sent (status 39)")
        );
    }

    #[test]
    fn test_stream_events_log_on_subagent_only() {
        let mut text = line(0, &format!("claude event tools request_id={RID} subagent=b idx=1 tools=Read,Grep"));
        text += &line(1, &format!("claude event text request_id={RID} subagent=b idx=2 text=Looking   at it"));
        text += &line(2, &format!("claude event result request_id={RID} subagent=b idx=3 text=All done"));
        let requests = reconstruct(&text);
        assert!(requests[0].logs.is_empty());
        assert_eq!(
            texts(&requests[0].subagents["b"].logs),
            vec!["Using tools: Read,Grep", "Looking at it", "Result ready: All done"]
        );
        assert_eq!(requests[0].subagents["b"].status, SubagentStatus::Idle);
    }

    #[test]
    fn test_last_updated_is_monotonic() {
        let mut text = line(5, &format!("starting claude run request_id={RID} subagent=b"));
        text += &line(3, &format!("claude run timed out request_id={RID} subagent=b timeout_seconds=1"));
        let requests = reconstruct(&text);
        assert_eq!(
            requests[0].last_updated_at.map(|t| crate::types::to_iso(&t)).as_deref(),
            Some("2024-01-01T10:00:05.000Z")
        );
    }

    #[test]
    fn test_build_new_run_alone_starts_subagent() {
        let mut text = line(0, &format!("accepted orchestrate request_id={RID} task_description=x"));
        text += &line(
            1,
            &format!("orchestrator route=build_new running newly available subagent=table_booker request_id={RID}"),
        );
        let requests = reconstruct(&text);
        let request = &requests[0];

        assert_eq!(request.branch, Branch::BuildNew);
        assert_eq!(request.subagent_order, vec!["table_booker"]);
        let worker = &request.subagents["table_booker"];
        assert_eq!(worker.status, SubagentStatus::Running);
        assert_eq!(texts(&worker.logs), vec!["Running subagent: table_booker"]);
        assert_eq!(
            texts(&request.logs),
            vec!["Accepted task: x", "Running subagent: table_booker"]
        );
    }

    #[test]
    fn test_run_without_output_logs_on_subagent() {
        let mut text = line(0, &format!("starting claude run request_id={RID} subagent=b"));
        text += &line(4, &format!("claude run produced no output request_id={RID} subagent=b"));
        let requests = reconstruct(&text);

        assert!(requests[0].logs.is_empty());
        assert_eq!(
            texts(&requests[0].subagents["b"].logs),
            vec!["Claude run started", "Claude run produced no output"]
        );
        assert_eq!(requests[0].subagents["b"].status, SubagentStatus::Running);
    }

    #[test]
    fn test_fallback_execution_logs_on_request_only() {
        let mut text = line(0, &format!("accepted orchestrate request_id={RID} task_description=x"));
        text += &line(2, &format!("claude sdk import unavailable; using fallback for request_id={RID}"));
        let requests = reconstruct(&text);
        let request = &requests[0];

        assert_eq!(
            texts(&request.logs),
            vec!["Accepted task: x", "Claude SDK unavailable; using fallback response"]
        );
        assert!(request.subagents.is_empty());
        assert_eq!(request.status, RequestStatus::Running);
        assert_eq!(
            request.last_updated_at.map(|t| crate::types::to_iso(&t)).as_deref(),
            Some("2024-01-01T10:00:02.000Z")
        );
    }
}
