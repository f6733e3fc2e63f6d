// crates/core/src/classifier.rs
//! Message classification for orchestrator log records.
//!
//! Each record message is tested against an ordered list of matchers. The
//! first matcher whose pattern matches and whose fields extract cleanly wins;
//! no message is classified twice. Messages matching nothing are ignored by
//! the accumulator, but any `request_id=` they carry still feeds the
//! latest-request hint (see [`find_request_id`]).

use std::sync::OnceLock;

use regex_lite::{Captures, Regex};

use crate::types::Branch;

/// Request ids are UUID-shaped: 36 hex digits and hyphens.
const ID: &str = r"([0-9a-fA-F-]{36})";

/// A classified record message with its typed captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent<'a> {
    Accepted {
        request_id: &'a str,
        task_description: &'a str,
    },
    BuildNewRun {
        request_id: &'a str,
        subagent: &'a str,
    },
    RouteDecision {
        branch: Branch,
        request_id: Option<&'a str>,
        subagent: Option<&'a str>,
    },
    RunningSubagent {
        request_id: &'a str,
        subagent: &'a str,
        description: &'a str,
    },
    RunStarted {
        request_id: &'a str,
        subagent: &'a str,
    },
    StreamText {
        request_id: &'a str,
        subagent: &'a str,
        idx: Option<u64>,
        text: &'a str,
    },
    StreamTools {
        request_id: &'a str,
        subagent: &'a str,
        idx: Option<u64>,
        tools: &'a str,
    },
    StreamResult {
        request_id: &'a str,
        subagent: &'a str,
        idx: Option<u64>,
        text: &'a str,
    },
    CallbackSent {
        request_id: &'a str,
        status_code: &'a str,
    },
    ProcessingError {
        request_id: &'a str,
        detail: &'a str,
    },
    ProgressCallbackSent {
        request_id: &'a str,
        status_code: &'a str,
    },
    RunTimedOut {
        request_id: &'a str,
        subagent: &'a str,
    },
    RunNoOutput {
        request_id: &'a str,
        subagent: &'a str,
    },
    FallbackExecution {
        request_id: &'a str,
    },
}

impl OrchestratorEvent<'_> {
    /// Short, stable name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::BuildNewRun { .. } => "build_new_run",
            Self::RouteDecision { .. } => "route_decision",
            Self::RunningSubagent { .. } => "running_subagent",
            Self::RunStarted { .. } => "run_started",
            Self::StreamText { .. } => "stream_text",
            Self::StreamTools { .. } => "stream_tools",
            Self::StreamResult { .. } => "stream_result",
            Self::CallbackSent { .. } => "callback_sent",
            Self::ProcessingError { .. } => "processing_error",
            Self::ProgressCallbackSent { .. } => "progress_callback_sent",
            Self::RunTimedOut { .. } => "run_timed_out",
            Self::RunNoOutput { .. } => "run_no_output",
            Self::FallbackExecution { .. } => "fallback_execution",
        }
    }
}

type Extract = for<'a> fn(&Captures<'a>) -> Option<OrchestratorEvent<'a>>;

struct Matcher {
    pattern: Regex,
    extract: Extract,
}

impl Matcher {
    fn new(pattern: &str, extract: Extract) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("event pattern compiles"),
            extract,
        }
    }
}

/// The ordered matcher list. Order is priority: earlier entries win.
///
/// The build-new run shape sits ahead of the generic route decision because
/// every build-new run message also begins with `orchestrator route=build_new`.
fn matchers() -> &'static [Matcher] {
    static MATCHERS: OnceLock<Vec<Matcher>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        vec![
            Matcher::new(
                &format!(
                    r"(?s)^accepted orchestrate request_id={ID}(?:\s+task_description=(.*?))?(?:\s+metadata=.*)?$"
                ),
                extract_accepted,
            ),
            Matcher::new(
                &format!(
                    r"^orchestrator route=build_new (?:running newly available|prepared) subagent=(\S+) request_id={ID}"
                ),
                extract_build_new_run,
            ),
            Matcher::new(
                r"(?s)^orchestrator route=(match|build_new)(.*)$",
                extract_route_decision,
            ),
            Matcher::new(
                &format!(
                    r"(?s)^running subagent request_id={ID} subagent=(\S+)(?:\s+description=(.*))?$"
                ),
                extract_running_subagent,
            ),
            Matcher::new(
                &format!(r"^starting claude run request_id={ID} subagent=(\S+)"),
                extract_run_started,
            ),
            Matcher::new(
                &format!(
                    r"(?s)^claude event text request_id={ID} subagent=(\S+) idx=(\d+) text=(.*)$"
                ),
                extract_stream_text,
            ),
            Matcher::new(
                &format!(
                    r"(?s)^claude event tools request_id={ID} subagent=(\S+) idx=(\d+) tools=(.*)$"
                ),
                extract_stream_tools,
            ),
            Matcher::new(
                &format!(
                    r"(?s)^claude event result request_id={ID} subagent=(\S+) idx=(\d+) text=(.*)$"
                ),
                extract_stream_result,
            ),
            Matcher::new(
                &format!(r"^poke callback sent request_id={ID} status=(\S+)"),
                extract_callback_sent,
            ),
            Matcher::new(
                &format!(r"^Error while processing request {ID}:[ \t]*([^\n]*)"),
                extract_processing_error,
            ),
            Matcher::new(
                &format!(r"^poke progress callback sent request_id={ID} status=(\S+)"),
                extract_progress_callback_sent,
            ),
            Matcher::new(
                &format!(r"^claude run timed out request_id={ID} subagent=(\S+)"),
                extract_run_timed_out,
            ),
            Matcher::new(
                &format!(r"^claude run produced no output request_id={ID} subagent=(\S+)"),
                extract_run_no_output,
            ),
            Matcher::new(
                &format!(r"^claude sdk import unavailable; using fallback for request_id={ID}"),
                extract_fallback_execution,
            ),
        ]
    })
}

fn request_id_regex() -> &'static Regex {
    static REQUEST_ID: OnceLock<Regex> = OnceLock::new();
    REQUEST_ID.get_or_init(|| {
        Regex::new(&format!(r"request_id={ID}")).expect("request id pattern compiles")
    })
}

/// Any subagent reference in a route line, including `top_subagent=`.
fn subagent_ref_regex() -> &'static Regex {
    static SUBAGENT_REF: OnceLock<Regex> = OnceLock::new();
    SUBAGENT_REF.get_or_init(|| {
        Regex::new(r"subagent(?:_name)?=(\S+)").expect("subagent ref pattern compiles")
    })
}

/// Classify a record message. `None` means no shape matched.
pub fn classify(message: &str) -> Option<OrchestratorEvent<'_>> {
    matchers().iter().find_map(|matcher| {
        let caps = matcher.pattern.captures(message)?;
        (matcher.extract)(&caps)
    })
}

/// The first `request_id=<id>` anywhere in a message.
pub fn find_request_id(message: &str) -> Option<&str> {
    request_id_regex()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn group<'a>(caps: &Captures<'a>, i: usize) -> Option<&'a str> {
    caps.get(i).map(|m| m.as_str())
}

fn group_or_empty<'a>(caps: &Captures<'a>, i: usize) -> &'a str {
    group(caps, i).unwrap_or("")
}

fn extract_accepted<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::Accepted {
        request_id: group(caps, 1)?,
        task_description: group_or_empty(caps, 2),
    })
}

fn extract_build_new_run<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::BuildNewRun {
        subagent: group(caps, 1)?,
        request_id: group(caps, 2)?,
    })
}

fn extract_route_decision<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    let branch = group(caps, 1)?.parse::<Branch>().ok()?;
    let rest = group_or_empty(caps, 2);
    Some(OrchestratorEvent::RouteDecision {
        branch,
        request_id: find_request_id(rest),
        subagent: subagent_ref_regex()
            .captures(rest)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str()),
    })
}

fn extract_running_subagent<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::RunningSubagent {
        request_id: group(caps, 1)?,
        subagent: group(caps, 2)?,
        description: group_or_empty(caps, 3),
    })
}

fn extract_run_started<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::RunStarted {
        request_id: group(caps, 1)?,
        subagent: group(caps, 2)?,
    })
}

fn extract_stream_text<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::StreamText {
        request_id: group(caps, 1)?,
        subagent: group(caps, 2)?,
        idx: group(caps, 3).and_then(|n| n.parse().ok()),
        text: group_or_empty(caps, 4),
    })
}

fn extract_stream_tools<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::StreamTools {
        request_id: group(caps, 1)?,
        subagent: group(caps, 2)?,
        idx: group(caps, 3).and_then(|n| n.parse().ok()),
        tools: group_or_empty(caps, 4),
    })
}

fn extract_stream_result<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::StreamResult {
        request_id: group(caps, 1)?,
        subagent: group(caps, 2)?,
        idx: group(caps, 3).and_then(|n| n.parse().ok()),
        text: group_or_empty(caps, 4),
    })
}

fn extract_callback_sent<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::CallbackSent {
        request_id: group(caps, 1)?,
        status_code: group(caps, 2)?,
    })
}

fn extract_processing_error<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::ProcessingError {
        request_id: group(caps, 1)?,
        detail: group_or_empty(caps, 2),
    })
}

fn extract_progress_callback_sent<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::ProgressCallbackSent {
        request_id: group(caps, 1)?,
        status_code: group(caps, 2)?,
    })
}

fn extract_run_timed_out<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::RunTimedOut {
        request_id: group(caps, 1)?,
        subagent: group(caps, 2)?,
    })
}

fn extract_run_no_output<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::RunNoOutput {
        request_id: group(caps, 1)?,
        subagent: group(caps, 2)?,
    })
}

fn extract_fallback_execution<'a>(caps: &Captures<'a>) -> Option<OrchestratorEvent<'a>> {
    Some(OrchestratorEvent::FallbackExecution {
        request_id: group(caps, 1)?,
    })
}
