// crates/core/src/grammar.rs
//! Record-header grammar for the orchestrator's text log.
//!
//! A record header looks like
//! `2024-01-01 10:00:00,123 INFO pokestrator.agent accepted orchestrate ...`:
//! date, time with comma-separated millis, an uppercase level, one
//! whitespace-free logger token, then the message.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex_lite::Regex;

/// `(?s)` so that a logical line (header plus folded continuations) keeps its
/// continuation text inside the message capture.
const HEADER_PATTERN: &str =
    r"(?s)^(\d{4}-\d{2}-\d{2}) (\d{2}:\d{2}:\d{2}),(\d{3}) ([A-Z]+) (\S+)(?:\s+(.*))?$";

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| Regex::new(HEADER_PATTERN).expect("header pattern compiles"))
}

/// One structured record recovered from a logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord<'a> {
    /// `None` when the header matched but the date/time is not a real instant.
    pub timestamp: Option<DateTime<Utc>>,
    pub level: &'a str,
    pub logger: &'a str,
    pub message: &'a str,
}

/// Whether a physical line starts a new record.
pub fn is_record_header(line: &str) -> bool {
    header_regex().is_match(line)
}

/// Parse a logical line into its structured fields, or `None` if it has no header.
pub fn parse_record(line: &str) -> Option<LogRecord<'_>> {
    let caps = header_regex().captures(line)?;
    let date = caps.get(1)?.as_str();
    let time = caps.get(2)?.as_str();
    let millis = caps.get(3)?.as_str();

    Some(LogRecord {
        timestamp: parse_timestamp(date, time, millis),
        level: caps.get(4)?.as_str(),
        logger: caps.get(5)?.as_str(),
        message: caps.get(6).map(|m| m.as_str()).unwrap_or(""),
    })
}

/// Combine the header's date, time, and millis into a UTC instant.
///
/// Log times carry no offset; they are read as UTC.
pub fn parse_timestamp(date: &str, time: &str, millis: &str) -> Option<DateTime<Utc>> {
    let joined = format!("{date} {time}.{millis}");
    NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S%.3f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::to_iso;

    #[test]
    fn test_header_detection() {
        assert!(is_record_header(
            "2024-01-01 10:00:00,000 INFO orch accepted orchestrate"
        ));
        assert!(is_record_header("2024-01-01 10:00:00,000 WARNING pokestrator.agent x"));
        assert!(!is_record_header("Traceback (most recent call last):"));
        assert!(!is_record_header("  File \"agent.py\", line 3"));
        assert!(!is_record_header("2024-01-01 10:00:00 INFO orch missing millis"));
        assert!(!is_record_header("2024-01-01 10:00:00,000 info orch lowercase level"));
        assert!(!is_record_header(""));
    }

    #[test]
    fn test_parse_record_fields() {
        let record =
            parse_record("2024-03-05 07:08:09,123 INFO pokestrator.agent running subagent x=1")
                .unwrap();
        assert_eq!(record.level, "INFO");
        assert_eq!(record.logger, "pokestrator.agent");
        assert_eq!(record.message, "running subagent x=1");
        assert_eq!(to_iso(&record.timestamp.unwrap()), "2024-03-05T07:08:09.123Z");
    }

    #[test]
    fn test_header_without_message() {
        let record = parse_record("2024-03-05 07:08:09,123 INFO pokestrator").unwrap();
        assert_eq!(record.logger, "pokestrator");
        assert_eq!(record.message, "");
    }

    #[test]
    fn test_invalid_calendar_time_yields_no_timestamp() {
        let record = parse_record("2024-13-45 25:61:00,000 INFO orch hello").unwrap();
        assert!(record.timestamp.is_none());
        assert_eq!(record.message, "hello");
    }

    #[test]
    fn test_logical_line_keeps_continuation_in_message() {
        let record = parse_record(
            "2024-01-01 10:00:00,000 ERROR orch Error while processing request x: boom\nTraceback\n  line",
        )
        .unwrap();
        assert!(record.message.starts_with("Error while processing request x: boom\n"));
        assert!(record.message.ends_with("  line"));
    }
}
