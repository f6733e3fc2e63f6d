// crates/core/src/assembler.rs
//! Folds continuation lines (tracebacks, multi-line payloads) into the record
//! header they follow.

use crate::grammar::is_record_header;

/// Only the most recent non-empty physical lines are considered.
pub const MAX_PHYSICAL_LINES: usize = 4000;

/// Split `text` into logical lines, each beginning with a record header.
///
/// Continuation lines are newline-joined onto the open logical line. Lines
/// that precede the first header in the window are dropped.
pub fn assemble_logical_lines(text: &str) -> Vec<String> {
    let physical: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect();

    let start = physical.len().saturating_sub(MAX_PHYSICAL_LINES);

    let mut logical = Vec::new();
    let mut current: Option<String> = None;

    for line in &physical[start..] {
        if is_record_header(line) {
            if let Some(done) = current.take() {
                logical.push(done);
            }
            current = Some((*line).to_string());
        } else if let Some(open) = current.as_mut() {
            open.push('\n');
            open.push_str(line);
        }
    }

    if let Some(done) = current {
        logical.push(done);
    }

    logical
}
