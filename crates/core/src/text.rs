// crates/core/src/text.rs
//! Whitespace normalisation and fixed-budget truncation for display strings.

/// Default display budget for messages, descriptions, and log text.
pub const DEFAULT_CLIP: usize = 220;

/// Larger budget used for task descriptions.
pub const TASK_DESCRIPTION_CLIP: usize = 260;

const ELLIPSIS: &str = "...";

/// Collapse whitespace runs to single spaces, trim, and cap at `max_len` chars.
///
/// Over-budget values keep their first `max_len - 3` chars followed by `...`,
/// so the result is never longer than `max_len` (for `max_len >= 3`).
pub fn clip_text(value: &str, max_len: usize) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return String::new();
    }

    if collapsed.chars().count() <= max_len {
        return collapsed;
    }

    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut clipped: String = collapsed.chars().take(keep).collect();
    clipped.push_str(ELLIPSIS);
    clipped
}

/// [`clip_text`] with the default budget.
pub fn clip(value: &str) -> String {
    clip_text(value, DEFAULT_CLIP)
}
