// crates/core/src/ring.rs
//! Fixed-capacity, oldest-first-evicting log buffer.

use std::collections::VecDeque;

use crate::types::LogEntry;

/// Bounded ordered history. Only `push` and read access are exposed, so the
/// capacity bound holds for every instance.
#[derive(Debug, Clone)]
pub struct BoundedLog {
    capacity: usize,
    entries: VecDeque<LogEntry>,
}

impl BoundedLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an entry, evicting the oldest when full. Zero capacity retains nothing.
    pub fn push(&mut self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All retained entries in arrival order.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// The most recent `n` entries in arrival order.
    pub fn last(&self, n: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> LogEntry {
        LogEntry {
            timestamp: None,
            text: text.to_string(),
        }
    }

    fn texts(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_push_under_capacity_keeps_order() {
        let mut log = BoundedLog::new(3);
        log.push(entry("a"));
        log.push(entry("b"));
        assert_eq!(log.len(), 2);
        assert_eq!(texts(&log.to_vec()), vec!["a", "b"]);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut log = BoundedLog::new(3);
        for t in ["a", "b", "c", "d", "e"] {
            log.push(entry(t));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(texts(&log.to_vec()), vec!["c", "d", "e"]);
    }

    #[test]
    fn test_last_n_is_tail_in_arrival_order() {
        let mut log = BoundedLog::new(16);
        for i in 0..10 {
            log.push(entry(&i.to_string()));
        }
        assert_eq!(texts(&log.last(3)), vec!["7", "8", "9"]);
        assert_eq!(log.last(50).len(), 10);
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let mut log = BoundedLog::new(0);
        log.push(entry("a"));
        assert!(log.is_empty());
    }
}
