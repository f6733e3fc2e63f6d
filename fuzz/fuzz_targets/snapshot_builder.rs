#![no_main]

use libfuzzer_sys::fuzz_target;
use pokestrator_monitor_core::{build_snapshot, DISPLAY_LOG_LIMIT, RECENT_REQUEST_LIMIT};

// Any byte sequence, decoded the way the tail reader decodes it, must yield
// a snapshot whose lists stay within their display limits.
fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let snapshot = build_snapshot(&text, "fuzz.log");

    assert!(snapshot.recent_requests.len() <= RECENT_REQUEST_LIMIT);
    assert!(snapshot.orchestrator.logs.len() <= DISPLAY_LOG_LIMIT);
    for card in &snapshot.subagents {
        assert!(card.logs.len() <= DISPLAY_LOG_LIMIT);
    }
});
