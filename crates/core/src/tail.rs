// crates/core/src/tail.rs
//! Bounded reverse reader for the orchestrator log.
//!
//! The log is append-only and can grow without bound, while the engine only
//! ever looks at its most recent lines. Reading backwards from EOF keeps a
//! poll's cost proportional to the window, not the file.

use std::io;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::LogReadError;

/// Backward read chunk: 8KB.
const CHUNK_SIZE: u64 = 8 * 1024;

/// Return the last `n` physical lines of the file at `path` as one string,
/// oldest first, newline-separated.
///
/// Invalid UTF-8 is replaced rather than rejected, so any byte content yields
/// text the parser can consume. A trailing newline does not count as an
/// extra empty line.
pub async fn read_log_tail(path: &Path, n: usize) -> Result<String, LogReadError> {
    tail_text(path, n)
        .await
        .map_err(|e| LogReadError::io(path, e))
}

async fn tail_text(path: &Path, n: usize) -> io::Result<String> {
    if n == 0 {
        return Ok(String::new());
    }

    let mut file = tokio::fs::File::open(path).await?;
    let file_len = file.metadata().await?.len();
    if file_len == 0 {
        return Ok(String::new());
    }

    // n + 1 newlines delimit n complete lines from EOF, the extra one being
    // the boundary before the first kept line (or a trailing newline).
    let target_newlines = n + 1;
    let mut newline_count = 0usize;
    let mut collected: Vec<u8> = Vec::new();
    let mut remaining = file_len;

    while remaining > 0 {
        let chunk_len = remaining.min(CHUNK_SIZE);
        let offset = remaining - chunk_len;

        file.seek(io::SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; chunk_len as usize];
        file.read_exact(&mut buf).await?;

        newline_count += buf.iter().filter(|&&b| b == b'\n').count();

        buf.append(&mut collected);
        collected = buf;
        remaining = offset;

        if newline_count >= target_newlines {
            break;
        }
    }

    let text = String::from_utf8_lossy(&collected);
    let text = text.as_ref();
    let text = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() {
        return Ok(String::new());
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}
