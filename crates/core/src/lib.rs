// crates/core/src/lib.rs
//! Reconstructs the live state of a Pokestrator orchestrator from its text log.
//!
//! raw text → logical lines ([`assembler`]) → records ([`grammar`]) →
//! events ([`classifier`]) → mutable model ([`accumulator`]) → immutable
//! [`Snapshot`]. Every step is total: arbitrary input yields a snapshot.
pub mod accumulator;
pub mod assembler;
pub mod classifier;
pub mod error;
pub mod grammar;
pub mod ring;
pub mod snapshot;
pub mod tail;
pub mod text;
pub mod types;

pub use accumulator::{reconstruct, Request, RequestAccumulator, Subagent};
pub use error::*;
pub use snapshot::*;
pub use tail::read_log_tail;
pub use text::clip_text;
pub use types::*;
