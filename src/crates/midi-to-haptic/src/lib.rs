//! MIDI to haptic pattern converter library
//!
//! Decodes Standard MIDI Files, runs them through `haptic_core` and writes
//! the resulting JSON artifacts, one per track, in batch.

pub mod analysis;
pub mod batch;
pub mod catalog;
pub mod error;
pub mod midi;
pub mod output;

// Re-export main types for convenience
pub use batch::{BatchReport, BatchRunner, JobOutcome, SkipReason};
pub use catalog::{BatchJob, JobSource, Manifest};
pub use error::{ProcessError, Result};
pub use midi::MidiData;
pub use output::PatternWriter;
