//! Haptic event extraction from decoded MIDI
//!
//! This crate turns a decoded MIDI sequence into a sparse timeline of
//! low-register pulses that a phone can play back in sync with the audio
//! rendering of the same piece.
//!
//! # Examples
//!
//! ```
//! use haptic_core::{DecodedSequence, HapticExtractor, TrackMessage};
//!
//! let sequence = DecodedSequence::new(
//!     480,
//!     vec![vec![
//!         TrackMessage::note_on(0, 0, 40, 90),
//!         TrackMessage::note_on(480, 0, 43, 70),
//!     ]],
//! );
//!
//! let pattern = HapticExtractor::default()
//!     .pattern("sleep_01", &sequence)
//!     .unwrap()
//!     .expect("two bass notes");
//! assert_eq!(pattern.events().len(), 2);
//! assert_eq!(pattern.events()[1].time_ms, 500);
//! ```
//!
//! # Main Components
//!
//! - **TempoMap**: tick to millisecond conversion across tempo changes
//! - **ProgramResolver**: current instrument per track and channel
//! - **RegisterFilter**: pitch interval and instrument allow-list
//! - **merge**: cross-track ordering and minimum-gap deduplication
//! - **HapticPattern**: the finished artifact with its statistics

pub mod error;
pub mod extract;
pub mod filter;
pub mod instruments;
pub mod merge;
pub mod message;
pub mod pattern;
pub mod program;
pub mod rounding;
pub mod tempo;

#[cfg(test)]
mod pipeline_tests;

pub use error::{HapticError, Result};
pub use extract::{ExtractOptions, Extraction, HapticExtractor};
pub use filter::{RegisterFilter, DEFAULT_HIGH_NOTE, DEFAULT_LOW_NOTE};
pub use instruments::{gm_program_from_name, gm_program_name, LOW_STRINGS};
pub use merge::{merge_and_dedup, CandidateEvent, DEFAULT_MIN_GAP_MS};
pub use message::{DecodedSequence, MessageKind, RawNoteEvent, TimedMessage, TrackMessage};
pub use pattern::{HapticEvent, HapticPattern, PatternStats, EMPTY_NOTE_RANGE};
pub use program::ProgramResolver;
pub use tempo::{TempoChange, TempoMap, TempoMode, TempoSegment, DEFAULT_MICROS_PER_BEAT};
