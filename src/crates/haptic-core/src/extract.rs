use std::num::NonZeroU32;

use crate::error::{HapticError, Result};
use crate::filter::RegisterFilter;
use crate::merge::{merge_and_dedup, CandidateEvent, DEFAULT_MIN_GAP_MS};
use crate::message::{DecodedSequence, MessageKind};
use crate::pattern::{HapticEvent, HapticPattern};
use crate::program::ProgramResolver;
use crate::tempo::{TempoMap, TempoMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub filter: RegisterFilter,
    pub min_gap_ms: u64,
    pub tempo_mode: TempoMode,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            filter: RegisterFilter::default(),
            min_gap_ms: DEFAULT_MIN_GAP_MS,
            tempo_mode: TempoMode::Segmented,
        }
    }
}

/// Everything one extraction run produced.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub tempo_map: TempoMap,
    /// Note-ons that passed the register filter, before deduplication.
    pub candidates: usize,
    pub events: Vec<HapticEvent>,
}

impl Extraction {
    pub fn into_pattern(self, track_id: impl Into<String>) -> Option<HapticPattern> {
        HapticPattern::assemble(track_id, &self.tempo_map, self.events)
    }
}

pub struct HapticExtractor {
    options: ExtractOptions,
}

impl HapticExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    pub fn extract(&self, sequence: &DecodedSequence) -> Result<Extraction> {
        let ticks_per_beat = NonZeroU32::new(sequence.ticks_per_beat)
            .ok_or(HapticError::InvalidTicksPerBeat(sequence.ticks_per_beat))?;

        // Complete before any tick is converted, read-only afterwards
        let tempo_map = TempoMap::from_sequence(sequence, self.options.tempo_mode)?;

        let mut resolver = ProgramResolver::new();
        let mut candidates = Vec::new();

        for msg in sequence.timed_messages() {
            if let MessageKind::ProgramChange { channel, program } = msg.kind {
                resolver.observe(msg.track_index, channel, program);
                continue;
            }

            let Some(note_on) = msg.as_note_on() else {
                continue;
            };
            let program = resolver.resolve(note_on.track_index, note_on.channel);
            if !self.options.filter.accepts(note_on.note, program) {
                continue;
            }

            candidates.push(CandidateEvent {
                time_ms: tempo_map.ticks_to_ms(ticks_per_beat, note_on.absolute_tick),
                track_index: note_on.track_index,
                channel: note_on.channel,
                note: note_on.note,
                velocity: note_on.velocity,
            });
        }

        let candidate_count = candidates.len();
        let events = merge_and_dedup(candidates, self.options.min_gap_ms);

        Ok(Extraction {
            tempo_map,
            candidates: candidate_count,
            events,
        })
    }

    /// Run the whole pipeline; `Ok(None)` means no event survived.
    pub fn pattern(
        &self,
        track_id: impl Into<String>,
        sequence: &DecodedSequence,
    ) -> Result<Option<HapticPattern>> {
        Ok(self.extract(sequence)?.into_pattern(track_id))
    }
}

impl Default for HapticExtractor {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}
