//! Tempo map construction and tick to millisecond conversion.
//!
//! A MIDI file stores positions in ticks. Turning a tick into wall-clock
//! time needs every tempo change that happened before it, because each
//! segment of the piece may run at a different speed.

use std::num::NonZeroU32;

use crate::error::{HapticError, Result};
use crate::message::{DecodedSequence, MessageKind};
use crate::rounding::ratio_to_decimals;

/// 120 BPM, the MIDI default when a file carries no tempo event.
pub const DEFAULT_MICROS_PER_BEAT: u32 = 500_000;

/// A tempo meta-event located on the absolute tick axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    pub absolute_tick: u64,
    pub micros_per_beat: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoSegment {
    pub start_tick: u64,
    pub micros_per_beat: u32,
    /// Σ(span × micros_per_beat) over all earlier segments.
    elapsed_tick_micros: u128,
}

impl TempoSegment {
    /// Beats per minute rounded to `decimals` places.
    pub fn bpm(&self, decimals: u32) -> f64 {
        ratio_to_decimals(60_000_000, u64::from(self.micros_per_beat), decimals)
    }
}

/// How tempo events are turned into a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempoMode {
    /// Every tempo change becomes a segment.
    #[default]
    Segmented,
    /// Only the first tempo event in scan order is used for the whole file.
    /// Correct only for tempo-constant material.
    FirstTempo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempoMap {
    segments: Vec<TempoSegment>,
}

impl TempoMap {
    /// A single-segment map covering the whole file.
    pub fn constant(micros_per_beat: u32) -> Result<Self> {
        Self::from_changes(vec![TempoChange {
            absolute_tick: 0,
            micros_per_beat,
        }])
    }

    /// Build a map from tempo changes listed in scan order.
    ///
    /// Changes sharing a tick resolve to the one scanned last.
    pub fn from_changes(mut changes: Vec<TempoChange>) -> Result<Self> {
        if let Some(bad) = changes.iter().find(|c| c.micros_per_beat == 0) {
            return Err(HapticError::InvalidTempo {
                tick: bad.absolute_tick,
                micros_per_beat: bad.micros_per_beat,
            });
        }

        // Stable: scan order survives among equal ticks
        changes.sort_by_key(|c| c.absolute_tick);

        let mut points: Vec<(u64, u32)> = vec![(0, DEFAULT_MICROS_PER_BEAT)];
        for change in changes {
            match points.last_mut() {
                Some(last) if last.0 == change.absolute_tick => last.1 = change.micros_per_beat,
                _ => points.push((change.absolute_tick, change.micros_per_beat)),
            }
        }
        points.dedup_by_key(|point| point.1);

        let mut segments: Vec<TempoSegment> = Vec::with_capacity(points.len());
        for (start_tick, micros_per_beat) in points {
            let elapsed_tick_micros = match segments.last() {
                Some(prev) => {
                    let span = u128::from(start_tick - prev.start_tick);
                    prev.elapsed_tick_micros + span * u128::from(prev.micros_per_beat)
                }
                None => 0,
            };
            segments.push(TempoSegment {
                start_tick,
                micros_per_beat,
                elapsed_tick_micros,
            });
        }

        Ok(Self { segments })
    }

    /// Scan every track of a decoded file for tempo events.
    pub fn from_sequence(sequence: &DecodedSequence, mode: TempoMode) -> Result<Self> {
        let changes: Vec<TempoChange> = sequence
            .timed_messages()
            .filter_map(|msg| match msg.kind {
                MessageKind::SetTempo { micros_per_beat } => Some(TempoChange {
                    absolute_tick: msg.absolute_tick,
                    micros_per_beat,
                }),
                _ => None,
            })
            .collect();

        if let Some(bad) = changes.iter().find(|c| c.micros_per_beat == 0) {
            return Err(HapticError::InvalidTempo {
                tick: bad.absolute_tick,
                micros_per_beat: bad.micros_per_beat,
            });
        }
        let event_count = changes.len();

        let map = match mode {
            TempoMode::Segmented => Self::from_changes(changes)?,
            TempoMode::FirstTempo => match changes.first() {
                Some(first) => Self::constant(first.micros_per_beat)?,
                None => Self::default(),
            },
        };

        log::debug!(
            "tempo map: {} segment(s) from {} tempo event(s), mode {:?}",
            map.segments.len(),
            event_count,
            mode
        );
        Ok(map)
    }

    pub fn segments(&self) -> &[TempoSegment] {
        &self.segments
    }

    /// The segment starting at tick 0.
    pub fn initial(&self) -> &TempoSegment {
        &self.segments[0]
    }

    pub fn is_constant(&self) -> bool {
        self.segments.len() == 1
    }

    /// The segment with the greatest `start_tick <= tick`.
    pub fn segment_at(&self, tick: u64) -> &TempoSegment {
        let idx = self.segments.partition_point(|s| s.start_tick <= tick);
        // The first segment always starts at 0, so idx >= 1
        &self.segments[idx.saturating_sub(1)]
    }

    /// Milliseconds elapsed from the start of the file to `tick`, truncated.
    pub fn ticks_to_ms(&self, ticks_per_beat: NonZeroU32, tick: u64) -> u64 {
        let segment = self.segment_at(tick);
        let partial = u128::from(tick - segment.start_tick) * u128::from(segment.micros_per_beat);
        let tick_micros = segment.elapsed_tick_micros + partial;
        let ms = tick_micros / (u128::from(ticks_per_beat.get()) * 1000);
        u64::try_from(ms).unwrap_or(u64::MAX)
    }
}

impl Default for TempoMap {
    fn default() -> Self {
        Self {
            segments: vec![TempoSegment {
                start_tick: 0,
                micros_per_beat: DEFAULT_MICROS_PER_BEAT,
                elapsed_tick_micros: 0,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TrackMessage;
    use proptest::prelude::*;

    fn tpb(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn change(absolute_tick: u64, micros_per_beat: u32) -> TempoChange {
        TempoChange {
            absolute_tick,
            micros_per_beat,
        }
    }

    #[test]
    fn test_empty_map_is_default_tempo() {
        let map = TempoMap::from_changes(vec![]).unwrap();
        assert_eq!(map.segments().len(), 1);
        assert_eq!(map.initial().micros_per_beat, DEFAULT_MICROS_PER_BEAT);
        assert_eq!(map.initial().bpm(1), 120.0);
    }

    #[test]
    fn test_change_at_zero_replaces_default() {
        let map = TempoMap::from_changes(vec![change(0, 600_000)]).unwrap();
        assert_eq!(map.segments().len(), 1);
        assert_eq!(map.initial().micros_per_beat, 600_000);
    }

    #[test]
    fn test_late_first_change_keeps_default_segment() {
        let map = TempoMap::from_changes(vec![change(960, 250_000)]).unwrap();
        assert_eq!(map.segments().len(), 2);
        assert_eq!(map.initial().micros_per_beat, DEFAULT_MICROS_PER_BEAT);
        assert_eq!(map.segment_at(959).micros_per_beat, DEFAULT_MICROS_PER_BEAT);
        assert_eq!(map.segment_at(960).micros_per_beat, 250_000);
    }

    #[test]
    fn test_same_tick_last_scanned_wins() {
        let map = TempoMap::from_changes(vec![
            change(480, 400_000),
            change(0, 500_000),
            change(480, 300_000),
        ])
        .unwrap();
        assert_eq!(map.segment_at(480).micros_per_beat, 300_000);
        assert_eq!(map.segments().len(), 2);
    }

    #[test]
    fn test_identical_consecutive_tempos_collapse() {
        let map = TempoMap::from_changes(vec![change(0, 400_000), change(480, 400_000)]).unwrap();
        assert!(map.is_constant());
    }

    #[test]
    fn test_zero_tempo_rejected() {
        let err = TempoMap::from_changes(vec![change(120, 0)]).unwrap_err();
        assert_eq!(
            err,
            HapticError::InvalidTempo {
                tick: 120,
                micros_per_beat: 0
            }
        );
    }

    #[test]
    fn test_conversion_integrates_across_segments() {
        // 2 beats at 120 BPM (1000ms), then 60 BPM
        let map = TempoMap::from_changes(vec![change(960, 1_000_000)]).unwrap();
        assert_eq!(map.ticks_to_ms(tpb(480), 480), 500);
        assert_eq!(map.ticks_to_ms(tpb(480), 960), 1000);
        assert_eq!(map.ticks_to_ms(tpb(480), 1200), 1500);
        assert_eq!(map.ticks_to_ms(tpb(480), 1440), 2000);
    }

    #[test]
    fn test_conversion_truncates() {
        let map = TempoMap::default();
        // 1 tick at 480 tpb and 120 BPM is 1.0416ms
        assert_eq!(map.ticks_to_ms(tpb(480), 1), 1);
        // 1 tick at 960 tpb is 0.52ms
        assert_eq!(map.ticks_to_ms(tpb(960), 1), 0);
    }

    #[test]
    fn test_from_sequence_scans_all_tracks() {
        let seq = DecodedSequence::new(
            480,
            vec![
                vec![TrackMessage::other(0), TrackMessage::note_on(960, 0, 40, 80)],
                vec![TrackMessage::set_tempo(480, 250_000)],
            ],
        );
        let map = TempoMap::from_sequence(&seq, TempoMode::Segmented).unwrap();
        assert_eq!(map.segments().len(), 2);
        assert_eq!(map.segment_at(480).micros_per_beat, 250_000);
        assert_eq!(map.ticks_to_ms(tpb(480), 960), 750);
    }

    #[test]
    fn test_first_tempo_mode_ignores_later_changes() {
        let seq = DecodedSequence::new(
            480,
            vec![vec![
                TrackMessage::set_tempo(0, 600_000),
                TrackMessage::set_tempo(480, 300_000),
            ]],
        );
        let map = TempoMap::from_sequence(&seq, TempoMode::FirstTempo).unwrap();
        assert!(map.is_constant());
        assert_eq!(map.initial().micros_per_beat, 600_000);
        assert_eq!(map.ticks_to_ms(tpb(480), 960), 1200);
    }

    #[test]
    fn test_first_tempo_mode_rejects_zero_tempo() {
        let seq = DecodedSequence::new(480, vec![vec![TrackMessage::set_tempo(30, 0)]]);
        let err = TempoMap::from_sequence(&seq, TempoMode::FirstTempo).unwrap_err();
        assert_eq!(
            err,
            HapticError::InvalidTempo {
                tick: 30,
                micros_per_beat: 0
            }
        );
    }

    #[test]
    fn test_first_tempo_mode_rejects_later_zero_tempo() {
        let seq = DecodedSequence::new(
            480,
            vec![vec![
                TrackMessage::set_tempo(0, 500_000),
                TrackMessage::set_tempo(1920, 0),
            ]],
        );
        for mode in [TempoMode::FirstTempo, TempoMode::Segmented] {
            let err = TempoMap::from_sequence(&seq, mode).unwrap_err();
            assert_eq!(
                err,
                HapticError::InvalidTempo {
                    tick: 1920,
                    micros_per_beat: 0
                }
            );
        }
    }

    proptest! {
        #[test]
        fn prop_conversion_is_monotonic(
            raw in prop::collection::vec((0u64..100_000, 1u32..2_000_000), 0..8),
            ticks_per_beat in 1u32..2000,
            a in 0u64..200_000,
            b in 0u64..200_000,
        ) {
            let changes = raw.into_iter().map(|(t, m)| change(t, m)).collect();
            let map = TempoMap::from_changes(changes).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(map.ticks_to_ms(tpb(ticks_per_beat), lo) <= map.ticks_to_ms(tpb(ticks_per_beat), hi));
        }

        #[test]
        fn prop_constant_tempo_is_exact(k in 0u64..1_000_000) {
            let map = TempoMap::default();
            prop_assert_eq!(map.ticks_to_ms(tpb(480), k * 480), k * 500);
        }

        #[test]
        fn prop_segments_strictly_ascending(
            raw in prop::collection::vec((0u64..10_000, 1u32..2_000_000), 0..16),
        ) {
            let changes = raw.into_iter().map(|(t, m)| change(t, m)).collect();
            let map = TempoMap::from_changes(changes).unwrap();
            prop_assert_eq!(map.initial().start_tick, 0);
            for pair in map.segments().windows(2) {
                prop_assert!(pair[0].start_tick < pair[1].start_tick);
            }
        }
    }
}
