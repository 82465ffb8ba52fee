// End-to-end extraction scenarios

#[cfg(test)]
mod tests {
    use crate::*;
    use proptest::prelude::*;

    const CELLO: u8 = 42;
    const PIANO: u8 = 0;

    // Helper: note-ons on one track at the given absolute ticks
    fn notes_at(ticks: &[u32], note: u8) -> Vec<TrackMessage> {
        let mut previous = 0;
        ticks
            .iter()
            .map(|&tick| {
                let msg = TrackMessage::note_on(tick - previous, 0, note, 100);
                previous = tick;
                msg
            })
            .collect()
    }

    fn times(pattern: &HapticPattern) -> Vec<u64> {
        pattern.events().iter().map(|e| e.time_ms).collect()
    }

    #[test]
    fn test_constant_tempo_quarter_and_eighth_notes() {
        let seq = DecodedSequence::new(
            480,
            vec![
                vec![TrackMessage::set_tempo(0, 500_000)],
                notes_at(&[0, 240, 480, 720], 40),
            ],
        );
        let pattern = HapticExtractor::default().pattern("sleep_01", &seq).unwrap().unwrap();
        assert_eq!(times(&pattern), vec![0, 250, 500, 750]);
        assert_eq!(pattern.stats().total_events, 4);
        assert_eq!(pattern.stats().duration_ms, 750);
    }

    #[test]
    fn test_events_closer_than_gap_are_dropped() {
        // 1000 ticks per beat at 120 BPM: two ticks per millisecond
        let seq = DecodedSequence::new(1000, vec![notes_at(&[0, 100, 240, 1000], 45)]);
        let pattern = HapticExtractor::default().pattern("sleep_02", &seq).unwrap().unwrap();
        assert_eq!(times(&pattern), vec![0, 120, 500]);
    }

    #[test]
    fn test_missing_tempo_defaults_to_120() {
        let seq = DecodedSequence::new(96, vec![notes_at(&[0, 96], 50)]);
        let pattern = HapticExtractor::default().pattern("noise_01", &seq).unwrap().unwrap();
        assert_eq!(pattern.bpm(), 120.0);
        assert_eq!(times(&pattern), vec![0, 500]);
    }

    #[test]
    fn test_no_bass_notes_yields_no_pattern() {
        let seq = DecodedSequence::new(480, vec![notes_at(&[0, 480, 960], 72), notes_at(&[0], 30)]);
        let result = HapticExtractor::default().pattern("energy_01", &seq).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_mid_piece_tempo_change() {
        // Conductor track halves the tempo after two beats
        let seq = DecodedSequence::new(
            480,
            vec![
                vec![
                    TrackMessage::set_tempo(0, 500_000),
                    TrackMessage::set_tempo(960, 1_000_000),
                ],
                notes_at(&[0, 960, 1440], 40),
            ],
        );

        let segmented = HapticExtractor::default().pattern("a", &seq).unwrap().unwrap();
        assert_eq!(times(&segmented), vec![0, 1000, 2000]);

        let degraded = HapticExtractor::new(ExtractOptions {
            tempo_mode: TempoMode::FirstTempo,
            ..ExtractOptions::default()
        });
        let first_tempo = degraded.pattern("a", &seq).unwrap().unwrap();
        assert_eq!(times(&first_tempo), vec![0, 1000, 1500]);
    }

    #[test]
    fn test_instrument_targeted_extraction() {
        let seq = DecodedSequence::new(
            480,
            vec![
                vec![
                    TrackMessage::program_change(0, 0, PIANO),
                    TrackMessage::note_on(0, 0, 40, 90),
                    TrackMessage::note_on(480, 0, 41, 90),
                ],
                vec![
                    TrackMessage::note_on(240, 1, 45, 60),
                    TrackMessage::program_change(0, 1, CELLO),
                    TrackMessage::note_on(480, 1, 47, 70),
                    // Piano on another channel of the same track stays excluded
                    TrackMessage::program_change(0, 2, PIANO),
                    TrackMessage::note_on(480, 2, 48, 70),
                ],
            ],
        );

        let options = ExtractOptions {
            filter: RegisterFilter::default().with_instruments(LOW_STRINGS).unwrap(),
            ..ExtractOptions::default()
        };
        let pattern = HapticExtractor::new(options).pattern("sleep_03", &seq).unwrap().unwrap();

        assert_eq!(pattern.events().len(), 1);
        assert_eq!(pattern.events()[0].note, 47);
        assert_eq!(pattern.events()[0].time_ms, 750);
    }

    #[test]
    fn test_program_change_does_not_leak_across_tracks() {
        let seq = DecodedSequence::new(
            480,
            vec![
                vec![TrackMessage::program_change(0, 0, CELLO)],
                vec![TrackMessage::note_on(0, 0, 40, 90)],
            ],
        );
        let options = ExtractOptions {
            filter: RegisterFilter::default().with_programs([CELLO]),
            ..ExtractOptions::default()
        };
        let result = HapticExtractor::new(options).pattern("x", &seq).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_note_off_velocity_zero_ignored() {
        let seq = DecodedSequence::new(
            480,
            vec![vec![
                TrackMessage::note_on(0, 0, 40, 0),
                TrackMessage::note_on(480, 0, 41, 80),
            ]],
        );
        let pattern = HapticExtractor::default().pattern("x", &seq).unwrap().unwrap();
        assert_eq!(times(&pattern), vec![500]);
    }

    #[test]
    fn test_zero_ticks_per_beat_rejected() {
        let seq = DecodedSequence::new(0, vec![notes_at(&[0], 40)]);
        let err = HapticExtractor::default().extract(&seq).unwrap_err();
        assert_eq!(err, HapticError::InvalidTicksPerBeat(0));
    }

    #[test]
    fn test_zero_tempo_rejected() {
        let seq = DecodedSequence::new(
            480,
            vec![vec![TrackMessage::set_tempo(0, 0), TrackMessage::note_on(0, 0, 40, 90)]],
        );
        let err = HapticExtractor::default().extract(&seq).unwrap_err();
        assert!(matches!(err, HapticError::InvalidTempo { tick: 0, .. }));
    }

    #[test]
    fn test_candidates_counted_before_dedup() {
        let seq = DecodedSequence::new(480, vec![notes_at(&[0, 10, 20, 480], 40)]);
        let extraction = HapticExtractor::default().extract(&seq).unwrap();
        assert_eq!(extraction.candidates, 4);
        assert_eq!(extraction.events.len(), 2);
    }

    fn arb_sequence() -> impl Strategy<Value = DecodedSequence> {
        let message = prop_oneof![
            (0u32..500, 0u8..4, 0u8..128, 0u8..128)
                .prop_map(|(d, ch, note, vel)| TrackMessage::note_on(d, ch, note, vel)),
            (0u32..500, 0u8..4, 0u8..128).prop_map(|(d, ch, p)| TrackMessage::program_change(d, ch, p)),
            (0u32..500, 100_000u32..2_000_000).prop_map(|(d, m)| TrackMessage::set_tempo(d, m)),
            (0u32..500).prop_map(TrackMessage::other),
        ];
        (
            1u32..1000,
            prop::collection::vec(prop::collection::vec(message, 0..40), 1..4),
        )
            .prop_map(|(tpb, tracks)| DecodedSequence::new(tpb, tracks))
    }

    proptest! {
        #[test]
        fn prop_output_within_register(seq in arb_sequence(), low in 20u8..50, width in 0u8..30) {
            let options = ExtractOptions {
                filter: RegisterFilter::new(low, low + width).unwrap(),
                ..ExtractOptions::default()
            };
            let extraction = HapticExtractor::new(options).extract(&seq).unwrap();
            for event in &extraction.events {
                prop_assert!(event.note >= low && event.note <= low + width);
                prop_assert!(event.velocity > 0);
            }
        }

        #[test]
        fn prop_repeated_runs_are_byte_identical(seq in arb_sequence()) {
            let extractor = HapticExtractor::default();
            let first = extractor.pattern("t", &seq).unwrap();
            let second = extractor.pattern("t", &seq).unwrap();
            prop_assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }
    }
}
