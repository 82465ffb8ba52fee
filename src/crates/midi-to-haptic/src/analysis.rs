//! Tempo and instrument survey of MIDI files.
//!
//! Useful before choosing an instrument allow-list or deciding whether a
//! file needs the segmented tempo map at all.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use haptic_core::rounding::ratio_to_decimals;
use haptic_core::{gm_program_name, MessageKind, TempoChange, TempoMap};
use serde::Serialize;

use crate::midi::MidiData;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TempoEntry {
    pub tick: u64,
    pub micros_per_beat: u32,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentEntry {
    pub program: u8,
    pub name: String,
}

impl InstrumentEntry {
    fn new(program: u8) -> Self {
        let name = gm_program_name(program)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown ({})", program));
        Self { program, name }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackAnalysis {
    pub track_number: usize,
    pub track_name: Option<String>,
    pub instruments: Vec<InstrumentEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileAnalysis {
    pub filepath: PathBuf,
    pub filename: String,
    pub ticks_per_beat: u32,
    pub num_tracks: usize,
    /// Every tempo event in scan order.
    pub tempo_changes: Vec<TempoEntry>,
    /// Tempo of the first tempo event, if any.
    pub bpm: Option<f64>,
    pub constant_tempo: bool,
    pub all_instruments: Vec<InstrumentEntry>,
    /// Only tracks that change program at least once.
    pub tracks: Vec<TrackAnalysis>,
}

/// One line of a multi-file survey.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisEntry {
    Analyzed(FileAnalysis),
    Failed {
        filepath: PathBuf,
        filename: String,
        error: String,
    },
}

pub fn analyze(data: &MidiData, path: &Path) -> FileAnalysis {
    let sequence = &data.sequence;
    let mut tempo_changes = Vec::new();
    let mut per_track: BTreeMap<usize, BTreeSet<u8>> = BTreeMap::new();

    for msg in sequence.timed_messages() {
        match msg.kind {
            MessageKind::SetTempo { micros_per_beat } => tempo_changes.push(TempoEntry {
                tick: msg.absolute_tick,
                micros_per_beat,
                bpm: ratio_to_decimals(60_000_000, u64::from(micros_per_beat), 2),
            }),
            MessageKind::ProgramChange { program, .. } => {
                per_track.entry(msg.track_index).or_default().insert(program);
            }
            _ => {}
        }
    }

    // Repeated identical tempos do not count as a change
    let constant_tempo = TempoMap::from_changes(
        tempo_changes
            .iter()
            .map(|t| TempoChange {
                absolute_tick: t.tick,
                micros_per_beat: t.micros_per_beat,
            })
            .collect(),
    )
    .map_or(false, |map| map.is_constant());

    let all_programs: BTreeSet<u8> = per_track.values().flatten().copied().collect();
    let tracks = per_track
        .into_iter()
        .map(|(track_number, programs)| TrackAnalysis {
            track_number,
            track_name: data.track_names.get(track_number).cloned().flatten(),
            instruments: programs.into_iter().map(InstrumentEntry::new).collect(),
        })
        .collect();

    FileAnalysis {
        filepath: path.to_path_buf(),
        filename: file_name(path),
        ticks_per_beat: sequence.ticks_per_beat,
        num_tracks: sequence.tracks.len(),
        bpm: tempo_changes.first().map(|t| t.bpm),
        constant_tempo,
        tempo_changes,
        all_instruments: all_programs.into_iter().map(InstrumentEntry::new).collect(),
        tracks,
    }
}

pub fn analyze_file(path: &Path) -> AnalysisEntry {
    match MidiData::from_file(path) {
        Ok(data) => AnalysisEntry::Analyzed(analyze(&data, path)),
        Err(e) => {
            log::warn!("{}", e);
            AnalysisEntry::Failed {
                filepath: path.to_path_buf(),
                filename: file_name(path),
                error: e.to_string(),
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// How many files use each program, most used first.
pub fn instrument_usage(entries: &[AnalysisEntry]) -> Vec<(InstrumentEntry, usize)> {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for entry in entries {
        if let AnalysisEntry::Analyzed(analysis) = entry {
            for instrument in &analysis.all_instruments {
                *counts.entry(instrument.program).or_default() += 1;
            }
        }
    }

    let mut usage: Vec<(InstrumentEntry, usize)> = counts
        .into_iter()
        .map(|(program, count)| (InstrumentEntry::new(program), count))
        .collect();
    usage.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.program.cmp(&b.0.program)));
    usage
}

pub fn format_entry(entry: &AnalysisEntry) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);

    match entry {
        AnalysisEntry::Failed { filename, error, .. } => {
            let _ = writeln!(out, "{}\nFile: {}\n{}", rule, filename, rule);
            let _ = writeln!(out, "Error: {}", error);
        }
        AnalysisEntry::Analyzed(analysis) => {
            let _ = writeln!(out, "{}\nFile: {}\n{}", rule, analysis.filename, rule);
            let _ = writeln!(out, "Tracks: {}", analysis.num_tracks);
            let _ = writeln!(out, "Ticks per beat: {}", analysis.ticks_per_beat);

            match analysis.bpm {
                Some(bpm) => {
                    let _ = writeln!(out, "Tempo: {} BPM", bpm);
                    if analysis.constant_tempo {
                        let _ = writeln!(out, "  constant tempo");
                    } else {
                        let _ = writeln!(out, "  {} tempo changes:", analysis.tempo_changes.len());
                        for (i, change) in analysis.tempo_changes.iter().enumerate() {
                            let _ = writeln!(out, "    #{}: {} BPM (tick {})", i + 1, change.bpm, change.tick);
                        }
                    }
                }
                None => {
                    let _ = writeln!(out, "Tempo: none (120 BPM default)");
                }
            }

            if analysis.all_instruments.is_empty() {
                let _ = writeln!(out, "\nNo program changes (drum-only or default instrument)");
            } else {
                let _ = writeln!(out, "\nInstruments ({}):", analysis.all_instruments.len());
                for instrument in &analysis.all_instruments {
                    let _ = writeln!(out, "  [{:3}] {}", instrument.program, instrument.name);
                }

                let _ = writeln!(out, "\nPer track:");
                for track in &analysis.tracks {
                    let name = track
                        .track_name
                        .clone()
                        .unwrap_or_else(|| format!("Track {}", track.track_number));
                    let _ = writeln!(out, "  Track {}: {}", track.track_number, name);
                    for instrument in &track.instruments {
                        let _ = writeln!(out, "    - [{:3}] {}", instrument.program, instrument.name);
                    }
                }
            }
        }
    }

    out
}

pub fn format_usage(usage: &[(InstrumentEntry, usize)]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);
    let _ = writeln!(out, "{}\nInstrument usage\n{}", rule, rule);
    for (instrument, count) in usage {
        let _ = writeln!(out, "[{:3}] {:30} used in {} file(s)", instrument.program, instrument.name, count);
    }
    out
}
