use std::path::Path;

use haptic_core::{DecodedSequence, MessageKind, TrackMessage};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::error::{ProcessError, Result};

/// A decoded MIDI file reduced to what haptic extraction needs.
#[derive(Debug, Clone)]
pub struct MidiData {
    pub sequence: DecodedSequence,
    /// Name of each track, indexed like `sequence.tracks`.
    pub track_names: Vec<Option<String>>,
}

impl MidiData {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| ProcessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&data, path)
    }

    /// Decode raw SMF bytes; `path` is only used for error reporting.
    pub fn parse(data: &[u8], path: &Path) -> Result<Self> {
        let smf = Smf::parse(data).map_err(|source| ProcessError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => u32::from(tpb.as_int()),
            Timing::Timecode(..) => {
                return Err(ProcessError::UnsupportedTiming {
                    path: path.to_path_buf(),
                })
            }
        };

        let (tracks, track_names): (Vec<_>, Vec<_>) =
            smf.tracks.iter().map(|track| convert_track(track)).unzip();

        Ok(MidiData {
            sequence: DecodedSequence::new(ticks_per_beat, tracks),
            track_names,
        })
    }
}

fn convert_track(track: &[TrackEvent<'_>]) -> (Vec<TrackMessage>, Option<String>) {
    let mut messages = Vec::with_capacity(track.len());
    let mut track_name: Option<String> = None;

    for event in track {
        let kind = match event.kind {
            TrackEventKind::Midi { channel, message } => match message {
                MidiMessage::NoteOn { key, vel } => MessageKind::NoteOn {
                    channel: channel.as_int(),
                    note: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::ProgramChange { program } => MessageKind::ProgramChange {
                    channel: channel.as_int(),
                    program: program.as_int(),
                },
                _ => MessageKind::Other,
            },
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => MessageKind::SetTempo {
                micros_per_beat: tempo.as_int(),
            },
            TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                if track_name.is_none() {
                    track_name = clean_track_name(name);
                }
                MessageKind::Other
            }
            _ => MessageKind::Other,
        };
        messages.push(TrackMessage::new(event.delta.as_int(), kind));
    }

    (messages, track_name)
}

fn clean_track_name(raw: &[u8]) -> Option<String> {
    let name = String::from_utf8_lossy(raw);
    let cleaned = name.trim_end_matches('\0').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
