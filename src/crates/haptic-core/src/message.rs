//! Decoded MIDI input as seen by the extraction pipeline.
//!
//! Byte-level decoding lives outside this crate. Decoders reduce every
//! message to one of the four kinds below, keeping the delta time so that
//! absolute tick positions can be reconstructed per track.

/// The subset of MIDI messages the pipeline reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    ProgramChange { channel: u8, program: u8 },
    SetTempo { micros_per_beat: u32 },
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackMessage {
    /// Ticks since the previous message on the same track.
    pub delta_ticks: u32,
    pub kind: MessageKind,
}

impl TrackMessage {
    pub fn new(delta_ticks: u32, kind: MessageKind) -> Self {
        Self { delta_ticks, kind }
    }

    pub fn note_on(delta_ticks: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(delta_ticks, MessageKind::NoteOn { channel, note, velocity })
    }

    pub fn program_change(delta_ticks: u32, channel: u8, program: u8) -> Self {
        Self::new(delta_ticks, MessageKind::ProgramChange { channel, program })
    }

    pub fn set_tempo(delta_ticks: u32, micros_per_beat: u32) -> Self {
        Self::new(delta_ticks, MessageKind::SetTempo { micros_per_beat })
    }

    pub fn other(delta_ticks: u32) -> Self {
        Self::new(delta_ticks, MessageKind::Other)
    }
}

/// A whole decoded file: one message list per track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSequence {
    pub ticks_per_beat: u32,
    pub tracks: Vec<Vec<TrackMessage>>,
}

impl DecodedSequence {
    pub fn new(ticks_per_beat: u32, tracks: Vec<Vec<TrackMessage>>) -> Self {
        Self { ticks_per_beat, tracks }
    }

    /// Every message with its absolute tick, track by track in scan order.
    pub fn timed_messages(&self) -> impl Iterator<Item = TimedMessage> + '_ {
        self.tracks.iter().enumerate().flat_map(|(track_index, track)| {
            let mut cursor = 0u64;
            track.iter().map(move |msg| {
                cursor += u64::from(msg.delta_ticks);
                TimedMessage {
                    track_index,
                    absolute_tick: cursor,
                    kind: msg.kind,
                }
            })
        })
    }

    /// Every note-on with a non-zero velocity, in scan order.
    pub fn note_ons(&self) -> impl Iterator<Item = RawNoteEvent> + '_ {
        self.timed_messages().filter_map(|msg| msg.as_note_on())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedMessage {
    pub track_index: usize,
    pub absolute_tick: u64,
    pub kind: MessageKind,
}

impl TimedMessage {
    /// Note-on with velocity 0 is a note-off by convention and yields `None`.
    pub fn as_note_on(&self) -> Option<RawNoteEvent> {
        match self.kind {
            MessageKind::NoteOn { channel, note, velocity } if velocity > 0 => Some(RawNoteEvent {
                track_index: self.track_index,
                channel,
                absolute_tick: self.absolute_tick,
                note,
                velocity,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNoteEvent {
    pub track_index: usize,
    pub channel: u8,
    pub absolute_tick: u64,
    pub note: u8,
    pub velocity: u8,
}
