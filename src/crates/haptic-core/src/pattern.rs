use serde::{Serialize, Serializer};

use crate::rounding::div_round_half_away;
use crate::tempo::TempoMap;

/// Written in place of `note_range` when a stats block has no events.
pub const EMPTY_NOTE_RANGE: &str = "N/A";

/// One vibration pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HapticEvent {
    #[serde(rename = "time")]
    pub time_ms: u64,
    pub note: u8,
    pub velocity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternStats {
    pub total_events: usize,
    pub duration_ms: u64,
    pub avg_velocity: u64,
    /// Lowest and highest note, or `None` for an empty list.
    #[serde(serialize_with = "serialize_note_range")]
    pub note_range: Option<(u8, u8)>,
}

impl PatternStats {
    pub fn from_events(events: &[HapticEvent]) -> Self {
        let total_events = events.len();
        let duration_ms = events.last().map_or(0, |e| e.time_ms);
        let velocity_sum: u64 = events.iter().map(|e| u64::from(e.velocity)).sum();
        let avg_velocity = div_round_half_away(velocity_sum, total_events as u64);

        let note_range = events.iter().fold(None, |range: Option<(u8, u8)>, e| match range {
            Some((low, high)) => Some((low.min(e.note), high.max(e.note))),
            None => Some((e.note, e.note)),
        });

        Self {
            total_events,
            duration_ms,
            avg_velocity,
            note_range,
        }
    }
}

fn serialize_note_range<S>(range: &Option<(u8, u8)>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match range {
        Some((low, high)) => serializer.serialize_str(&format!("{}-{}", low, high)),
        None => serializer.serialize_str(EMPTY_NOTE_RANGE),
    }
}

/// The finished haptic timeline for one audio track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HapticPattern {
    track_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    haptic_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    bpm: f64,
    events: Vec<HapticEvent>,
    stats: PatternStats,
}

impl HapticPattern {
    /// Package deduplicated events into an artifact.
    ///
    /// Returns `None` when there is nothing to feel; callers skip writing
    /// rather than emit an empty timeline.
    pub fn assemble(
        track_id: impl Into<String>,
        tempo_map: &TempoMap,
        events: Vec<HapticEvent>,
    ) -> Option<Self> {
        if events.is_empty() {
            return None;
        }

        let stats = PatternStats::from_events(&events);
        Some(Self {
            track_id: track_id.into(),
            title: None,
            haptic_enabled: true,
            pattern: None,
            bpm: tempo_map.initial().bpm(1),
            events,
            stats,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Rendering style on the device, such as `heartbeat` or `purr`.
    pub fn with_style(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn style(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn events(&self) -> &[HapticEvent] {
        &self.events
    }

    pub fn stats(&self) -> &PatternStats {
        &self.stats
    }
}
