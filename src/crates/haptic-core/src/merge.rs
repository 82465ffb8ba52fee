//! Cross-track merge and minimum-gap deduplication.
//!
//! Events from every track are pooled, put in one deterministic order and
//! thinned so that consecutive pulses are at least `min_gap_ms` apart. The
//! first event of a cluster is kept verbatim; the rest of the cluster is
//! dropped.

use crate::pattern::HapticEvent;

pub const DEFAULT_MIN_GAP_MS: u64 = 100;

/// A filtered note-on that already has its millisecond timestamp but still
/// remembers where it came from, for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateEvent {
    pub time_ms: u64,
    pub track_index: usize,
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
}

impl CandidateEvent {
    fn order_key(&self) -> (u64, usize, u8, u8) {
        (self.time_ms, self.track_index, self.channel, self.note)
    }
}

impl From<CandidateEvent> for HapticEvent {
    fn from(event: CandidateEvent) -> Self {
        HapticEvent {
            time_ms: event.time_ms,
            note: event.note,
            velocity: event.velocity,
        }
    }
}

/// Order by time, then track, channel and note. The sort is stable, so fully
/// tied candidates keep their scan order.
pub fn sort_candidates(candidates: &mut [CandidateEvent]) {
    candidates.sort_by_key(CandidateEvent::order_key);
}

/// Thin an already time-ordered sequence to the minimum gap.
pub fn dedup_sorted<I>(events: I, min_gap_ms: u64) -> Vec<HapticEvent>
where
    I: IntoIterator<Item = HapticEvent>,
{
    let mut accepted: Vec<HapticEvent> = Vec::new();
    let mut last_accepted: Option<u64> = None;

    for event in events {
        let far_enough = match last_accepted {
            Some(last) => event.time_ms.saturating_sub(last) >= min_gap_ms,
            None => true,
        };
        if far_enough {
            last_accepted = Some(event.time_ms);
            accepted.push(event);
        }
    }

    accepted
}

pub fn merge_and_dedup(mut candidates: Vec<CandidateEvent>, min_gap_ms: u64) -> Vec<HapticEvent> {
    let pooled = candidates.len();
    sort_candidates(&mut candidates);
    let events = dedup_sorted(candidates.into_iter().map(HapticEvent::from), min_gap_ms);

    log::debug!(
        "merged {} candidate(s) into {} event(s) with a {}ms gap",
        pooled,
        events.len(),
        min_gap_ms
    );
    events
}
