use std::collections::HashMap;

/// Tracks the current program per `(track, channel)` while a file is scanned.
///
/// Channel numbers are only meaningful within the track that authored
/// them, so two tracks writing to channel 0 never see each other's
/// program changes. A resolver belongs to a single file's scan.
#[derive(Debug, Clone, Default)]
pub struct ProgramResolver {
    current: HashMap<(usize, u8), u8>,
}

impl ProgramResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, track_index: usize, channel: u8, program: u8) {
        self.current.insert((track_index, channel), program);
    }

    /// `None` until a program change has been seen on the pair.
    pub fn resolve(&self, track_index: usize, channel: u8) -> Option<u8> {
        self.current.get(&(track_index, channel)).copied()
    }
}
