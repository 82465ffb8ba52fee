use std::io;
use std::path::PathBuf;

use haptic_core::HapticError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessError>;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode MIDI file {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: midly::Error,
    },

    #[error("{} uses SMPTE timecode timing; only ticks-per-beat files are supported", .path.display())]
    UnsupportedTiming { path: PathBuf },

    #[error("rejected {}: {source}", .path.display())]
    Haptic {
        path: PathBuf,
        #[source]
        source: HapticError,
    },

    #[error("failed to serialize pattern {track_id}: {source}")]
    Serialize {
        track_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid manifest entry {key}: {source}")]
    ManifestEntry {
        key: String,
        #[source]
        source: HapticError,
    },

    #[error("invalid manifest entry {key}: track id {id:?} must be a plain file name")]
    InvalidTrackId { key: String, id: String },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
