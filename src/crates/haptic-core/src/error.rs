use thiserror::Error;

pub type Result<T> = std::result::Result<T, HapticError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HapticError {
    #[error("ticks per beat must be positive, got {0}")]
    InvalidTicksPerBeat(u32),

    #[error("tempo at tick {tick} must be positive, got {micros_per_beat} microseconds per beat")]
    InvalidTempo { tick: u64, micros_per_beat: u32 },

    #[error("invalid register {low}..={high}: {reason}")]
    InvalidRegister { low: u8, high: u8, reason: &'static str },

    #[error("unknown instrument name: {0}")]
    UnknownInstrument(String),
}
