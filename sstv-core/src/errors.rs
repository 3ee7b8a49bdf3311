//! Decoder error types

use thiserror::Error;

/// Result alias for engine operations that can fail at the call boundary
/// (construction and the batch wrapper). Streaming failures are state
/// transitions, not `Err` values.
pub type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no image sync pulse found")]
    SyncNotFound,

    #[error("sync lost at line {at_line}")]
    SyncLost { at_line: usize },

    #[error("stream ended after {lines_decoded} of {total_lines} lines")]
    EndOfStream {
        lines_decoded: usize,
        total_lines: usize,
    },

    #[error("unknown SSTV mode: {name}")]
    UnknownMode { name: String },

    #[error("sample rate {rate} Hz outside the supported 8000..=192000 range")]
    InvalidSampleRate { rate: u32 },

    #[error("not enough samples to decode an image")]
    InsufficientSamples,
}

/// Failures of the audio-file collaborator; never produced by the decode
/// engine itself.
#[derive(Debug, Error)]
pub enum AudioLoadError {
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("could not decode audio from {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("no audio samples decoded from {path}")]
    Empty { path: String },

    #[error("resampling failed: {reason}")]
    Resample { reason: String },
}
