//! Audio error taxonomy.
//!
//! None of these are fatal: every failure degrades to "the requested sound
//! does not play". Control requests on unknown handles are not errors at all.

use thiserror::Error;

/// Errors raised while opening, decoding or starting a sound.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The event has no metadata or no playable filename.
    #[error("event `{0}` has no playable filename")]
    Unresolved(String),
    /// The per-name concurrency cap is already reached.
    #[error("event `{name}` already has {limit} active instances")]
    LimitExceeded {
        /// Event name.
        name: String,
        /// Configured limit.
        limit: u32,
    },
    /// A sound is already registered under the requested handle.
    #[error("handle {0} is already playing")]
    HandleInUse(rtsaudio_core::AudioHandle),
    /// The backend refused to open a primitive.
    #[error("backend failed to open `{filename}`: {reason}")]
    BackendOpen {
        /// Resource that failed.
        filename: String,
        /// Backend message.
        reason: String,
    },
    /// The file system could not produce sample data.
    #[error("failed to decode `{filename}`: {reason}")]
    Decode {
        /// Resource that failed.
        filename: String,
        /// Decoder message.
        reason: String,
    },
    /// Wrap IO errors from the file system.
    #[error("audio file IO failed: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap WAV reader errors.
    #[error("failed to read wav data: {0}")]
    Wav(#[from] hound::Error),
    /// Sample layout the decoder cannot convert.
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
    /// A video exposed no track with a usable audio format.
    #[error("video has no usable audio track")]
    NoAudioTrack,
    /// Zero channels or zero sample rate.
    #[error("invalid stream format: {channels} channels at {sample_rate} Hz")]
    InvalidStreamFormat {
        /// Channel count reported by the track.
        channels: u16,
        /// Sample rate reported by the track.
        sample_rate: u32,
    },
}

/// Result alias for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

impl AudioError {
    /// Build a [`AudioError::BackendOpen`] from any displayable cause.
    pub fn backend_open(filename: &str, reason: impl std::fmt::Display) -> Self {
        Self::BackendOpen {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`AudioError::Decode`] from any displayable cause.
    pub fn decode(filename: &str, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }
    }
}
