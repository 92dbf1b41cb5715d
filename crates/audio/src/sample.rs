//! Decoded PCM sample data.

use std::time::Duration;

/// Interleaved signed 16-bit PCM, fully decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: u16,
    sample_rate: u32,
    samples: Vec<i16>,
}

impl SampleBuffer {
    /// Wrap interleaved samples.
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            channels,
            sample_rate,
            samples,
        }
    }

    /// Channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> u64 {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() as u64 / u64::from(self.channels)
    }

    /// Playback length at normal pitch.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Playback length in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        self.duration().as_secs_f32() * 1000.0
    }
}
