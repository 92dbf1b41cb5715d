//! Generated sample data.

use anyhow::{Context, Result};
use rtsaudio_audio::SampleBuffer;
use std::path::Path;

/// Mono sine tone of `duration_ms` at `frequency` Hz.
pub fn tone(frequency: f32, duration_ms: u32, sample_rate: u32) -> SampleBuffer {
    let frames = (u64::from(sample_rate) * u64::from(duration_ms) / 1000) as usize;
    let step = std::f32::consts::TAU * frequency / sample_rate.max(1) as f32;
    let samples = (0..frames)
        .map(|i| ((i as f32 * step).sin() * f32::from(i16::MAX) * 0.5) as i16)
        .collect();
    SampleBuffer::new(1, sample_rate, samples)
}

/// `frames` frames of silence.
pub fn silence(channels: u16, sample_rate: u32, frames: usize) -> SampleBuffer {
    SampleBuffer::new(channels, sample_rate, vec![0; frames * usize::from(channels)])
}

/// Write `buffer` as a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, buffer: &SampleBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    for sample in buffer.samples() {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_has_requested_length() {
        let buffer = tone(440.0, 250, 8_000);
        assert_eq!(buffer.frames(), 2_000);
        assert!(buffer.samples().iter().any(|s| *s > 0));
    }

    #[test]
    fn silence_is_interleaved() {
        let buffer = silence(2, 8_000, 100);
        assert_eq!(buffer.samples().len(), 200);
        assert_eq!(buffer.frames(), 100);
    }
}
