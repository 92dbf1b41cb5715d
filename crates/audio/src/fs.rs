//! File-system collaborator that produces decoded sample data.

use crate::{AudioError, AudioResult, SampleBuffer};
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decodes a named sound file into memory.
pub trait SoundFileSystem {
    /// Fully decode `filename`.
    fn decode(&self, filename: &str) -> AudioResult<SampleBuffer>;
}

/// Reads WAV files relative to a root directory.
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
    root: PathBuf,
}

impl DiskFileSystem {
    /// Resolve filenames against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Full path for a filename.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }
}

impl SoundFileSystem for DiskFileSystem {
    fn decode(&self, filename: &str) -> AudioResult<SampleBuffer> {
        let path = self.path_for(filename);
        let buffer = decode_wav(&path)?;
        debug!(
            file = filename,
            frames = buffer.frames(),
            rate = buffer.sample_rate(),
            "decoded sound"
        );
        Ok(buffer)
    }
}

/// Decode a WAV file to 16-bit interleaved PCM.
pub fn decode_wav(path: &Path) -> AudioResult<SampleBuffer> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits @ 1..=16) => {
            let shift = 16 - u32::from(bits);
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| v << shift))
                .collect::<Result<_, _>>()?
        }
        (SampleFormat::Int, bits @ 17..=32) => {
            let shift = u32::from(bits) - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<Result<_, _>>()?
        }
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16))
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{format:?} with {bits} bits per sample"
            )))
        }
    };
    Ok(SampleBuffer::new(spec.channels, spec.sample_rate, samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rtsaudio-fs-{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn decodes_16_bit_wav() {
        let dir = temp_dir();
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(dir.join("beep.wav"), spec).unwrap();
        for i in 0..800i16 {
            writer.write_sample(i).unwrap();
            writer.write_sample(-i).unwrap();
        }
        writer.finalize().unwrap();

        let fs = DiskFileSystem::new(&dir);
        let buffer = fs.decode("beep.wav").expect("wav decodes");
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.sample_rate(), 8000);
        assert_eq!(buffer.frames(), 800);
        assert_eq!(buffer.samples()[2], 1);
        assert_eq!(buffer.samples()[3], -1);
    }

    #[test]
    fn widens_8_bit_samples() {
        let dir = temp_dir();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(dir.join("low.wav"), spec).unwrap();
        writer.write_sample(1i8).unwrap();
        writer.finalize().unwrap();

        let buffer = DiskFileSystem::new(&dir).decode("low.wav").unwrap();
        assert_eq!(buffer.samples(), &[256]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let fs = DiskFileSystem::new(temp_dir());
        assert!(fs.decode("nope.wav").is_err());
    }
}
