//! Sound files held in memory, with per-file decode counts.

use parking_lot::Mutex;
use rtsaudio_audio::{AudioError, AudioResult, SampleBuffer, SoundFileSystem};
use std::collections::HashMap;

/// File system double that serves fixed buffers and records every decode.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: HashMap<String, SampleBuffer>,
    decodes: Mutex<HashMap<String, usize>>,
}

impl MemoryFileSystem {
    /// Empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, filename: impl Into<String>, buffer: SampleBuffer) {
        self.files.insert(filename.into(), buffer);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_file(mut self, filename: impl Into<String>, buffer: SampleBuffer) -> Self {
        self.insert(filename, buffer);
        self
    }

    /// How many times `filename` was decoded successfully.
    pub fn decode_count(&self, filename: &str) -> usize {
        self.decodes.lock().get(filename).copied().unwrap_or(0)
    }

    /// Successful decodes across all files.
    pub fn total_decodes(&self) -> usize {
        self.decodes.lock().values().sum()
    }
}

impl SoundFileSystem for MemoryFileSystem {
    fn decode(&self, filename: &str) -> AudioResult<SampleBuffer> {
        let buffer = self
            .files
            .get(filename)
            .cloned()
            .ok_or_else(|| AudioError::decode(filename, "no such file"))?;
        *self.decodes.lock().entry(filename.to_string()).or_default() += 1;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::silence;

    #[test]
    fn counts_successful_decodes_only() {
        let fs = MemoryFileSystem::new().with_file("a.wav", silence(1, 8_000, 10));
        assert!(fs.decode("a.wav").is_ok());
        assert!(fs.decode("a.wav").is_ok());
        assert!(fs.decode("b.wav").is_err());
        assert_eq!(fs.decode_count("a.wav"), 2);
        assert_eq!(fs.decode_count("b.wav"), 0);
        assert_eq!(fs.total_decodes(), 2);
    }
}
