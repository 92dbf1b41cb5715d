//! Decoded sample data shared between sounds playing the same file.
//!
//! The cache only holds weak references. Playing sounds own the strong
//! ones, so a file stays decoded exactly as long as something plays it.

use crate::{AudioResult, SampleBuffer, SoundFileSystem};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Filename-keyed store of decoded buffers, evicted by usage.
#[derive(Debug, Default)]
pub struct BufferCache {
    entries: HashMap<String, Weak<SampleBuffer>>,
}

impl BufferCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Return the live buffer for `filename`, decoding it through `fs` if no
    /// sound currently holds it.
    pub fn load_or_share(
        &mut self,
        filename: &str,
        fs: &dyn SoundFileSystem,
    ) -> AudioResult<Arc<SampleBuffer>> {
        if let Some(existing) = self.peek(filename) {
            return Ok(existing);
        }

        let buffer = Arc::new(fs.decode(filename)?);
        self.entries
            .insert(filename.to_string(), Arc::downgrade(&buffer));
        debug!(file = filename, cached = self.entries.len(), "buffer decoded");
        Ok(buffer)
    }

    /// Live buffer for `filename`, without decoding.
    pub fn peek(&self, filename: &str) -> Option<Arc<SampleBuffer>> {
        self.entries.get(filename).and_then(Weak::upgrade)
    }

    /// Drop every entry no sound references anymore. Returns how many went.
    pub fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.strong_count() > 0);
        before - self.entries.len()
    }

    /// Number of entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry (live or expired) exists for `filename`.
    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    /// Forget every entry. Buffers held by sounds stay alive.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
