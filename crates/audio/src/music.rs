//! Bookkeeping for the one track treated as current music.

use rtsaudio_core::AudioHandle;

/// Which music sound is current and whether the last one has ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicState {
    handle: AudioHandle,
    name: String,
    completed: bool,
}

impl Default for MusicState {
    fn default() -> Self {
        Self {
            handle: AudioHandle::NONE,
            name: String::new(),
            completed: true,
        }
    }
}

impl MusicState {
    /// Handle of the current music sound, `NONE` when nothing is tracked.
    pub fn handle(&self) -> AudioHandle {
        self.handle
    }

    /// Name of the current or most recently finished track.
    pub fn track_name(&self) -> &str {
        &self.name
    }

    /// Whether the tracked track has ended, by playing out or being stopped.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// A music sound was finalized, either played out or stopped.
    pub fn on_finished(&mut self, name: &str) {
        self.completed = true;
        self.name = name.to_string();
        self.handle = AudioHandle::NONE;
    }

    /// Adopt or drop the current music sound. `is_music` reports whether a
    /// handle still belongs to a registered music sound; `first` is the
    /// first registered music sound, if any.
    pub fn reconcile<F>(&mut self, first: Option<(AudioHandle, &str)>, is_music: F)
    where
        F: Fn(AudioHandle) -> bool,
    {
        if self.handle == AudioHandle::NONE {
            if let Some((handle, name)) = first {
                self.handle = handle;
                self.name = name.to_string();
                self.completed = false;
            }
            return;
        }
        if !is_music(self.handle) {
            self.completed = true;
            self.handle = AudioHandle::NONE;
        }
    }

    /// True when `name` is the tracked track, it completed, and no further
    /// repeats are expected.
    pub fn has_track_completed(&self, name: &str, repeat_count: i32) -> bool {
        name == self.name && self.completed && repeat_count <= 0
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
