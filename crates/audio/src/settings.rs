//! User volume buckets and device sizing.

use rtsaudio_core::Category;
use serde::{Deserialize, Serialize};

/// Per-category volumes, mute, global distance range and the voice counts
/// the output device was opened with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Scales every bucket.
    pub master: f32,
    /// Music bucket.
    pub music: f32,
    /// Speech and briefings.
    pub speech: f32,
    /// Non-positional effects.
    pub sound: f32,
    /// Positional effects.
    pub sound_3d: f32,
    /// Silences every bucket without touching the stored volumes.
    pub muted: bool,
    /// Min distance substituted for global-range sounds
    pub global_min_range: f32,
    /// Max distance substituted for global-range sounds
    pub global_max_range: f32,
    /// Number of 2D sample voices the device is sized for
    pub sample_count_2d: u32,
    /// Number of 3D sample voices the device is sized for
    pub sample_count_3d: u32,
    /// Number of concurrent streams the device is sized for
    pub stream_count: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            music: 0.5,
            speech: 1.0,
            sound: 1.0,
            sound_3d: 1.0,
            muted: false,
            global_min_range: 40.0,
            global_max_range: 400.0,
            sample_count_2d: 32,
            sample_count_3d: 32,
            stream_count: 8,
        }
    }
}

impl AudioSettings {
    /// Defaults: music at half, everything else full.
    pub fn new() -> Self {
        Self::default()
    }

    fn scaled(&self, volume: f32) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master * volume
        }
    }

    /// Music gain after master and mute.
    pub fn effective_music_volume(&self) -> f32 {
        self.scaled(self.music)
    }

    /// Speech gain after master and mute.
    pub fn effective_speech_volume(&self) -> f32 {
        self.scaled(self.speech)
    }

    /// 2D effect gain after master and mute.
    pub fn effective_sound_volume(&self) -> f32 {
        self.scaled(self.sound)
    }

    /// 3D effect gain after master and mute.
    pub fn effective_sound_3d_volume(&self) -> f32 {
        self.scaled(self.sound_3d)
    }

    /// Volume bucket for a sound of `category`.
    pub fn category_volume(&self, category: Category, positional: bool) -> f32 {
        match category {
            Category::Music => self.effective_music_volume(),
            Category::Speech => self.effective_speech_volume(),
            Category::Effect if positional => self.effective_sound_3d_volume(),
            Category::Effect => self.effective_sound_volume(),
        }
    }

    /// Flip the mute flag.
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Clamped to `[0, 1]`.
    pub fn set_master(&mut self, volume: f32) {
        self.master = volume.clamp(0.0, 1.0);
    }

    /// Clamped to `[0, 1]`.
    pub fn set_music(&mut self, volume: f32) {
        self.music = volume.clamp(0.0, 1.0);
    }

    /// Clamped to `[0, 1]`.
    pub fn set_speech(&mut self, volume: f32) {
        self.speech = volume.clamp(0.0, 1.0);
    }

    /// Clamped to `[0, 1]`.
    pub fn set_sound(&mut self, volume: f32) {
        self.sound = volume.clamp(0.0, 1.0);
    }

    /// Clamped to `[0, 1]`.
    pub fn set_sound_3d(&mut self, volume: f32) {
        self.sound_3d = volume.clamp(0.0, 1.0);
    }
}
