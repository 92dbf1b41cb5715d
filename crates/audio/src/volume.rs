//! Output gain for a sound given settings and listener position.

use crate::AudioSettings;
use glam::Vec3;
use rtsaudio_core::AudioEvent;

/// Pure volume computation over the settings and listener of one tick.
#[derive(Debug, Clone, Copy)]
pub struct VolumeModel<'a> {
    settings: &'a AudioSettings,
    listener: Vec3,
}

impl<'a> VolumeModel<'a> {
    /// Model for the given settings and listener position.
    pub fn new(settings: &'a AudioSettings, listener: Vec3) -> Self {
        Self { settings, listener }
    }

    /// Gain for `event`, clamped to `[0, 1]`. An override replaces the whole
    /// computation.
    pub fn volume(&self, event: &AudioEvent, volume_override: Option<f32>) -> f32 {
        if let Some(fixed) = volume_override {
            return fixed.clamp(0.0, 1.0);
        }

        let positional = event.is_positional();
        let mut volume = event.volume()
            * event.volume_shift()
            * self.settings.category_volume(event.category(), positional);

        if positional {
            if let (Some(info), Some(position)) = (event.info(), event.position()) {
                let (min, max) = if info.global {
                    (self.settings.global_min_range, self.settings.global_max_range)
                } else {
                    (info.min_distance, info.max_distance)
                };
                volume *= distance_factor(self.listener.distance(position), min, max);
            }
        }

        volume.clamp(0.0, 1.0)
    }
}

/// Inverse falloff beyond `min`, hard cutoff at `max`. A bound of zero or
/// less disables that region.
pub fn distance_factor(distance: f32, min: f32, max: f32) -> f32 {
    if distance >= max && max > 0.0 {
        return 0.0;
    }
    if distance > min && min > 0.0 {
        return min / distance;
    }
    1.0
}
