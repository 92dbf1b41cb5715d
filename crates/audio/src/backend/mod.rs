//! Platform sound primitives.
//!
//! A backend hands out [`Voice`]s: buffered voices for fully decoded short
//! sounds, file streams for music and speech, and pull streams fed by a
//! [`PullSource`] (bridged video audio). The coordinator owns every voice
//! and drives it from the simulation thread; only pull sources are touched
//! from the backend's own audio thread.

mod headless;
#[cfg(any(feature = "rodio_backend", test))]
mod pump;
#[cfg(feature = "rodio_backend")]
mod rodio_output;

pub use headless::{HeadlessBackend, PullProbe, VoiceSnapshot};
#[cfg(feature = "rodio_backend")]
pub use rodio_output::RodioBackend;

use crate::{AudioResult, SampleBuffer};
use glam::Vec3;
use std::sync::Arc;
use std::time::Duration;

/// Playback state reported by a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStatus {
    /// Producing audio (including looping restarts).
    Playing,
    /// Paused by request.
    Paused,
    /// Not started, stopped, or played to the end.
    Stopped,
}

/// Where a voice sits relative to the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Follows the listener; `offset` is relative to it.
    Listener {
        /// Offset from the listener.
        offset: Vec3,
    },
    /// Fixed in the world.
    World {
        /// World position.
        position: Vec3,
        /// Distance below which the backend applies no attenuation.
        min_distance: f32,
    },
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Listener { offset: Vec3::ZERO }
    }
}

/// Listener position and orientation pushed to the backend every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerPose {
    /// World position.
    pub position: Vec3,
    /// Facing direction.
    pub forward: Vec3,
    /// Up vector.
    pub up: Vec3,
}

impl Default for ListenerPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Y,
            up: Vec3::Z,
        }
    }
}

/// One backend playback object.
pub trait Voice {
    /// Start or resume playback.
    fn play(&mut self);
    /// Pause, keeping the playback position.
    fn pause(&mut self);
    /// Stop for good.
    fn stop(&mut self);
    /// Current state.
    fn status(&self) -> VoiceStatus;
    /// Linear gain (0.0 to 1.0).
    fn set_volume(&mut self, volume: f32);
    /// Playback speed multiplier.
    fn set_pitch(&mut self, pitch: f32);
    /// Loop from the start when the end is reached. Only honored before `play`.
    fn set_looping(&mut self, looping: bool);
    /// Position relative to the listener or in the world.
    fn set_placement(&mut self, placement: Placement);
}

/// Consumer side of a pull stream, polled from the backend's audio thread.
pub trait PullSource: Send + 'static {
    /// Interleaved channel count.
    fn channels(&self) -> u16;
    /// Frames per second.
    fn sample_rate(&self) -> u32;
    /// Block until the next chunk is available. `None` signals end of stream.
    fn pull(&mut self) -> Option<&[i16]>;
    /// The backend repositioned the stream; discard anything buffered.
    fn seek(&mut self);
}

/// Factory for voices plus listener plumbing.
pub trait AudioBackend {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;
    /// Create a voice over the decoded contents of `filename`. `spatial`
    /// selects a world-placed voice.
    fn create_sample_voice(
        &mut self,
        filename: &str,
        buffer: Arc<SampleBuffer>,
        spatial: bool,
    ) -> AudioResult<Box<dyn Voice>>;
    /// Open a file stream.
    fn open_stream(&mut self, filename: &str) -> AudioResult<Box<dyn Voice>>;
    /// Open a stream fed incrementally by `source`.
    fn open_pull_stream(&mut self, source: Box<dyn PullSource>) -> AudioResult<Box<dyn Voice>>;
    /// Length of a streamable file without playing it.
    fn stream_duration(&mut self, filename: &str) -> Option<Duration>;
    /// Update the listener.
    fn set_listener(&mut self, pose: &ListenerPose);
}
