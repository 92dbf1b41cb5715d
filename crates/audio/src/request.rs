//! Requests queued by the simulation and executed on the next update.

use rtsaudio_core::{AudioEvent, AudioHandle};
use serde::{Deserialize, Serialize};

/// Control applied to an already playing sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    /// Keep the sound registered but silent.
    Pause,
    /// Continue a paused sound.
    Resume,
    /// Stop and release the sound.
    Stop,
}

/// One queued request.
#[derive(Debug, Clone)]
pub enum AudioRequest {
    /// Start playing an event.
    Play(AudioEvent),
    /// Change the state of a playing sound.
    Control {
        /// Target sound.
        handle: AudioHandle,
        /// What to do with it.
        control: Control,
    },
}
