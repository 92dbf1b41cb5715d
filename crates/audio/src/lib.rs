//! Audio playback and resource management for the RTS client.
//!
//! Turns "play this event" requests from the simulation into concurrently
//! playing sounds, shares decoded sample data between sounds playing the
//! same file, computes spatialized volume every tick, and bridges decoded
//! video audio into a pull stream.
//!
//! # Architecture
//!
//! - [`PlaybackCoordinator`] - Request queue, active sound registry and the per-tick update
//! - [`ActiveSound`] - One playing or paused sound over a closed [`Channel`] variant
//! - [`VolumeModel`] - Pure gain computation from settings and listener position
//! - [`BufferCache`] - Usage-driven sharing of decoded samples
//! - [`StreamingAudioBridge`] - Producer/consumer queue between a video decoder and the audio thread
//! - [`backend`] - Platform sound primitives (headless, and rodio behind `rodio_backend`)
//!
//! # Example
//!
//! ```ignore
//! let mut audio = PlaybackCoordinator::new(backend, fs, Arc::new(registry));
//! let handle = audio.submit_play(AudioEvent::new("Explosion").at(position));
//! audio.update();
//! ```

#![warn(missing_docs)]

mod active;
pub mod backend;
mod bridge;
mod cache;
mod coordinator;
mod error;
mod fs;
mod music;
mod request;
mod sample;
mod settings;
mod volume;

pub use active::{ActiveSound, Channel, ChannelKind, SampleChannel, Segment};
pub use bridge::{
    bridge_queue, BridgeConsumer, BridgeProducer, DecodedAudioTrack, StreamingAudioBridge,
    TrackFormat, VideoDecoder, DEFAULT_QUEUE_CAPACITY,
};
pub use cache::BufferCache;
pub use coordinator::{AudioStats, PlaybackCoordinator};
pub use error::{AudioError, AudioResult};
pub use fs::{decode_wav, DiskFileSystem, SoundFileSystem};
pub use music::MusicState;
pub use request::{AudioRequest, Control};
pub use sample::SampleBuffer;
pub use settings::AudioSettings;
pub use volume::{distance_factor, VolumeModel};
