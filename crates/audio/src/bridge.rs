//! Feeds decoded video-track audio into a pull stream.
//!
//! The video decoder pushes chunks from its own step (the producer) and the
//! backend's audio thread pulls them (the consumer). Both sides meet in a
//! bounded queue guarded by one lock; the consumer waits on a condition
//! variable until there is data or the bridge stopped running.

use crate::backend::{AudioBackend, PullSource, Voice};
use crate::{AudioError, AudioResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Chunks kept before the oldest pending one is dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Channel layout of a decoded audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackFormat {
    /// Interleaved channels.
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
}

impl TrackFormat {
    fn is_valid(self) -> bool {
        self.channels > 0 && self.sample_rate > 0
    }
}

/// An opened audio track of a video that yields decoded PCM chunks.
pub trait DecodedAudioTrack {
    /// Layout of every chunk.
    fn format(&self) -> TrackFormat;
    /// Next chunk decoded since the last call, if any.
    fn pop_decoded(&mut self) -> Option<Vec<i16>>;
}

/// Video handle that exposes its audio tracks.
pub trait VideoDecoder {
    /// Number of audio tracks.
    fn audio_track_count(&self) -> usize;
    /// Open track `index` for decoded output. `None` when unusable.
    fn open_audio_track(&mut self, index: usize) -> Option<Box<dyn DecodedAudioTrack>>;
}

#[derive(Debug)]
struct QueueState {
    pending: VecDeque<Vec<i16>>,
    running: bool,
    capacity: usize,
    pushed: u64,
    dropped: u64,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    ready: Condvar,
    format: TrackFormat,
}

impl Shared {
    fn push(&self, chunk: Vec<i16>) -> bool {
        if chunk.is_empty() {
            return true;
        }
        let mut state = self.state.lock();
        if !state.running {
            return false;
        }
        if state.pending.len() >= state.capacity {
            state.pending.pop_front();
            state.dropped += 1;
            debug!(dropped = state.dropped, "bridge queue full, dropped oldest chunk");
        }
        state.pending.push_back(chunk);
        state.pushed += 1;
        drop(state);
        self.ready.notify_one();
        true
    }

    fn flush(&self) -> usize {
        let mut state = self.state.lock();
        let flushed = state.pending.len();
        state.pending.clear();
        flushed
    }

    fn shut_down(&self) {
        self.state.lock().running = false;
        self.ready.notify_all();
    }
}

/// Cloneable producer handle for a decoder thread.
#[derive(Debug, Clone)]
pub struct BridgeProducer {
    shared: Arc<Shared>,
}

impl BridgeProducer {
    /// Queue one chunk and wake a waiting consumer. Returns false once the
    /// bridge has stopped.
    pub fn push(&self, chunk: Vec<i16>) -> bool {
        self.shared.push(chunk)
    }

    /// Discard everything still queued (decoder flush or drain).
    pub fn flush(&self) -> usize {
        self.shared.flush()
    }

    /// Whether the bridge still accepts chunks.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }
}

/// Consumer side handed to the backend as a [`PullSource`].
#[derive(Debug)]
pub struct BridgeConsumer {
    shared: Arc<Shared>,
    current: Option<Vec<i16>>,
}

impl PullSource for BridgeConsumer {
    fn channels(&self) -> u16 {
        self.shared.format.channels
    }

    fn sample_rate(&self) -> u32 {
        self.shared.format.sample_rate
    }

    fn pull(&mut self) -> Option<&[i16]> {
        let mut state = self.shared.state.lock();
        while state.pending.is_empty() && state.running {
            self.shared.ready.wait(&mut state);
        }
        let next = state.pending.pop_front();
        drop(state);
        self.current = next;
        self.current.as_deref()
    }

    fn seek(&mut self) {
        self.shared.state.lock().pending.clear();
        self.current = None;
    }
}

/// Create a connected producer/consumer pair without a video or backend.
pub fn bridge_queue(format: TrackFormat, capacity: usize) -> (BridgeProducer, BridgeConsumer) {
    let shared = Arc::new(Shared {
        state: Mutex::new(QueueState {
            pending: VecDeque::new(),
            running: true,
            capacity: capacity.max(1),
            pushed: 0,
            dropped: 0,
        }),
        ready: Condvar::new(),
        format,
    });
    (
        BridgeProducer {
            shared: Arc::clone(&shared),
        },
        BridgeConsumer {
            shared,
            current: None,
        },
    )
}

/// One attached video audio track and the stream it plays through.
pub struct StreamingAudioBridge {
    shared: Arc<Shared>,
    track: Option<Box<dyn DecodedAudioTrack>>,
    voice: Option<Box<dyn Voice>>,
}

impl StreamingAudioBridge {
    /// Attach the first usable audio track of `video` with the default
    /// queue capacity.
    pub fn attach(video: &mut dyn VideoDecoder, backend: &mut dyn AudioBackend) -> AudioResult<Self> {
        Self::attach_with_capacity(video, backend, DEFAULT_QUEUE_CAPACITY)
    }

    /// Attach with an explicit queue capacity.
    pub fn attach_with_capacity(
        video: &mut dyn VideoDecoder,
        backend: &mut dyn AudioBackend,
        capacity: usize,
    ) -> AudioResult<Self> {
        let track = (0..video.audio_track_count())
            .find_map(|index| video.open_audio_track(index))
            .ok_or(AudioError::NoAudioTrack)?;
        let format = track.format();
        if !format.is_valid() {
            return Err(AudioError::InvalidStreamFormat {
                channels: format.channels,
                sample_rate: format.sample_rate,
            });
        }

        let (producer, consumer) = bridge_queue(format, capacity);
        let mut voice = backend.open_pull_stream(Box::new(consumer))?;
        voice.play();
        info!(
            channels = format.channels,
            sample_rate = format.sample_rate,
            backend = backend.name(),
            "video audio attached"
        );
        Ok(Self {
            shared: producer.shared,
            track: Some(track),
            voice: Some(voice),
        })
    }

    /// Move every newly decoded chunk from the track into the queue.
    /// Returns how many chunks were queued.
    pub fn on_frame_decoded(&mut self) -> usize {
        let Some(track) = self.track.as_mut() else {
            return 0;
        };
        let mut queued = 0;
        while let Some(chunk) = track.pop_decoded() {
            if !self.shared.push(chunk) {
                break;
            }
            queued += 1;
        }
        queued
    }

    /// Producer handle for pushing from another thread.
    pub fn producer(&self) -> BridgeProducer {
        BridgeProducer {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Pause the stream.
    pub fn pause(&mut self) {
        if let Some(voice) = self.voice.as_mut() {
            voice.pause();
        }
    }

    /// Resume the stream.
    pub fn resume(&mut self) {
        if let Some(voice) = self.voice.as_mut() {
            voice.play();
        }
    }

    /// Discard queued chunks.
    pub fn flush(&self) -> usize {
        self.shared.flush()
    }

    /// Stop accepting chunks and wake every waiter. The consumer drains what
    /// is queued, then sees end of stream.
    pub fn stop(&self) {
        self.shared.shut_down();
    }

    /// Stop, then release the track and the stream.
    pub fn detach(&mut self) {
        self.stop();
        self.track = None;
        if let Some(mut voice) = self.voice.take() {
            voice.stop();
            debug!("video audio detached");
        }
    }

    /// Track layout.
    pub fn format(&self) -> TrackFormat {
        self.shared.format
    }

    /// Whether the bridge still accepts chunks.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Whether a track and stream are still held.
    pub fn is_attached(&self) -> bool {
        self.voice.is_some()
    }

    /// Chunks waiting for the consumer.
    pub fn pending_chunks(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Chunks accepted so far.
    pub fn pushed_chunks(&self) -> u64 {
        self.shared.state.lock().pushed
    }

    /// Chunks dropped on overflow.
    pub fn dropped_chunks(&self) -> u64 {
        self.shared.state.lock().dropped
    }
}

impl Drop for StreamingAudioBridge {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for StreamingAudioBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingAudioBridge")
            .field("format", &self.shared.format)
            .field("attached", &self.is_attached())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
