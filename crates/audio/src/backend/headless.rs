//! Deterministic backend that simulates playback progress instead of
//! producing sound. Time only moves when [`HeadlessBackend::advance`] is
//! called, so headless runs and tests see reproducible completion.

use super::{AudioBackend, ListenerPose, Placement, PullSource, Voice, VoiceStatus};
use crate::{AudioError, AudioResult, SampleBuffer, SoundFileSystem};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct VoiceCore {
    id: u64,
    label: String,
    spatial: bool,
    stream: bool,
    frames_total: u64,
    sample_rate: u32,
    cursor: f64,
    status: VoiceStatus,
    looping: bool,
    loops: u32,
    volume: f32,
    pitch: f32,
    placement: Placement,
}

impl VoiceCore {
    fn advance(&mut self, dt: Duration) {
        if self.status != VoiceStatus::Playing {
            return;
        }
        if self.frames_total == 0 {
            self.status = VoiceStatus::Stopped;
            return;
        }
        let total = self.frames_total as f64;
        self.cursor += dt.as_secs_f64() * f64::from(self.sample_rate) * f64::from(self.pitch);
        if self.cursor < total {
            return;
        }
        if self.looping {
            self.loops += (self.cursor / total) as u32;
            self.cursor %= total;
        } else {
            self.cursor = total;
            self.status = VoiceStatus::Stopped;
        }
    }
}

/// Point-in-time view of a simulated voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSnapshot {
    /// Backend-unique id, in creation order.
    pub id: u64,
    /// Filename the voice was created for.
    pub label: String,
    /// World-placed voice.
    pub spatial: bool,
    /// File stream rather than a buffered sample.
    pub stream: bool,
    /// Current state.
    pub status: VoiceStatus,
    /// Last gain applied.
    pub volume: f32,
    /// Last pitch applied.
    pub pitch: f32,
    /// Looping flag.
    pub looping: bool,
    /// Completed loop iterations.
    pub loops: u32,
    /// Last placement applied.
    pub placement: Placement,
}

#[derive(Debug, Default)]
struct PullShared {
    started: AtomicBool,
    paused: AtomicBool,
    stop_requested: AtomicBool,
    finished: AtomicBool,
    consumed: AtomicU64,
    chunks: AtomicU64,
}

/// Observer for a simulated pull stream and its consumer thread.
#[derive(Debug, Clone)]
pub struct PullProbe(Arc<PullShared>);

impl PullProbe {
    /// Samples pulled so far.
    pub fn samples_consumed(&self) -> u64 {
        self.0.consumed.load(Ordering::Acquire)
    }

    /// Chunks pulled so far.
    pub fn chunks_consumed(&self) -> u64 {
        self.0.chunks.load(Ordering::Acquire)
    }

    /// Whether the consumer thread observed end of stream.
    pub fn is_finished(&self) -> bool {
        self.0.finished.load(Ordering::Acquire)
    }

    /// Poll until the consumer thread exits or `timeout` elapses.
    pub fn wait_finished(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Poll until at least `samples` were consumed or `timeout` elapses.
    pub fn wait_consumed(&self, samples: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.samples_consumed() < samples {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    listener: ListenerPose,
    voices: Vec<Weak<Mutex<VoiceCore>>>,
    pulls: Vec<PullProbe>,
    next_id: u64,
}

impl HeadlessState {
    fn register(&mut self, mut core: VoiceCore) -> Arc<Mutex<VoiceCore>> {
        core.id = self.next_id;
        self.next_id += 1;
        let core = Arc::new(Mutex::new(core));
        self.voices.retain(|voice| voice.strong_count() > 0);
        self.voices.push(Arc::downgrade(&core));
        core
    }
}

/// Backend that advances simulated voices on demand.
///
/// Clones share state, so a test or driver can keep a clone to move time
/// forward and inspect voices while the coordinator owns the original.
#[derive(Clone)]
pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
    fs: Arc<dyn SoundFileSystem>,
}

impl HeadlessBackend {
    /// Create a backend that probes streams through `fs`.
    pub fn new(fs: Arc<dyn SoundFileSystem>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState::default())),
            fs,
        }
    }

    /// Move simulated playback forward by `dt` for every live voice.
    pub fn advance(&self, dt: Duration) {
        let mut state = self.state.lock();
        state.voices.retain(|voice| voice.strong_count() > 0);
        for voice in state.voices.iter().filter_map(Weak::upgrade) {
            voice.lock().advance(dt);
        }
    }

    /// Force every live voice created for `label` to report completion.
    pub fn finish(&self, label: &str) -> usize {
        let state = self.state.lock();
        let mut finished = 0;
        for voice in state.voices.iter().filter_map(Weak::upgrade) {
            let mut core = voice.lock();
            if core.label == label && core.status == VoiceStatus::Playing {
                core.status = VoiceStatus::Stopped;
                finished += 1;
            }
        }
        finished
    }

    /// Snapshots of every live voice, in creation order.
    pub fn voices(&self) -> Vec<VoiceSnapshot> {
        let state = self.state.lock();
        state
            .voices
            .iter()
            .filter_map(Weak::upgrade)
            .map(|voice| {
                let core = voice.lock();
                VoiceSnapshot {
                    id: core.id,
                    label: core.label.clone(),
                    spatial: core.spatial,
                    stream: core.stream,
                    status: core.status,
                    volume: core.volume,
                    pitch: core.pitch,
                    looping: core.looping,
                    loops: core.loops,
                    placement: core.placement,
                }
            })
            .collect()
    }

    /// Snapshots of live voices created for `label`.
    pub fn voices_for(&self, label: &str) -> Vec<VoiceSnapshot> {
        self.voices()
            .into_iter()
            .filter(|voice| voice.label == label)
            .collect()
    }

    /// Probes for pull streams that are still open, plus any finished since
    /// the last one was opened.
    pub fn pull_streams(&self) -> Vec<PullProbe> {
        self.state.lock().pulls.clone()
    }

    /// Last listener pose pushed by the coordinator.
    pub fn listener(&self) -> ListenerPose {
        self.state.lock().listener
    }

    fn open_voice(&self, label: &str, buffer: &SampleBuffer, spatial: bool, stream: bool) -> HeadlessVoice {
        let core = VoiceCore {
            id: 0,
            label: label.to_string(),
            spatial,
            stream,
            frames_total: buffer.frames(),
            sample_rate: buffer.sample_rate(),
            cursor: 0.0,
            status: VoiceStatus::Stopped,
            looping: false,
            loops: 0,
            volume: 1.0,
            pitch: 1.0,
            placement: Placement::default(),
        };
        HeadlessVoice {
            core: self.state.lock().register(core),
        }
    }
}

impl AudioBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_sample_voice(
        &mut self,
        filename: &str,
        buffer: Arc<SampleBuffer>,
        spatial: bool,
    ) -> AudioResult<Box<dyn Voice>> {
        Ok(Box::new(self.open_voice(filename, &buffer, spatial, false)))
    }

    fn open_stream(&mut self, filename: &str) -> AudioResult<Box<dyn Voice>> {
        let buffer = self
            .fs
            .decode(filename)
            .map_err(|err| AudioError::backend_open(filename, err))?;
        Ok(Box::new(self.open_voice(filename, &buffer, false, true)))
    }

    fn open_pull_stream(&mut self, source: Box<dyn PullSource>) -> AudioResult<Box<dyn Voice>> {
        if source.channels() == 0 || source.sample_rate() == 0 {
            return Err(AudioError::InvalidStreamFormat {
                channels: source.channels(),
                sample_rate: source.sample_rate(),
            });
        }
        let shared = Arc::new(PullShared::default());
        let mut state = self.state.lock();
        state.pulls.retain(|probe| !probe.is_finished());
        state.pulls.push(PullProbe(Arc::clone(&shared)));
        drop(state);
        Ok(Box::new(HeadlessPullVoice {
            shared,
            source: Some(source),
            thread: None,
        }))
    }

    fn stream_duration(&mut self, filename: &str) -> Option<Duration> {
        self.fs.decode(filename).ok().map(|buffer| buffer.duration())
    }

    fn set_listener(&mut self, pose: &ListenerPose) {
        self.state.lock().listener = *pose;
    }
}

struct HeadlessVoice {
    core: Arc<Mutex<VoiceCore>>,
}

impl Voice for HeadlessVoice {
    fn play(&mut self) {
        self.core.lock().status = VoiceStatus::Playing;
    }

    fn pause(&mut self) {
        let mut core = self.core.lock();
        if core.status == VoiceStatus::Playing {
            core.status = VoiceStatus::Paused;
        }
    }

    fn stop(&mut self) {
        let mut core = self.core.lock();
        core.status = VoiceStatus::Stopped;
        core.cursor = 0.0;
    }

    fn status(&self) -> VoiceStatus {
        self.core.lock().status
    }

    fn set_volume(&mut self, volume: f32) {
        self.core.lock().volume = volume;
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.core.lock().pitch = pitch;
    }

    fn set_looping(&mut self, looping: bool) {
        self.core.lock().looping = looping;
    }

    fn set_placement(&mut self, placement: Placement) {
        self.core.lock().placement = placement;
    }
}

/// Pull stream whose consumer runs on a dedicated thread, standing in for
/// a platform audio thread.
struct HeadlessPullVoice {
    shared: Arc<PullShared>,
    source: Option<Box<dyn PullSource>>,
    thread: Option<JoinHandle<()>>,
}

impl HeadlessPullVoice {
    fn spawn(&mut self, mut source: Box<dyn PullSource>) {
        let shared = Arc::clone(&self.shared);
        shared.started.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name("headless-pull".into())
            .spawn(move || {
                while !shared.stop_requested.load(Ordering::Acquire) {
                    match source.pull() {
                        Some(chunk) => {
                            shared
                                .consumed
                                .fetch_add(chunk.len() as u64, Ordering::AcqRel);
                            shared.chunks.fetch_add(1, Ordering::AcqRel);
                        }
                        None => break,
                    }
                }
                shared.finished.store(true, Ordering::Release);
                debug!("headless pull stream finished");
            });
        match spawned {
            Ok(handle) => self.thread = Some(handle),
            Err(err) => {
                tracing::warn!("failed to spawn pull thread: {err}");
                self.shared.finished.store(true, Ordering::Release);
            }
        }
    }
}

impl Voice for HeadlessPullVoice {
    fn play(&mut self) {
        self.shared.paused.store(false, Ordering::Release);
        if let Some(source) = self.source.take() {
            self.spawn(source);
        }
    }

    fn pause(&mut self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    fn stop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::Release);
    }

    fn status(&self) -> VoiceStatus {
        if !self.shared.started.load(Ordering::Acquire)
            || self.shared.finished.load(Ordering::Acquire)
            || self.shared.stop_requested.load(Ordering::Acquire)
        {
            VoiceStatus::Stopped
        } else if self.shared.paused.load(Ordering::Acquire) {
            VoiceStatus::Paused
        } else {
            VoiceStatus::Playing
        }
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn set_pitch(&mut self, _pitch: f32) {}

    fn set_looping(&mut self, _looping: bool) {}

    fn set_placement(&mut self, _placement: Placement) {}
}

impl Drop for HeadlessPullVoice {
    fn drop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::Release);
        if self.thread.is_none() {
            // Never started, so no consumer will report the end.
            self.shared.finished.store(true, Ordering::Release);
        }
        // A consumer still blocked in `pull` exits once its source shuts down.
        if let Some(handle) = self.thread.take() {
            if self.shared.finished.load(Ordering::Acquire) {
                let _ = handle.join();
            }
        }
    }
}
