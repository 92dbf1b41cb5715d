//! One registered playing or paused sound.

use crate::backend::{AudioBackend, Placement, Voice, VoiceStatus};
use crate::{AudioError, AudioResult, SampleBuffer, VolumeModel};
use glam::Vec3;
use rtsaudio_core::{AudioEvent, AudioHandle, Category};
use std::collections::VecDeque;
use std::sync::Arc;

/// Which kind of primitive backs a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Buffered, follows the listener.
    Sample2D,
    /// Buffered, placed in the world.
    Sample3D,
    /// Streamed from a file.
    Stream,
}

/// One decoded piece of a buffered sound (attack, main or decay).
#[derive(Debug, Clone)]
pub struct Segment {
    /// File the buffer was decoded from.
    pub filename: String,
    /// Shared decoded data.
    pub buffer: Arc<SampleBuffer>,
    /// The main sample, the only segment that may loop.
    pub is_main: bool,
}

/// Buffered playback: the current voice plus the segments still to play.
pub struct SampleChannel {
    voice: Box<dyn Voice>,
    current: Segment,
    pending: VecDeque<Segment>,
    loop_main: bool,
}

impl SampleChannel {
    /// Open a voice for the first of `segments`. The main segment loops
    /// when `loop_main` is set.
    pub fn open(
        backend: &mut dyn AudioBackend,
        mut segments: VecDeque<Segment>,
        loop_main: bool,
        spatial: bool,
    ) -> AudioResult<Self> {
        let current = segments
            .pop_front()
            .ok_or_else(|| AudioError::Unresolved(String::from("<empty segment list>")))?;
        let voice =
            backend.create_sample_voice(&current.filename, Arc::clone(&current.buffer), spatial)?;
        let mut channel = Self {
            voice,
            current,
            pending: segments,
            loop_main,
        };
        channel.configure_loop();
        Ok(channel)
    }

    fn configure_loop(&mut self) {
        let looping = self.loop_main && self.current.is_main;
        self.voice.set_looping(looping);
    }

    /// Buffer currently playing.
    pub fn current(&self) -> &Segment {
        &self.current
    }

    /// Segments queued after the current one.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn start_next(&mut self, backend: &mut dyn AudioBackend, spatial: bool) -> bool {
        let Some(next) = self.pending.pop_front() else {
            return false;
        };
        match backend.create_sample_voice(&next.filename, Arc::clone(&next.buffer), spatial) {
            Ok(voice) => {
                self.voice = voice;
                self.current = next;
                self.configure_loop();
                true
            }
            Err(err) => {
                tracing::debug!(file = %next.filename, "next segment failed to open: {err}");
                false
            }
        }
    }
}

/// The primitive behind a sound, one variant per channel kind.
pub enum Channel {
    /// Listener-relative buffered sound.
    Sample2D(SampleChannel),
    /// World-placed buffered sound.
    Sample3D(SampleChannel),
    /// File or pull stream.
    Stream(Box<dyn Voice>),
}

impl Channel {
    /// Kind tag for this channel.
    pub fn kind(&self) -> ChannelKind {
        match self {
            Channel::Sample2D(_) => ChannelKind::Sample2D,
            Channel::Sample3D(_) => ChannelKind::Sample3D,
            Channel::Stream(_) => ChannelKind::Stream,
        }
    }

    fn voice(&self) -> &dyn Voice {
        match self {
            Channel::Sample2D(channel) | Channel::Sample3D(channel) => channel.voice.as_ref(),
            Channel::Stream(voice) => voice.as_ref(),
        }
    }

    fn voice_mut(&mut self) -> &mut dyn Voice {
        match self {
            Channel::Sample2D(channel) | Channel::Sample3D(channel) => channel.voice.as_mut(),
            Channel::Stream(voice) => voice.as_mut(),
        }
    }
}

/// A registered sound instance: Playing ⇄ Paused, then Finished when it is
/// dropped from the registry.
pub struct ActiveSound {
    handle: AudioHandle,
    event: AudioEvent,
    channel: Channel,
    paused: bool,
    volume_override: Option<f32>,
    volume: f32,
}

impl ActiveSound {
    /// Wrap an opened, not yet started channel.
    pub fn new(handle: AudioHandle, event: AudioEvent, channel: Channel) -> Self {
        Self {
            handle,
            event,
            channel,
            paused: false,
            volume_override: None,
            volume: 0.0,
        }
    }

    /// Apply pitch, placement and volume, then start playback.
    pub fn start(&mut self, model: &VolumeModel<'_>) {
        let pitch = self.event.pitch_shift();
        self.channel.voice_mut().set_pitch(pitch);
        if let Channel::Stream(voice) = &mut self.channel {
            voice.set_looping(self.event.is_looping());
        }
        self.apply_placement();
        self.apply_volume(model);
        self.channel.voice_mut().play();
    }

    /// Handle this sound is registered under.
    pub fn handle(&self) -> AudioHandle {
        self.handle
    }

    /// Event being played.
    pub fn event(&self) -> &AudioEvent {
        &self.event
    }

    /// Mutable event, e.g. to move a positional sound.
    pub fn event_mut(&mut self) -> &mut AudioEvent {
        &mut self.event
    }

    /// Channel kind.
    pub fn kind(&self) -> ChannelKind {
        self.channel.kind()
    }

    /// Buffered channel state, if buffered.
    pub fn sample_channel(&self) -> Option<&SampleChannel> {
        match &self.channel {
            Channel::Sample2D(channel) | Channel::Sample3D(channel) => Some(channel),
            Channel::Stream(_) => None,
        }
    }

    /// Whether this is a streamed music sound.
    pub fn is_music(&self) -> bool {
        self.kind() == ChannelKind::Stream && self.event.category() == Category::Music
    }

    /// Paused by request.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Backend status.
    pub fn status(&self) -> VoiceStatus {
        self.channel.voice().status()
    }

    /// Gain last pushed to the backend.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Fixed volume replacing the model, if set.
    pub fn volume_override(&self) -> Option<f32> {
        self.volume_override
    }

    /// Set or clear the fixed volume.
    pub fn set_volume_override(&mut self, volume: Option<f32>) {
        self.volume_override = volume;
    }

    /// Pause the backend primitive.
    pub fn pause(&mut self) {
        self.channel.voice_mut().pause();
        self.paused = true;
    }

    /// Resume the backend primitive.
    pub fn resume(&mut self) {
        self.channel.voice_mut().play();
        self.paused = false;
    }

    /// Stop the backend primitive.
    pub fn stop(&mut self) {
        self.channel.voice_mut().stop();
    }

    /// Recompute and push the gain.
    pub fn apply_volume(&mut self, model: &VolumeModel<'_>) {
        self.volume = model.volume(&self.event, self.volume_override);
        let volume = self.volume;
        self.channel.voice_mut().set_volume(volume);
    }

    /// Push the placement for the event's current position.
    pub fn apply_placement(&mut self) {
        let position = self.event.position();
        let min_distance = self
            .event
            .info()
            .map(|info| info.min_distance)
            .unwrap_or(0.0);
        let placement = match &self.channel {
            Channel::Sample3D(_) => match position {
                Some(position) => Placement::World {
                    position,
                    min_distance,
                },
                None => return,
            },
            Channel::Sample2D(_) | Channel::Stream(_) => Placement::Listener {
                offset: Vec3::ZERO,
            },
        };
        self.channel.voice_mut().set_placement(placement);
    }

    /// Check for natural completion. Starts the next queued segment when
    /// the current one ended; returns true only when nothing is left.
    pub fn poll_finished(&mut self, backend: &mut dyn AudioBackend, model: &VolumeModel<'_>) -> bool {
        if self.paused || self.status() != VoiceStatus::Stopped {
            return false;
        }
        let started = match &mut self.channel {
            Channel::Sample2D(channel) => channel.start_next(backend, false),
            Channel::Sample3D(channel) => channel.start_next(backend, true),
            Channel::Stream(_) => false,
        };
        if !started {
            return true;
        }
        self.channel.voice_mut().set_pitch(self.event.pitch_shift());
        self.apply_placement();
        self.apply_volume(model);
        self.channel.voice_mut().play();
        false
    }
}

impl std::fmt::Debug for ActiveSound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSound")
            .field("handle", &self.handle)
            .field("event", &self.event.name())
            .field("kind", &self.kind())
            .field("paused", &self.paused)
            .field("volume_override", &self.volume_override)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::{AudioSettings, SoundFileSystem};
    use rtsaudio_core::EventInfo;
    use std::time::Duration;

    struct NoFiles;

    impl SoundFileSystem for NoFiles {
        fn decode(&self, filename: &str) -> AudioResult<SampleBuffer> {
            Err(AudioError::decode(filename, "no files"))
        }
    }

    fn segment(name: &str, frames: usize, is_main: bool) -> Segment {
        Segment {
            filename: name.to_string(),
            buffer: Arc::new(SampleBuffer::new(1, 1000, vec![0; frames])),
            is_main,
        }
    }

    #[test]
    fn plays_attack_main_decay_in_order() {
        let mut backend = HeadlessBackend::new(Arc::new(NoFiles));
        let segments = VecDeque::from(vec![
            segment("in.wav", 10, false),
            segment("main.wav", 20, true),
            segment("out.wav", 10, false),
        ]);
        let channel = SampleChannel::open(&mut backend, segments, false, false).unwrap();
        let info = Arc::new(EventInfo::new("Gun", Category::Effect, "main.wav"));
        let mut sound = ActiveSound::new(AudioHandle(20), AudioEvent::with_info(info), Channel::Sample2D(channel));

        let settings = AudioSettings::default();
        let model = VolumeModel::new(&settings, Vec3::ZERO);
        sound.start(&model);
        assert_eq!(sound.sample_channel().unwrap().current().filename, "in.wav");

        let mut order = Vec::new();
        for _ in 0..10 {
            backend.advance(Duration::from_millis(10));
            if sound.poll_finished(&mut backend, &model) {
                break;
            }
            order.push(sound.sample_channel().unwrap().current().filename.clone());
        }
        order.dedup();
        assert_eq!(order, vec!["main.wav", "out.wav"]);
        assert_eq!(sound.status(), VoiceStatus::Stopped);
    }

    #[test]
    fn only_main_segment_loops() {
        let mut backend = HeadlessBackend::new(Arc::new(NoFiles));
        let segments = VecDeque::from(vec![
            segment("in.wav", 10, false),
            segment("main.wav", 20, true),
        ]);
        let channel = SampleChannel::open(&mut backend, segments, true, false).unwrap();
        let info = Arc::new(EventInfo::new("Hum", Category::Effect, "main.wav"));
        let mut sound = ActiveSound::new(AudioHandle(21), AudioEvent::with_info(info), Channel::Sample2D(channel));
        let settings = AudioSettings::default();
        let model = VolumeModel::new(&settings, Vec3::ZERO);
        sound.start(&model);
        assert!(!backend.voices_for("in.wav")[0].looping);

        backend.advance(Duration::from_millis(10));
        assert!(!sound.poll_finished(&mut backend, &model));
        backend.advance(Duration::from_millis(500));
        assert!(!sound.poll_finished(&mut backend, &model));
        assert!(backend.voices_for("main.wav")[0].looping);
        assert_eq!(sound.status(), VoiceStatus::Playing);
    }

    #[test]
    fn paused_sound_is_never_finished() {
        let mut backend = HeadlessBackend::new(Arc::new(NoFiles));
        let segments = VecDeque::from(vec![segment("main.wav", 10, true)]);
        let channel = SampleChannel::open(&mut backend, segments, false, false).unwrap();
        let info = Arc::new(EventInfo::new("Click", Category::Effect, "main.wav"));
        let mut sound = ActiveSound::new(AudioHandle(22), AudioEvent::with_info(info), Channel::Sample2D(channel));
        let settings = AudioSettings::default();
        let model = VolumeModel::new(&settings, Vec3::ZERO);
        sound.start(&model);
        sound.pause();
        backend.finish("main.wav");
        assert!(!sound.poll_finished(&mut backend, &model));
        sound.resume();
        backend.advance(Duration::from_secs(1));
        assert!(sound.poll_finished(&mut backend, &model));
    }
}
