//! Playback coordinator: the registry of active sounds and the per-tick loop.
//!
//! Requests from the simulation are queued by [`PlaybackCoordinator::submit_play`]
//! and [`PlaybackCoordinator::submit_control`] and only executed inside
//! [`PlaybackCoordinator::update`], so all state changes happen once per tick
//! on the simulation thread.

use crate::active::{ActiveSound, Channel, ChannelKind, SampleChannel, Segment};
use crate::backend::{AudioBackend, ListenerPose, VoiceStatus};
use crate::bridge::{StreamingAudioBridge, VideoDecoder};
use crate::music::MusicState;
use crate::request::{AudioRequest, Control};
use crate::{AudioError, AudioResult, AudioSettings, BufferCache, SoundFileSystem, VolumeModel};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rtsaudio_core::{
    AudioAffect, AudioEvent, AudioHandle, EventResolver, HandleAllocator, MusicPlaylist,
    TrackOrdering,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Snapshot of what the coordinator is currently playing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStats {
    /// Listener-relative buffered sounds.
    pub samples_2d: usize,
    /// World-placed buffered sounds.
    pub samples_3d: usize,
    /// Streams (music, speech).
    pub streams: usize,
    /// 2D voices the device is sized for.
    pub sample_limit_2d: u32,
    /// 3D voices the device is sized for.
    pub sample_limit_3d: u32,
    /// Streams the device is sized for.
    pub stream_limit: u32,
    /// Cache entries, expired ones included until the next purge.
    pub cached_buffers: usize,
    /// Requests waiting for the next update.
    pub queued_requests: usize,
}

impl fmt::Display for AudioStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "2D {}/{} 3D {}/{} streams {}/{} cached {} queued {}",
            self.samples_2d,
            self.sample_limit_2d,
            self.samples_3d,
            self.sample_limit_3d,
            self.streams,
            self.stream_limit,
            self.cached_buffers,
            self.queued_requests
        )
    }
}

/// Owns every active sound and turns queued requests into playback.
pub struct PlaybackCoordinator {
    backend: Box<dyn AudioBackend>,
    fs: Arc<dyn SoundFileSystem>,
    resolver: Arc<dyn EventResolver>,
    ordering: Box<dyn TrackOrdering>,
    handles: Arc<HandleAllocator>,
    cache: BufferCache,
    sounds: BTreeMap<AudioHandle, ActiveSound>,
    requests: VecDeque<AudioRequest>,
    settings: AudioSettings,
    listener: ListenerPose,
    volume_dirty: bool,
    overrides: HashMap<String, f32>,
    music: MusicState,
    ambient_paused: bool,
    rng: StdRng,
}

impl PlaybackCoordinator {
    /// Create a coordinator over a backend, a file system for sample data
    /// and a resolver for event metadata.
    pub fn new(
        backend: Box<dyn AudioBackend>,
        fs: Arc<dyn SoundFileSystem>,
        resolver: Arc<dyn EventResolver>,
    ) -> Self {
        info!(backend = backend.name(), "audio coordinator initialized");
        Self {
            backend,
            fs,
            resolver,
            ordering: Box::new(MusicPlaylist::default()),
            handles: Arc::new(HandleAllocator::new()),
            cache: BufferCache::new(),
            sounds: BTreeMap::new(),
            requests: VecDeque::new(),
            settings: AudioSettings::default(),
            listener: ListenerPose::default(),
            volume_dirty: false,
            overrides: HashMap::new(),
            music: MusicState::default(),
            ambient_paused: false,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use `settings` instead of the defaults.
    pub fn with_settings(mut self, settings: AudioSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use `ordering` to pick the next and previous music track.
    pub fn with_track_ordering(mut self, ordering: Box<dyn TrackOrdering>) -> Self {
        self.ordering = ordering;
        self
    }

    /// Share a handle allocator with the simulation.
    pub fn with_handle_allocator(mut self, handles: Arc<HandleAllocator>) -> Self {
        self.handles = handles;
        self
    }

    /// Seed variant selection and pitch/volume rolls.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Allocator used for handles.
    pub fn handle_allocator(&self) -> Arc<HandleAllocator> {
        Arc::clone(&self.handles)
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    // ----------------------------------------------------------------------
    // Request queue
    // ----------------------------------------------------------------------

    /// Queue a play request. Allocates the handle if the event has none and
    /// returns it; the sound starts on the next [`update`](Self::update).
    pub fn submit_play(&mut self, mut event: AudioEvent) -> AudioHandle {
        if !event.handle().is_allocated() {
            event.set_handle(self.handles.allocate());
        }
        let handle = event.handle();
        self.requests.push_back(AudioRequest::Play(event));
        handle
    }

    /// Queue a pause, resume or stop.
    pub fn submit_control(&mut self, handle: AudioHandle, control: Control) {
        self.requests
            .push_back(AudioRequest::Control { handle, control });
    }

    /// Requests waiting for the next update.
    pub fn queued_requests(&self) -> usize {
        self.requests.len()
    }

    /// Run one tick: execute queued requests, push the listener, refresh
    /// placement and volume, finalize finished sounds, purge the buffer
    /// cache and reconcile the current music.
    pub fn update(&mut self) {
        while let Some(request) = self.requests.pop_front() {
            match request {
                AudioRequest::Play(event) => {
                    let _ = self.play_audio_event(event);
                }
                AudioRequest::Control { handle, control } => match control {
                    Control::Pause => self.pause_audio_event(handle),
                    Control::Resume => self.resume_audio_event(handle),
                    Control::Stop => self.stop_audio_event(handle),
                },
            }
        }

        self.backend.set_listener(&self.listener);

        let model = VolumeModel::new(&self.settings, self.listener.position);
        let backend = self.backend.as_mut();
        let mut finished = Vec::new();
        for (handle, sound) in self.sounds.iter_mut() {
            if sound.event().is_positional() {
                sound.apply_placement();
                sound.apply_volume(&model);
            } else if self.volume_dirty {
                sound.apply_volume(&model);
            }
            if sound.poll_finished(&mut *backend, &model) {
                finished.push(*handle);
            }
        }
        self.volume_dirty = false;

        for handle in finished {
            if let Some(sound) = self.sounds.remove(&handle) {
                debug!(handle = %handle, event = sound.event().name(), "sound finished");
                self.finalize(sound);
            }
        }

        let purged = self.cache.purge_expired();
        if purged > 0 {
            debug!(purged, "expired buffers purged");
        }

        self.reconcile_music();
    }

    fn finalize(&mut self, sound: ActiveSound) {
        if sound.is_music() {
            self.music.on_finished(sound.event().name());
        }
    }

    fn reconcile_music(&mut self) {
        let first = self
            .sounds
            .iter()
            .find(|(_, sound)| sound.is_music())
            .map(|(handle, sound)| (*handle, sound.event().name()));
        let sounds = &self.sounds;
        self.music.reconcile(first, |handle| {
            sounds.get(&handle).is_some_and(ActiveSound::is_music)
        });
    }

    // ----------------------------------------------------------------------
    // Playback
    // ----------------------------------------------------------------------

    /// Start `event` now. Dropped requests are logged and returned as errors;
    /// no sound is registered for them.
    pub fn play_audio_event(&mut self, event: AudioEvent) -> AudioResult<AudioHandle> {
        let name = event.name().to_string();
        let result = self.start_sound(event);
        if let Err(err) = &result {
            debug!(event = %name, "play request dropped: {err}");
        }
        result
    }

    /// Allocate a handle and play immediately, bypassing the queue.
    pub fn force_play(&mut self, mut event: AudioEvent) -> AudioResult<AudioHandle> {
        if !event.handle().is_allocated() {
            event.set_handle(self.handles.allocate());
        }
        self.play_audio_event(event)
    }

    fn start_sound(&mut self, mut event: AudioEvent) -> AudioResult<AudioHandle> {
        if !event.resolve(self.resolver.as_ref()) {
            return Err(AudioError::Unresolved(event.name().to_string()));
        }
        if !event.handle().is_allocated() {
            event.set_handle(self.handles.allocate());
        }
        let handle = event.handle();
        if self.sounds.contains_key(&handle) {
            return Err(AudioError::HandleInUse(handle));
        }
        if self.does_violate_limit(&event) {
            return Err(AudioError::LimitExceeded {
                name: event.name().to_string(),
                limit: event.limit(),
            });
        }

        event.generate_filename(&mut self.rng);
        event.generate_play_info(&mut self.rng);
        let filename = event
            .filename()
            .map(str::to_string)
            .ok_or_else(|| AudioError::Unresolved(event.name().to_string()))?;

        let channel = if event.category().is_streamed() {
            Channel::Stream(self.backend.open_stream(&filename)?)
        } else {
            self.open_sample_channel(&event, &filename)?
        };

        let volume_override = self.overrides.get(event.name()).copied();
        let mut sound = ActiveSound::new(handle, event, channel);
        sound.set_volume_override(volume_override);
        sound.start(&VolumeModel::new(&self.settings, self.listener.position));
        if self.ambient_paused && sound.event().is_positional() {
            sound.pause();
        }
        debug!(
            handle = %handle,
            event = sound.event().name(),
            file = %filename,
            kind = ?sound.kind(),
            volume = sound.volume(),
            "sound started"
        );
        self.sounds.insert(handle, sound);
        Ok(handle)
    }

    fn open_sample_channel(&mut self, event: &AudioEvent, filename: &str) -> AudioResult<Channel> {
        let fs = self.fs.as_ref();
        let looping = event.is_looping();
        let mut segments = VecDeque::new();

        let main = self.cache.load_or_share(filename, fs)?;
        if let Some(attack) = event.attack_filename() {
            match self.cache.load_or_share(attack, fs) {
                Ok(buffer) => segments.push_back(Segment {
                    filename: attack.to_string(),
                    buffer,
                    is_main: false,
                }),
                Err(err) => debug!(file = attack, "attack sample skipped: {err}"),
            }
        }
        segments.push_back(Segment {
            filename: filename.to_string(),
            buffer: main,
            is_main: true,
        });
        if let Some(decay) = event.decay_filename().filter(|_| !looping) {
            match self.cache.load_or_share(decay, fs) {
                Ok(buffer) => segments.push_back(Segment {
                    filename: decay.to_string(),
                    buffer,
                    is_main: false,
                }),
                Err(err) => debug!(file = decay, "decay sample skipped: {err}"),
            }
        }

        let spatial = event.is_positional();
        let channel = SampleChannel::open(self.backend.as_mut(), segments, looping, spatial)?;
        Ok(if spatial {
            Channel::Sample3D(channel)
        } else {
            Channel::Sample2D(channel)
        })
    }

    /// Stop a sound and release it. The music sentinels stop all music.
    pub fn stop_audio_event(&mut self, handle: AudioHandle) {
        if handle.is_music_sentinel() {
            self.stop_category(AudioAffect::MUSIC);
            return;
        }
        if let Some(mut sound) = self.sounds.remove(&handle) {
            sound.stop();
            debug!(handle = %handle, event = sound.event().name(), "sound stopped");
            self.finalize(sound);
        }
    }

    /// Synchronous stop.
    pub fn kill_audio_event_immediately(&mut self, handle: AudioHandle) {
        self.stop_audio_event(handle);
    }

    /// Pause a sound, keeping it registered.
    pub fn pause_audio_event(&mut self, handle: AudioHandle) {
        if let Some(sound) = self.sounds.get_mut(&handle) {
            sound.pause();
        }
    }

    /// Resume a paused sound.
    pub fn resume_audio_event(&mut self, handle: AudioHandle) {
        if let Some(sound) = self.sounds.get_mut(&handle) {
            sound.resume();
        }
    }

    /// Move a playing sound.
    pub fn set_audio_event_position(&mut self, handle: AudioHandle, position: Option<Vec3>) {
        if let Some(sound) = self.sounds.get_mut(&handle) {
            sound.event_mut().set_position(position);
        }
    }

    fn handles_where<F>(&self, predicate: F) -> Vec<AudioHandle>
    where
        F: Fn(&ActiveSound) -> bool,
    {
        self.sounds
            .iter()
            .filter(|(_, sound)| predicate(sound))
            .map(|(handle, _)| *handle)
            .collect()
    }

    /// Stop every sound whose category matches `affect`.
    pub fn stop_category(&mut self, affect: AudioAffect) {
        let handles = self.handles_where(|sound| {
            affect.matches(sound.event().category(), sound.event().is_positional())
        });
        for handle in handles {
            self.stop_audio_event(handle);
        }
    }

    /// Pause or resume every sound whose category matches `affect`.
    pub fn pause_category(&mut self, affect: AudioAffect, pause: bool) {
        for sound in self.sounds.values_mut() {
            if !affect.matches(sound.event().category(), sound.event().is_positional()) {
                continue;
            }
            if pause && !sound.is_paused() {
                sound.pause();
            } else if !pause && sound.is_paused() {
                sound.resume();
            }
        }
    }

    /// Pause or resume every positional sound. Repeating the current state
    /// does nothing.
    pub fn pause_ambient(&mut self, pause: bool) {
        if self.ambient_paused == pause {
            return;
        }
        self.ambient_paused = pause;
        for sound in self.sounds.values_mut() {
            if !sound.event().is_positional() {
                continue;
            }
            if pause {
                sound.pause();
            } else {
                sound.resume();
            }
        }
    }

    /// Stop every sound owned by a simulation object.
    pub fn stop_all_ambients_by_object(&mut self, object_id: u32) {
        let handles = self.handles_where(|sound| sound.event().object_id() == Some(object_id));
        for handle in handles {
            self.stop_audio_event(handle);
        }
    }

    /// Stop every sound owned by a drawable.
    pub fn stop_all_ambients_by_drawable(&mut self, drawable_id: u32) {
        let handles =
            self.handles_where(|sound| sound.event().drawable_id() == Some(drawable_id));
        for handle in handles {
            self.stop_audio_event(handle);
        }
    }

    /// Stop every instance of the named event.
    pub fn remove_playing_audio(&mut self, event_name: &str) {
        let handles = self.handles_where(|sound| sound.event().name() == event_name);
        for handle in handles {
            self.stop_audio_event(handle);
        }
    }

    /// Stop everything and forget the current music.
    pub fn reset(&mut self) {
        let handles: Vec<_> = self.sounds.keys().copied().collect();
        for handle in handles {
            self.stop_audio_event(handle);
        }
        self.requests.clear();
        self.music.clear();
        self.ambient_paused = false;
        self.cache.purge_expired();
    }

    // ----------------------------------------------------------------------
    // Volume
    // ----------------------------------------------------------------------

    /// Fix the volume of every playing instance of `event_name`, or restore
    /// the computed volume when `volume` is negative. Applied on the next
    /// update.
    pub fn adjust_volume_of_playing_audio(&mut self, event_name: &str, volume: f32) {
        let volume_override = (volume >= 0.0).then_some(volume);
        for sound in self.sounds.values_mut() {
            if sound.event().name() == event_name {
                sound.set_volume_override(volume_override);
            }
        }
        self.volume_dirty = true;
    }

    /// Persistent per-name override for current and future plays. A negative
    /// volume clears it.
    pub fn set_event_volume_override(&mut self, event_name: &str, volume: f32) {
        if volume >= 0.0 {
            self.overrides.insert(event_name.to_string(), volume);
        } else {
            self.overrides.remove(event_name);
        }
        self.adjust_volume_of_playing_audio(event_name, volume);
    }

    /// Stop every sound whose persistent override silences it.
    pub fn remove_all_disabled_audio(&mut self) {
        let overrides = &self.overrides;
        let handles = self.handles_where(|sound| {
            overrides
                .get(sound.event().name())
                .is_some_and(|volume| *volume <= 0.0)
        });
        for handle in handles {
            self.stop_audio_event(handle);
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Replace the settings; every volume is recomputed on the next update.
    pub fn update_settings(&mut self, settings: AudioSettings) {
        self.settings = settings;
        self.volume_dirty = true;
    }

    /// Set master volume.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.settings.set_master(volume);
        self.volume_dirty = true;
    }

    /// Set music volume.
    pub fn set_music_volume(&mut self, volume: f32) {
        self.settings.set_music(volume);
        self.volume_dirty = true;
    }

    /// Set speech volume.
    pub fn set_speech_volume(&mut self, volume: f32) {
        self.settings.set_speech(volume);
        self.volume_dirty = true;
    }

    /// Set 2D effect volume.
    pub fn set_sound_volume(&mut self, volume: f32) {
        self.settings.set_sound(volume);
        self.volume_dirty = true;
    }

    /// Set positional effect volume.
    pub fn set_sound_3d_volume(&mut self, volume: f32) {
        self.settings.set_sound_3d(volume);
        self.volume_dirty = true;
    }

    /// Toggle mute.
    pub fn toggle_mute(&mut self) {
        self.settings.toggle_mute();
        self.volume_dirty = true;
    }

    /// Listener position and facing; up is +Z.
    pub fn set_listener(&mut self, position: Vec3, forward: Vec3) {
        self.listener = ListenerPose {
            position,
            forward,
            up: Vec3::Z,
        };
    }

    /// Current listener pose.
    pub fn listener(&self) -> ListenerPose {
        self.listener
    }

    // ----------------------------------------------------------------------
    // Music
    // ----------------------------------------------------------------------

    /// Stop the current music and start the following track right away.
    pub fn next_music_track(&mut self) {
        let next = self.ordering.next_track(self.music.track_name());
        self.change_track(next);
    }

    /// Stop the current music and start the preceding track right away.
    pub fn prev_music_track(&mut self) {
        let prev = self.ordering.prev_track(self.music.track_name());
        self.change_track(prev);
    }

    fn change_track(&mut self, track: Option<String>) {
        let Some(track) = track.filter(|name| !name.is_empty()) else {
            return;
        };
        self.stop_audio_event(AudioHandle::STOP_THE_MUSIC);
        if let Ok(handle) = self.force_play(AudioEvent::new(track.clone())) {
            info!(track = %track, handle = %handle, "music track changed");
        }
    }

    /// Whether any music stream is audibly playing.
    pub fn is_music_playing(&self) -> bool {
        self.sounds
            .values()
            .any(|sound| sound.is_music() && sound.status() == VoiceStatus::Playing)
    }

    /// True when `name` is the tracked music, it has ended, and no further
    /// repeats are requested.
    pub fn has_music_track_completed(&self, name: &str, repeat_count: i32) -> bool {
        self.music.has_track_completed(name, repeat_count)
    }

    /// Current or most recently finished music track.
    pub fn music_track_name(&self) -> &str {
        self.music.track_name()
    }

    // ----------------------------------------------------------------------
    // Queries
    // ----------------------------------------------------------------------

    /// Registered sound for `handle`.
    pub fn sound(&self, handle: AudioHandle) -> Option<&ActiveSound> {
        self.sounds.get(&handle)
    }

    /// Every registered sound in handle order.
    pub fn sounds(&self) -> impl Iterator<Item = &ActiveSound> {
        self.sounds.values()
    }

    /// Number of registered sounds.
    pub fn active_sound_count(&self) -> usize {
        self.sounds.len()
    }

    /// Whether any instance of `event_name` is registered.
    pub fn is_playing_already(&self, event_name: &str) -> bool {
        self.sounds
            .values()
            .any(|sound| sound.event().name() == event_name)
    }

    /// Whether `object_id` has a voice line registered.
    pub fn is_object_playing_voice(&self, object_id: u32) -> bool {
        self.sounds.values().any(|sound| {
            sound.event().object_id() == Some(object_id)
                && sound.event().info().is_some_and(|info| info.voice)
        })
    }

    /// Whether starting `event` now would exceed its concurrency limit.
    pub fn does_violate_limit(&self, event: &AudioEvent) -> bool {
        let limit = event
            .info()
            .map(|info| info.limit)
            .or_else(|| self.resolver.resolve(event.name()).map(|info| info.limit))
            .unwrap_or(0);
        if limit == 0 {
            return false;
        }
        let playing = self
            .sounds
            .values()
            .filter(|sound| sound.event().name() == event.name())
            .count();
        playing >= limit as usize
    }

    /// 2D voices the device is sized for.
    pub fn num_2d_samples(&self) -> u32 {
        self.settings.sample_count_2d
    }

    /// 3D voices the device is sized for.
    pub fn num_3d_samples(&self) -> u32 {
        self.settings.sample_count_3d
    }

    /// Streams the device is sized for.
    pub fn num_streams(&self) -> u32 {
        self.settings.stream_count
    }

    /// Counts by channel kind plus cache and queue sizes.
    pub fn stats(&self) -> AudioStats {
        let mut stats = AudioStats {
            sample_limit_2d: self.num_2d_samples(),
            sample_limit_3d: self.num_3d_samples(),
            stream_limit: self.num_streams(),
            cached_buffers: self.cache.len(),
            queued_requests: self.requests.len(),
            ..AudioStats::default()
        };
        for sound in self.sounds.values() {
            match sound.kind() {
                ChannelKind::Sample2D => stats.samples_2d += 1,
                ChannelKind::Sample3D => stats.samples_3d += 1,
                ChannelKind::Stream => stats.streams += 1,
            }
        }
        stats
    }

    /// Shared buffer cache.
    pub fn cache(&self) -> &BufferCache {
        &self.cache
    }

    /// Length of a sound file in milliseconds: the live cached buffer, then
    /// a temporary decode that is not cached, then the backend's stream
    /// probe. Zero when nothing can open it.
    pub fn get_file_length_ms(&mut self, filename: &str) -> f32 {
        if filename.is_empty() {
            return 0.0;
        }
        if let Some(buffer) = self.cache.peek(filename) {
            return buffer.duration_ms();
        }
        match self.fs.decode(filename) {
            Ok(buffer) => buffer.duration_ms(),
            Err(err) => {
                debug!(file = filename, "length probe decode failed: {err}");
                self.backend
                    .stream_duration(filename)
                    .map(|duration| duration.as_secs_f32() * 1000.0)
                    .unwrap_or(0.0)
            }
        }
    }

    /// Attach a video's audio track through this coordinator's backend.
    pub fn attach_video_bridge(
        &mut self,
        video: &mut dyn VideoDecoder,
    ) -> AudioResult<StreamingAudioBridge> {
        StreamingAudioBridge::attach(video, self.backend.as_mut())
    }
}

impl Drop for PlaybackCoordinator {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::SampleBuffer;
    use rtsaudio_core::{Category, EventInfo, EventRegistry};
    use std::time::Duration;

    struct Tones;

    impl SoundFileSystem for Tones {
        fn decode(&self, filename: &str) -> AudioResult<SampleBuffer> {
            if filename.starts_with("missing") {
                return Err(AudioError::decode(filename, "not found"));
            }
            Ok(SampleBuffer::new(1, 1000, vec![0; 100]))
        }
    }

    fn registry() -> EventRegistry {
        let mut registry = EventRegistry::new();
        registry.insert(EventInfo {
            limit: 1,
            volume: 0.8,
            ..EventInfo::new("Wind", Category::Effect, "wind.wav")
        });
        registry.insert(EventInfo::new("Click", Category::Effect, "click.wav"));
        registry.insert(EventInfo::new("Broken", Category::Effect, "missing.wav"));
        registry.insert(EventInfo::new("Theme", Category::Music, "theme.wav"));
        registry
    }

    fn coordinator() -> (PlaybackCoordinator, HeadlessBackend) {
        let fs: Arc<dyn SoundFileSystem> = Arc::new(Tones);
        let backend = HeadlessBackend::new(Arc::clone(&fs));
        let coordinator =
            PlaybackCoordinator::new(Box::new(backend.clone()), fs, Arc::new(registry()))
                .with_seed(7);
        (coordinator, backend)
    }

    #[test]
    fn play_requests_wait_for_update() {
        let (mut audio, _backend) = coordinator();
        let handle = audio.submit_play(AudioEvent::new("Click"));
        assert!(handle.is_allocated());
        assert_eq!(audio.active_sound_count(), 0);
        audio.update();
        assert!(audio.sound(handle).is_some());
    }

    #[test]
    fn limit_rejects_second_play_in_same_tick() {
        let (mut audio, _backend) = coordinator();
        audio.submit_play(AudioEvent::new("Wind"));
        audio.submit_play(AudioEvent::new("Wind"));
        audio.update();
        assert_eq!(audio.active_sound_count(), 1);
    }

    #[test]
    fn failed_opens_register_nothing() {
        let (mut audio, _backend) = coordinator();
        assert!(matches!(
            audio.force_play(AudioEvent::new("Nope")),
            Err(AudioError::Unresolved(_))
        ));
        assert!(audio.force_play(AudioEvent::new("Broken")).is_err());
        assert_eq!(audio.active_sound_count(), 0);
        assert!(audio.cache().is_empty());
    }

    #[test]
    fn natural_completion_finalizes_and_purges() {
        let (mut audio, backend) = coordinator();
        audio.submit_play(AudioEvent::new("Click"));
        audio.update();
        assert_eq!(audio.cache().len(), 1);
        backend.advance(Duration::from_millis(200));
        audio.update();
        assert_eq!(audio.active_sound_count(), 0);
        assert!(audio.cache().is_empty());
    }

    #[test]
    fn paused_sound_survives_backend_stop() {
        let (mut audio, backend) = coordinator();
        let handle = audio.submit_play(AudioEvent::new("Click"));
        audio.submit_control(handle, Control::Pause);
        audio.update();
        backend.advance(Duration::from_secs(5));
        audio.update();
        assert!(audio.sound(handle).is_some_and(ActiveSound::is_paused));
        audio.submit_control(handle, Control::Stop);
        audio.update();
        assert!(audio.sound(handle).is_none());
    }

    #[test]
    fn controls_on_unknown_handles_are_ignored() {
        let (mut audio, _backend) = coordinator();
        audio.submit_control(AudioHandle(999), Control::Stop);
        audio.submit_control(AudioHandle(999), Control::Resume);
        audio.update();
        assert_eq!(audio.active_sound_count(), 0);
    }

    #[test]
    fn stats_count_channel_kinds() {
        let (mut audio, _backend) = coordinator();
        audio.submit_play(AudioEvent::new("Click"));
        audio.submit_play(AudioEvent::new("Theme"));
        audio.update();
        let stats = audio.stats();
        assert_eq!(stats.samples_2d, 1);
        assert_eq!(stats.streams, 1);
        assert!(stats.to_string().starts_with("2D 1/32 3D 0/32 streams 1/8"));
    }

    #[test]
    fn file_length_uses_cache_then_decode() {
        let (mut audio, _backend) = coordinator();
        approx::assert_relative_eq!(audio.get_file_length_ms("click.wav"), 100.0);
        assert!(audio.cache().is_empty());
        assert_eq!(audio.get_file_length_ms("missing.wav"), 0.0);
        assert_eq!(audio.get_file_length_ms(""), 0.0);
    }
}
