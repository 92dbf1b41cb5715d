use crate::command_script::CommandScriptPlayer;
use crate::commands::{help_lines, AudioCommand, CommandOutput, SoundRef, VolumeBucket};
use crate::config::AudioConfig;
use anyhow::{Context, Result};
use rtsaudio_audio::backend::{AudioBackend, HeadlessBackend};
use rtsaudio_audio::{AudioStats, Control, DiskFileSystem, PlaybackCoordinator, SoundFileSystem};
use rtsaudio_core::{AudioAffect, AudioEvent, AudioHandle, EventRegistry, SimTick};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_MAX_TICKS: u64 = 600;

pub struct HeadlessConfig {
    pub config: AudioConfig,
    pub command_script: Option<PathBuf>,
    pub max_ticks: Option<u64>,
    pub exit_when_script_finished: bool,
    /// Play through the platform device instead of simulating time.
    pub realtime: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub commands: usize,
    pub failed_commands: usize,
    pub stats: AudioStats,
}

/// A coordinator plus the bookkeeping a command script needs: labels for
/// handles and a simulated clock.
pub struct AudioSession {
    audio: PlaybackCoordinator,
    clock: Option<HeadlessBackend>,
    labels: HashMap<String, AudioHandle>,
    tick: SimTick,
    tick_len: Duration,
}

impl AudioSession {
    /// `clock` is advanced by `tick_len` after every update when set.
    pub fn new(audio: PlaybackCoordinator, clock: Option<HeadlessBackend>, tick_len: Duration) -> Self {
        Self {
            audio,
            clock,
            labels: HashMap::new(),
            tick: SimTick::ZERO,
            tick_len,
        }
    }

    pub fn audio(&self) -> &PlaybackCoordinator {
        &self.audio
    }

    pub fn tick(&self) -> SimTick {
        self.tick
    }

    /// Handle registered for `label` by an earlier `play ... as`.
    pub fn labelled(&self, label: &str) -> Option<AudioHandle> {
        self.labels.get(label).copied()
    }

    /// Run the coordinator for one tick, then let simulated time pass.
    pub fn step(&mut self) {
        self.audio.update();
        if let Some(clock) = &self.clock {
            clock.advance(self.tick_len);
        }
        self.tick = self.tick.advance(1);
    }

    fn resolve(&self, target: &SoundRef) -> Option<AudioHandle> {
        match target {
            SoundRef::Label(label) => self.labelled(label),
            SoundRef::Handle(handle) => Some(*handle),
            SoundRef::Music => Some(AudioHandle::STOP_THE_MUSIC),
        }
    }

    fn control(&mut self, target: &SoundRef, control: Control, out: &mut CommandOutput) {
        if *target == SoundRef::Music && control != Control::Stop {
            self.audio
                .pause_category(AudioAffect::MUSIC, control == Control::Pause);
            out.lines.push(format!("Music {control:?}"));
            return;
        }
        match self.resolve(target) {
            Some(handle) => {
                self.audio.submit_control(handle, control);
                out.lines.push(format!("Queued {control:?} for {handle}"));
            }
            None => out.lines.push(format!("Error: unknown sound {target:?}")),
        }
    }

    pub fn execute(&mut self, cmd: AudioCommand) -> CommandOutput {
        let mut out = CommandOutput::default();
        match cmd {
            AudioCommand::Help => out.lines.extend(help_lines()),
            AudioCommand::Play {
                event,
                position,
                label,
                object,
            } => {
                let mut request = AudioEvent::new(event.clone());
                if let Some(position) = position {
                    request = request.at(position);
                }
                if let Some(object) = object {
                    request = request.from_object(object);
                }
                let handle = self.audio.submit_play(request);
                if let Some(label) = label {
                    self.labels.insert(label, handle);
                }
                out.lines.push(format!("Queued {event} as {handle}"));
            }
            AudioCommand::Stop { target } => self.control(&target, Control::Stop, &mut out),
            AudioCommand::Pause { target } => self.control(&target, Control::Pause, &mut out),
            AudioCommand::Resume { target } => self.control(&target, Control::Resume, &mut out),
            AudioCommand::StopCategory { affect } => {
                self.audio.stop_category(affect);
                out.lines.push(format!("Stopped {affect:?}"));
            }
            AudioCommand::PauseCategory { affect, pause } => {
                self.audio.pause_category(affect, pause);
                let verb = if pause { "Paused" } else { "Resumed" };
                out.lines.push(format!("{verb} {affect:?}"));
            }
            AudioCommand::PauseAmbient { pause } => {
                self.audio.pause_ambient(pause);
                let verb = if pause { "Paused" } else { "Resumed" };
                out.lines.push(format!("{verb} ambient sounds"));
            }
            AudioCommand::AdjustVolume { event, volume } => {
                self.audio.adjust_volume_of_playing_audio(&event, volume);
                out.lines.push(format!("Volume of {event} set to {volume}"));
            }
            AudioCommand::OverrideVolume { event, volume } => {
                self.audio.set_event_volume_override(&event, volume);
                out.lines.push(format!("Override for {event} set to {volume}"));
            }
            AudioCommand::RemoveDisabled => {
                let before = self.audio.active_sound_count();
                self.audio.remove_all_disabled_audio();
                let removed = before - self.audio.active_sound_count();
                out.lines.push(format!("Removed {removed} disabled sounds"));
            }
            AudioCommand::Remove { event } => {
                self.audio.remove_playing_audio(&event);
                out.lines.push(format!("Removed {event}"));
            }
            AudioCommand::StopObject { object } => {
                self.audio.stop_all_ambients_by_object(object);
                out.lines.push(format!("Stopped sounds of object {object}"));
            }
            AudioCommand::Listener { position } => {
                let forward = self.audio.listener().forward;
                self.audio.set_listener(position, forward);
                out.lines.push(format!(
                    "Listener at {:.1} {:.1} {:.1}",
                    position.x, position.y, position.z
                ));
            }
            AudioCommand::NextMusic => {
                let previous = self.audio.music_track_name().to_string();
                self.audio.next_music_track();
                out.lines.push(format!("Skipped forward from '{previous}'"));
            }
            AudioCommand::PrevMusic => {
                let previous = self.audio.music_track_name().to_string();
                self.audio.prev_music_track();
                out.lines.push(format!("Skipped back from '{previous}'"));
            }
            AudioCommand::SetVolume { bucket, volume } => {
                match bucket {
                    VolumeBucket::Master => self.audio.set_master_volume(volume),
                    VolumeBucket::Music => self.audio.set_music_volume(volume),
                    VolumeBucket::Speech => self.audio.set_speech_volume(volume),
                    VolumeBucket::Sound => self.audio.set_sound_volume(volume),
                    VolumeBucket::Sound3d => self.audio.set_sound_3d_volume(volume),
                }
                out.lines.push(format!("{bucket:?} volume set to {volume}"));
            }
            AudioCommand::Mute => {
                self.audio.toggle_mute();
                let state = if self.audio.settings().muted { "on" } else { "off" };
                out.lines.push(format!("Mute {state}"));
            }
            AudioCommand::Reset => {
                self.audio.reset();
                self.labels.clear();
                out.lines.push("Audio reset".to_string());
            }
            AudioCommand::Stats => out.lines.push(self.audio.stats().to_string()),
        }
        out
    }
}

fn build_backend(
    cfg: &HeadlessConfig,
    fs: Arc<dyn SoundFileSystem>,
) -> Result<(Box<dyn AudioBackend>, Option<HeadlessBackend>)> {
    if cfg.realtime {
        #[cfg(feature = "rodio_backend")]
        {
            let backend = rtsaudio_audio::backend::RodioBackend::new(&cfg.config.sounds_dir)
                .context("opening audio output device")?;
            return Ok((Box::new(backend), None));
        }
        #[cfg(not(feature = "rodio_backend"))]
        {
            warn!("--realtime requires the rodio_backend feature; simulating playback instead");
        }
    }
    let backend = HeadlessBackend::new(fs);
    Ok((Box::new(backend.clone()), Some(backend)))
}

pub fn run(cfg: HeadlessConfig) -> Result<RunSummary> {
    let registry = EventRegistry::from_file(&cfg.config.events_path).with_context(|| {
        format!(
            "loading event definitions from {}",
            cfg.config.events_path.display()
        )
    })?;
    info!(events = registry.len(), "event registry loaded");
    let playlist = registry.music_playlist();

    let fs: Arc<dyn SoundFileSystem> = Arc::new(DiskFileSystem::new(&cfg.config.sounds_dir));
    let (backend, clock) = build_backend(&cfg, Arc::clone(&fs))?;
    let mut audio = PlaybackCoordinator::new(backend, fs, Arc::new(registry))
        .with_settings(cfg.config.audio.clone())
        .with_track_ordering(Box::new(playlist));
    if let Some(seed) = cfg.config.seed {
        audio = audio.with_seed(seed);
    }

    let mut script = cfg
        .command_script
        .as_deref()
        .map(CommandScriptPlayer::from_path)
        .transpose()?;
    let tick_len = Duration::from_millis(cfg.config.tick_millis.max(1));
    let realtime = clock.is_none();
    let mut session = AudioSession::new(audio, clock, tick_len);
    let max_ticks = cfg.max_ticks.unwrap_or(DEFAULT_MAX_TICKS);

    let mut commands = 0;
    let mut failed_commands = 0;
    while session.tick().0 < max_ticks {
        if let Some(player) = script.as_mut() {
            for step in player.drain_ready_commands(session.tick()) {
                commands += 1;
                let out = session.execute(step.command);
                for line in &out.lines {
                    if line.starts_with("Error:") {
                        failed_commands += 1;
                        warn!(tick = step.tick.0, command = %step.source, "{line}");
                    } else {
                        info!(tick = step.tick.0, "{line}");
                    }
                }
            }
        }

        session.step();
        if realtime {
            std::thread::sleep(tick_len);
        }

        let script_done = script.as_ref().map_or(true, CommandScriptPlayer::is_finished);
        if cfg.exit_when_script_finished && script_done && session.audio().active_sound_count() == 0
        {
            break;
        }
    }

    let stats = session.audio().stats();
    info!(ticks = session.tick().0, "{stats}");
    Ok(RunSummary {
        ticks: session.tick().0,
        commands,
        failed_commands,
        stats,
    })
}
