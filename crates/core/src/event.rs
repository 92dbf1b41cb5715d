//! Audio event metadata and per-play event state.

use crate::{AudioHandle, EventResolver};
use bitflags::bitflags;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Broad classification of a sound, selecting its volume bucket and the
/// primitive used to play it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Background music, streamed.
    Music,
    /// Long-form speech and briefings, streamed.
    Speech,
    /// Short effects, fully decoded and cached.
    #[default]
    Effect,
}

impl Category {
    /// Whether sounds of this category are streamed rather than buffered.
    pub fn is_streamed(self) -> bool {
        matches!(self, Category::Music | Category::Speech)
    }
}

bitflags! {
    /// Category mask for bulk stop/pause operations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AudioAffect: u32 {
        /// Music.
        const MUSIC = 0b0001;
        /// Speech.
        const SPEECH = 0b0010;
        /// Non-positional effects.
        const SOUND = 0b0100;
        /// Positional sounds.
        const SOUND_3D = 0b1000;
        /// Everything.
        const ALL = Self::MUSIC.bits() | Self::SPEECH.bits() | Self::SOUND.bits() | Self::SOUND_3D.bits();
    }
}

impl AudioAffect {
    /// Test a sound's category and positional flag against this mask.
    pub fn matches(self, category: Category, positional: bool) -> bool {
        (self.contains(AudioAffect::MUSIC) && category == Category::Music)
            || (self.contains(AudioAffect::SPEECH) && category == Category::Speech)
            || (self.contains(AudioAffect::SOUND) && category == Category::Effect && !positional)
            || (self.contains(AudioAffect::SOUND_3D) && positional)
    }
}

/// Inclusive range a multiplier is rolled from on every play.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftRange {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl ShiftRange {
    /// A range that always yields `value`.
    pub const fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Roll a value from the range.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

impl Default for ShiftRange {
    fn default() -> Self {
        Self::fixed(1.0)
    }
}

/// Static description of a named audio event, shared by every play of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventInfo {
    /// Event name (e.g. "Explosion").
    pub name: String,
    /// Volume bucket and primitive selection.
    pub category: Category,
    /// Whether the sound lives in the world and attenuates with distance.
    pub positional: bool,
    /// Base volume (0.0 to 1.0).
    pub volume: f32,
    /// Pitch multiplier range.
    pub pitch_shift: ShiftRange,
    /// Volume multiplier range.
    pub volume_shift: ShiftRange,
    /// Loop the main sample until stopped.
    pub looping: bool,
    /// Candidate files; one is picked per play.
    pub filenames: Vec<String>,
    /// Optional lead-in samples, played before the main sample.
    pub attack: Vec<String>,
    /// Optional tail samples, played after a non-looping main sample.
    pub decay: Vec<String>,
    /// Distance below which no attenuation applies.
    pub min_distance: f32,
    /// Distance at and beyond which the sound is silent.
    pub max_distance: f32,
    /// Maximum concurrent instances of this event (0 = unlimited).
    pub limit: u32,
    /// Use the global min/max range from settings instead of this event's.
    pub global: bool,
    /// The sound is a unit voice line.
    pub voice: bool,
}

impl Default for EventInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: Category::Effect,
            positional: false,
            volume: 1.0,
            pitch_shift: ShiftRange::default(),
            volume_shift: ShiftRange::default(),
            looping: false,
            filenames: Vec::new(),
            attack: Vec::new(),
            decay: Vec::new(),
            min_distance: 0.0,
            max_distance: 0.0,
            limit: 0,
            global: false,
            voice: false,
        }
    }
}

impl EventInfo {
    /// Convenience constructor for a single-file event.
    pub fn new(name: impl Into<String>, category: Category, filename: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category,
            filenames: vec![filename.into()],
            ..Default::default()
        }
    }
}

fn pick<R: Rng + ?Sized>(choices: &[String], rng: &mut R) -> Option<String> {
    match choices.len() {
        0 => None,
        1 => Some(choices[0].clone()),
        n => Some(choices[rng.gen_range(0..n)].clone()),
    }
}

/// One request to play a named event, plus everything rolled for it.
#[derive(Debug, Clone)]
pub struct AudioEvent {
    name: String,
    info: Option<Arc<EventInfo>>,
    handle: AudioHandle,
    position: Option<Vec3>,
    object_id: Option<u32>,
    drawable_id: Option<u32>,
    filename: Option<String>,
    attack_filename: Option<String>,
    decay_filename: Option<String>,
    pitch_shift: f32,
    volume_shift: f32,
}

impl AudioEvent {
    /// Create an unresolved event by name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            info: None,
            handle: AudioHandle::NONE,
            position: None,
            object_id: None,
            drawable_id: None,
            filename: None,
            attack_filename: None,
            decay_filename: None,
            pitch_shift: 1.0,
            volume_shift: 1.0,
        }
    }

    /// Create an event that is already resolved.
    pub fn with_info(info: Arc<EventInfo>) -> Self {
        let mut event = Self::new(info.name.clone());
        event.info = Some(info);
        event
    }

    /// Place the event in the world.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    /// Attribute the event to a simulation object.
    pub fn from_object(mut self, object_id: u32) -> Self {
        self.object_id = Some(object_id);
        self
    }

    /// Attribute the event to a drawable.
    pub fn from_drawable(mut self, drawable_id: u32) -> Self {
        self.drawable_id = Some(drawable_id);
        self
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved metadata, if any.
    pub fn info(&self) -> Option<&Arc<EventInfo>> {
        self.info.as_ref()
    }

    /// Look up metadata through `resolver` unless already resolved.
    /// Returns whether the event has metadata afterwards.
    pub fn resolve(&mut self, resolver: &dyn EventResolver) -> bool {
        if self.info.is_none() {
            self.info = resolver.resolve(&self.name);
        }
        self.info.is_some()
    }

    /// Handle this event plays under.
    pub fn handle(&self) -> AudioHandle {
        self.handle
    }

    /// Assign the playing handle.
    pub fn set_handle(&mut self, handle: AudioHandle) {
        self.handle = handle;
    }

    /// Current world position.
    pub fn position(&self) -> Option<Vec3> {
        self.position
    }

    /// Move the sound (e.g. it follows a unit).
    pub fn set_position(&mut self, position: Option<Vec3>) {
        self.position = position;
    }

    /// Owning simulation object.
    pub fn object_id(&self) -> Option<u32> {
        self.object_id
    }

    /// Owning drawable.
    pub fn drawable_id(&self) -> Option<u32> {
        self.drawable_id
    }

    /// Base volume from the metadata, 1.0 while unresolved.
    pub fn volume(&self) -> f32 {
        self.info.as_ref().map_or(1.0, |info| info.volume)
    }

    /// Category, defaulting to [`Category::Effect`] while unresolved.
    pub fn category(&self) -> Category {
        self.info
            .as_ref()
            .map(|info| info.category)
            .unwrap_or_default()
    }

    /// Whether the sound attenuates with listener distance.
    pub fn is_positional(&self) -> bool {
        self.info.as_ref().is_some_and(|info| info.positional)
    }

    /// Whether the main sample loops.
    pub fn is_looping(&self) -> bool {
        self.info.as_ref().is_some_and(|info| info.looping)
    }

    /// Per-name concurrency limit (0 = unlimited).
    pub fn limit(&self) -> u32 {
        self.info.as_ref().map(|info| info.limit).unwrap_or(0)
    }

    /// File chosen for this play.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|name| !name.is_empty())
    }

    /// Lead-in file chosen for this play.
    pub fn attack_filename(&self) -> Option<&str> {
        self.attack_filename.as_deref()
    }

    /// Tail file chosen for this play.
    pub fn decay_filename(&self) -> Option<&str> {
        self.decay_filename.as_deref()
    }

    /// Rolled pitch multiplier.
    pub fn pitch_shift(&self) -> f32 {
        self.pitch_shift
    }

    /// Rolled volume multiplier.
    pub fn volume_shift(&self) -> f32 {
        self.volume_shift
    }

    /// Pick the main, attack and decay files from the metadata variants.
    /// Does nothing until resolved; keeps an already chosen file.
    pub fn generate_filename<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let Some(info) = self.info.clone() else {
            return;
        };
        if self.filename.is_none() {
            self.filename = pick(&info.filenames, rng);
            self.attack_filename = pick(&info.attack, rng);
            self.decay_filename = pick(&info.decay, rng);
        }
    }

    /// Roll pitch and volume shift for this play.
    pub fn generate_play_info<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if let Some(info) = self.info.clone() {
            self.pitch_shift = info.pitch_shift.roll(rng);
            self.volume_shift = info.volume_shift.roll(rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn affect_mask_matches_categories() {
        assert!(AudioAffect::MUSIC.matches(Category::Music, false));
        assert!(!AudioAffect::MUSIC.matches(Category::Effect, false));
        assert!(AudioAffect::SOUND.matches(Category::Effect, false));
        assert!(!AudioAffect::SOUND.matches(Category::Effect, true));
        assert!(AudioAffect::SOUND_3D.matches(Category::Effect, true));
        assert!(AudioAffect::ALL.matches(Category::Speech, false));
    }

    #[test]
    fn volume_comes_from_metadata() {
        let info = Arc::new(EventInfo {
            volume: 0.8,
            ..EventInfo::new("Wind", Category::Effect, "wind.wav")
        });
        assert_eq!(AudioEvent::with_info(info).volume(), 0.8);
        assert_eq!(AudioEvent::new("Unknown").volume(), 1.0);
    }

    #[test]
    fn filename_generation_picks_declared_variants() {
        let info = Arc::new(EventInfo {
            filenames: vec!["a.wav".into(), "b.wav".into()],
            attack: vec!["in.wav".into()],
            ..EventInfo::new("Gun", Category::Effect, "unused")
        });
        let mut rng = StdRng::seed_from_u64(3);
        let mut event = AudioEvent::with_info(info);
        event.generate_filename(&mut rng);
        let chosen = event.filename().expect("filename chosen");
        assert!(chosen == "a.wav" || chosen == "b.wav");
        assert_eq!(event.attack_filename(), Some("in.wav"));
        assert_eq!(event.decay_filename(), None);
    }

    #[test]
    fn play_info_rolls_within_range() {
        let info = Arc::new(EventInfo {
            pitch_shift: ShiftRange { min: 0.9, max: 1.1 },
            ..EventInfo::new("Gun", Category::Effect, "gun.wav")
        });
        let mut rng = StdRng::seed_from_u64(11);
        let mut event = AudioEvent::with_info(info);
        for _ in 0..32 {
            event.generate_play_info(&mut rng);
            assert!((0.9..=1.1).contains(&event.pitch_shift()));
            assert_eq!(event.volume_shift(), 1.0);
        }
    }

    #[test]
    fn unresolved_event_has_no_filename() {
        let mut event = AudioEvent::new("Missing");
        event.generate_filename(&mut StdRng::seed_from_u64(0));
        assert!(event.filename().is_none());
        assert_eq!(event.category(), Category::Effect);
    }
}
