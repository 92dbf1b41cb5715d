use anyhow::Result;
use rtsaudio_audio::AudioSettings;
use rtsaudio_core::SimTick;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

const DEFAULT_CONFIG_PATH: &str = "config/audio.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Directory sound filenames are resolved against.
    pub sounds_dir: PathBuf,
    /// JSON list of event definitions.
    pub events_path: PathBuf,
    /// Seed for variant selection and pitch/volume rolls; random when unset.
    pub seed: Option<u64>,
    /// Simulated milliseconds per tick.
    pub tick_millis: u64,
    pub audio: AudioSettings,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sounds_dir: PathBuf::from("assets/sounds"),
            events_path: PathBuf::from("config/events.json"),
            seed: None,
            tick_millis: SimTick::MILLIS,
            audio: AudioSettings::default(),
        }
    }
}

impl AudioConfig {
    /// Load audio configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AudioConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    AudioConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!(
                        "Audio config not found at {}. Using defaults",
                        path.display()
                    );
                }
                AudioConfig::default()
            }
        }
    }

    /// Save audio configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "rtsaudio-config-{}-{name}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = AudioConfig::load_from_path(&temp_path("missing.toml"));
        assert_eq!(cfg, AudioConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_path("partial.toml");
        fs::write(&path, "seed = 42\n[audio]\nmusic = 0.25\n").unwrap();
        let cfg = AudioConfig::load_from_path(&path);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.audio.music, 0.25);
        assert_eq!(cfg.audio.master, 1.0);
        assert_eq!(cfg.tick_millis, SimTick::MILLIS);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let path = temp_path("broken.toml");
        fs::write(&path, "seed = [not toml").unwrap();
        assert_eq!(AudioConfig::load_from_path(&path), AudioConfig::default());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let path = temp_path("dir").join("audio.toml");
        let mut cfg = AudioConfig::default();
        cfg.audio.sound_3d = 0.4;
        cfg.seed = Some(7);
        cfg.save_to_path(&path).unwrap();
        assert_eq!(AudioConfig::load_from_path(&path), cfg);
    }
}
