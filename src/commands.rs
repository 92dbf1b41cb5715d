use std::fmt;

use glam::Vec3;
use rtsaudio_core::{AudioAffect, AudioHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandError {}

/// How a script refers to a sound it started earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundRef {
    /// Name given with `play ... as <label>`.
    Label(String),
    /// Raw handle, written `#16`.
    Handle(AudioHandle),
    /// All music (the stop-the-music sentinel).
    Music,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeBucket {
    Master,
    Music,
    Speech,
    Sound,
    Sound3d,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    Help,
    Play {
        event: String,
        position: Option<Vec3>,
        label: Option<String>,
        object: Option<u32>,
    },
    Stop {
        target: SoundRef,
    },
    Pause {
        target: SoundRef,
    },
    Resume {
        target: SoundRef,
    },
    StopCategory {
        affect: AudioAffect,
    },
    PauseCategory {
        affect: AudioAffect,
        pause: bool,
    },
    PauseAmbient {
        pause: bool,
    },
    AdjustVolume {
        event: String,
        volume: f32,
    },
    OverrideVolume {
        event: String,
        volume: f32,
    },
    RemoveDisabled,
    Remove {
        event: String,
    },
    StopObject {
        object: u32,
    },
    Listener {
        position: Vec3,
    },
    NextMusic,
    PrevMusic,
    SetVolume {
        bucket: VolumeBucket,
        volume: f32,
    },
    Mute,
    Reset,
    Stats,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub lines: Vec<String>,
}

pub fn help_lines() -> Vec<String> {
    [
        "play <event> [at <x> <y> <z>] [as <label>] [object <id>]",
        "stop|pause|resume <label|#handle|music>",
        "stop-category|pause-category|resume-category <music+speech+sound+sound3d|all>",
        "pause-ambient | resume-ambient",
        "volume <event> <v>   (negative restores)",
        "override <event> <v> | remove-disabled | remove <event> | stop-object <id>",
        "listener <x> <y> <z>",
        "next-music | prev-music",
        "set <master|music|speech|sound|sound3d> <v> | mute",
        "reset | stats",
    ]
    .iter()
    .map(|line| line.to_string())
    .collect()
}

pub fn parse_command(input: &str) -> Result<AudioCommand, CommandError> {
    let input = input.trim();
    let input = input.strip_prefix('/').unwrap_or(input).trim();
    if input.is_empty() {
        return Ok(AudioCommand::Help);
    }

    let mut parts = input.split_whitespace();
    let cmd = parts
        .next()
        .ok_or_else(|| CommandError::new("Missing command"))?
        .to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    match cmd.as_str() {
        "help" | "?" => Ok(AudioCommand::Help),
        "play" => parse_play_command(&args),
        "stop" => Ok(AudioCommand::Stop {
            target: parse_single_ref(&args, "stop")?,
        }),
        "pause" => Ok(AudioCommand::Pause {
            target: parse_single_ref(&args, "pause")?,
        }),
        "resume" => Ok(AudioCommand::Resume {
            target: parse_single_ref(&args, "resume")?,
        }),
        "stop-category" => Ok(AudioCommand::StopCategory {
            affect: parse_single_affect(&args, "stop-category")?,
        }),
        "pause-category" => Ok(AudioCommand::PauseCategory {
            affect: parse_single_affect(&args, "pause-category")?,
            pause: true,
        }),
        "resume-category" => Ok(AudioCommand::PauseCategory {
            affect: parse_single_affect(&args, "resume-category")?,
            pause: false,
        }),
        "pause-ambient" => Ok(AudioCommand::PauseAmbient { pause: true }),
        "resume-ambient" => Ok(AudioCommand::PauseAmbient { pause: false }),
        "volume" => {
            let (event, volume) = parse_event_volume(&args, "volume")?;
            Ok(AudioCommand::AdjustVolume { event, volume })
        }
        "override" => {
            let (event, volume) = parse_event_volume(&args, "override")?;
            Ok(AudioCommand::OverrideVolume { event, volume })
        }
        "remove-disabled" => Ok(AudioCommand::RemoveDisabled),
        "remove" => match args.as_slice() {
            [event] => Ok(AudioCommand::Remove {
                event: event.to_string(),
            }),
            _ => Err(CommandError::new("Usage: remove <event>")),
        },
        "stop-object" => match args.as_slice() {
            [id] => Ok(AudioCommand::StopObject {
                object: parse_id(id)?,
            }),
            _ => Err(CommandError::new("Usage: stop-object <id>")),
        },
        "listener" => {
            if args.len() != 3 {
                return Err(CommandError::new("Usage: listener <x> <y> <z>"));
            }
            Ok(AudioCommand::Listener {
                position: parse_vec3(&args)?,
            })
        }
        "next-music" => Ok(AudioCommand::NextMusic),
        "prev-music" => Ok(AudioCommand::PrevMusic),
        "set" => parse_set_command(&args),
        "mute" => Ok(AudioCommand::Mute),
        "reset" => Ok(AudioCommand::Reset),
        "stats" => Ok(AudioCommand::Stats),
        _ => Err(CommandError::new(format!(
            "Unknown command: {cmd}. Try help"
        ))),
    }
}

fn parse_play_command(args: &[&str]) -> Result<AudioCommand, CommandError> {
    const USAGE: &str = "Usage: play <event> [at <x> <y> <z>] [as <label>] [object <id>]";
    let (event, mut rest) = args
        .split_first()
        .ok_or_else(|| CommandError::new(USAGE))?;
    let mut position = None;
    let mut label = None;
    let mut object = None;
    while let Some((keyword, tail)) = rest.split_first() {
        match *keyword {
            "at" if tail.len() >= 3 => {
                position = Some(parse_vec3(&tail[..3])?);
                rest = &tail[3..];
            }
            "as" if !tail.is_empty() => {
                label = Some(tail[0].to_string());
                rest = &tail[1..];
            }
            "object" if !tail.is_empty() => {
                object = Some(parse_id(tail[0])?);
                rest = &tail[1..];
            }
            _ => return Err(CommandError::new(USAGE)),
        }
    }
    Ok(AudioCommand::Play {
        event: event.to_string(),
        position,
        label,
        object,
    })
}

fn parse_set_command(args: &[&str]) -> Result<AudioCommand, CommandError> {
    let [bucket, volume] = args else {
        return Err(CommandError::new(
            "Usage: set <master|music|speech|sound|sound3d> <v>",
        ));
    };
    let bucket = match bucket.to_ascii_lowercase().as_str() {
        "master" => VolumeBucket::Master,
        "music" => VolumeBucket::Music,
        "speech" => VolumeBucket::Speech,
        "sound" => VolumeBucket::Sound,
        "sound3d" => VolumeBucket::Sound3d,
        other => return Err(CommandError::new(format!("Unknown volume: {other}"))),
    };
    Ok(AudioCommand::SetVolume {
        bucket,
        volume: parse_volume(volume)?,
    })
}

fn parse_single_ref(args: &[&str], cmd: &str) -> Result<SoundRef, CommandError> {
    match args {
        [target] => parse_ref(target),
        _ => Err(CommandError::new(format!(
            "Usage: {cmd} <label|#handle|music>"
        ))),
    }
}

fn parse_ref(token: &str) -> Result<SoundRef, CommandError> {
    if token.eq_ignore_ascii_case("music") {
        return Ok(SoundRef::Music);
    }
    if let Some(raw) = token.strip_prefix('#') {
        let value = raw
            .parse::<u32>()
            .map_err(|_| CommandError::new(format!("Invalid handle: {token}")))?;
        return Ok(SoundRef::Handle(AudioHandle(value)));
    }
    Ok(SoundRef::Label(token.to_string()))
}

fn parse_single_affect(args: &[&str], cmd: &str) -> Result<AudioAffect, CommandError> {
    match args {
        [mask] => parse_affect(mask),
        _ => Err(CommandError::new(format!(
            "Usage: {cmd} <music+speech+sound+sound3d|all>"
        ))),
    }
}

fn parse_affect(token: &str) -> Result<AudioAffect, CommandError> {
    let mut affect = AudioAffect::empty();
    for part in token.split('+') {
        affect |= match part.to_ascii_lowercase().as_str() {
            "music" => AudioAffect::MUSIC,
            "speech" => AudioAffect::SPEECH,
            "sound" => AudioAffect::SOUND,
            "sound3d" => AudioAffect::SOUND_3D,
            "all" => AudioAffect::ALL,
            other => return Err(CommandError::new(format!("Unknown category: {other}"))),
        };
    }
    Ok(affect)
}

fn parse_event_volume(args: &[&str], cmd: &str) -> Result<(String, f32), CommandError> {
    match args {
        [event, volume] => Ok((event.to_string(), parse_volume(volume)?)),
        _ => Err(CommandError::new(format!("Usage: {cmd} <event> <v>"))),
    }
}

fn parse_volume(s: &str) -> Result<f32, CommandError> {
    s.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::new(format!("Invalid volume: {s}")))
}

fn parse_id(s: &str) -> Result<u32, CommandError> {
    s.parse::<u32>()
        .map_err(|_| CommandError::new(format!("Invalid id: {s}")))
}

fn parse_vec3(args: &[&str]) -> Result<Vec3, CommandError> {
    let mut coords = [0.0f32; 3];
    for (slot, raw) in coords.iter_mut().zip(args) {
        *slot = raw
            .parse::<f32>()
            .map_err(|_| CommandError::new(format!("Invalid coordinate: {raw}")))?;
    }
    Ok(Vec3::from_array(coords))
}
