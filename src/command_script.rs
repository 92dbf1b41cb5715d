use crate::commands::{parse_command, AudioCommand};
use anyhow::{bail, Context, Result};
use rtsaudio_core::SimTick;
use serde::Deserialize;
use std::{collections::VecDeque, fs, path::Path};

#[derive(Debug, Deserialize)]
struct ScriptFile {
    steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptStep {
    tick: u64,
    command: String,
}

#[derive(Debug, Clone)]
pub struct ScriptedCommand {
    pub tick: SimTick,
    pub source: String,
    pub command: AudioCommand,
}

/// Deterministic audio command script.
///
/// Scripts are a list of `{tick, command}` steps, executed in file order.
/// Every command is parsed up front so a typo fails the load, not the run.
#[derive(Debug)]
pub struct CommandScriptPlayer {
    pending: VecDeque<ScriptedCommand>,
}

impl CommandScriptPlayer {
    /// Read and parse a script file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading command script {}", path.display()))?;
        Self::from_str(&contents)
    }

    /// Parse a script held in memory.
    pub fn from_str(contents: &str) -> Result<Self> {
        let script: ScriptFile =
            serde_json::from_str(contents).context("command script is not valid JSON")?;
        if script.steps.is_empty() {
            bail!("command script has no steps");
        }

        let mut pending: VecDeque<ScriptedCommand> = VecDeque::new();
        for (index, step) in script.steps.into_iter().enumerate() {
            let source = step.command.trim().to_string();
            if source.is_empty() {
                bail!("step {index}: empty command");
            }
            if pending.back().is_some_and(|prev| step.tick < prev.tick.0) {
                bail!("step {index}: ticks go backwards, steps must be sorted by tick");
            }

            let command = parse_command(&source)
                .with_context(|| format!("command script step {index}: `{source}`"))?;
            pending.push_back(ScriptedCommand {
                tick: SimTick(step.tick),
                source,
                command,
            });
        }

        Ok(Self { pending })
    }

    /// Pop every command due at or before `tick`.
    pub fn drain_ready_commands(&mut self, tick: SimTick) -> Vec<ScriptedCommand> {
        let mut commands = Vec::new();
        while self.pending.front().is_some_and(|step| step.tick <= tick) {
            if let Some(step) = self.pending.pop_front() {
                commands.push(step);
            }
        }
        commands
    }

    /// Tick of the last scheduled step, if any remain.
    pub fn last_tick(&self) -> Option<SimTick> {
        self.pending.back().map(|step| step.tick)
    }

    /// No commands left.
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}
