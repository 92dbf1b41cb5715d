//! rtsaudio - headless driver for the RTS audio subsystem
//!
//! Loads event definitions and an audio config, then runs a command script
//! tick by tick against the playback coordinator.

mod command_script;
mod commands;
mod config;
mod headless;

use anyhow::Result;
use config::AudioConfig;
use std::{env, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting rtsaudio v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    if cli.help {
        print_usage();
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => AudioConfig::load_from_path(path),
        None => AudioConfig::load(),
    };
    if let Some(path) = &cli.events {
        config.events_path = path.clone();
    }
    if let Some(path) = &cli.sounds {
        config.sounds_dir = path.clone();
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.muted {
        config.audio.muted = true;
    }

    if let Some(path) = &cli.save_config {
        config.save_to_path(path)?;
        info!("Saved audio config to {}", path.display());
    }

    if cli.exit_when_script_finished && cli.command_script.is_none() {
        tracing::warn!("--exit-when-script-finished has no effect without --command-script");
    }

    let summary = headless::run(headless::HeadlessConfig {
        config,
        command_script: cli.command_script.clone(),
        max_ticks: cli.max_ticks,
        exit_when_script_finished: cli.exit_when_script_finished,
        realtime: cli.realtime,
    })?;

    println!(
        "ran {} ticks, {} commands ({} failed): {}",
        summary.ticks, summary.commands, summary.failed_commands, summary.stats
    );
    info!("rtsaudio shutting down");
    Ok(())
}

fn print_usage() {
    println!(
        "usage: rtsaudio [--config <audio.toml>] [--events <events.json>] [--sounds <dir>]\n\
         \x20               [--command-script <script.json>] [--max-ticks <n>] [--seed <n>]\n\
         \x20               [--exit-when-script-finished] [--mute] [--realtime]\n\
         \x20               [--save-config <audio.toml>]"
    );
}

#[derive(Debug, Default)]
struct CliOptions {
    help: bool,
    config: Option<PathBuf>,
    events: Option<PathBuf>,
    sounds: Option<PathBuf>,
    command_script: Option<PathBuf>,
    save_config: Option<PathBuf>,
    max_ticks: Option<u64>,
    seed: Option<u64>,
    exit_when_script_finished: bool,
    muted: bool,
    realtime: bool,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => opts.help = true,
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--events" => {
                    if let Some(path) = args.next() {
                        opts.events = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--events requires a file path");
                    }
                }
                "--sounds" => {
                    if let Some(path) = args.next() {
                        opts.sounds = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--sounds requires a directory path");
                    }
                }
                "--command-script" => {
                    if let Some(path) = args.next() {
                        opts.command_script = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--command-script requires a file path");
                    }
                }
                "--save-config" => {
                    if let Some(path) = args.next() {
                        opts.save_config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--save-config requires a file path");
                    }
                }
                "--max-ticks" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.max_ticks = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--max-ticks must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--max-ticks requires an integer");
                    }
                }
                "--seed" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.seed = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--seed must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--seed requires an integer");
                    }
                }
                "--exit-when-script-finished" => opts.exit_when_script_finished = true,
                "--mute" => opts.muted = true,
                "--realtime" => opts.realtime = true,
                other => tracing::warn!(arg = %other, "ignoring unknown argument"),
            }
        }

        opts
    }
}
