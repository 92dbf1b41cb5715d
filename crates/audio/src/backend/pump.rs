//! Runs a blocking [`PullSource`] on its own thread and hands its samples
//! to a reader that never blocks.
//!
//! Output libraries mix every voice from a single device callback, so a
//! pull stream waiting on its producer there would stall all other sounds.
//! The pump thread does the waiting instead; the reader takes whatever has
//! arrived and reports starvation so the caller can emit silence.

use super::PullSource;
use crate::{AudioError, AudioResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Buffered audio ahead of the reader, in milliseconds.
pub(crate) const PUMP_BUFFER_MS: u32 = 200;

/// Outcome of one [`PumpReader::read_into`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pumped {
    /// This many samples were appended.
    Samples(usize),
    /// Nothing buffered yet; the source is still running.
    Starved,
    /// The source ended and everything buffered was read.
    Finished,
}

#[derive(Debug, Default)]
struct PumpState {
    samples: VecDeque<i16>,
    finished: bool,
    closed: bool,
    seek: bool,
}

#[derive(Debug)]
struct PumpShared {
    state: Mutex<PumpState>,
    space: Condvar,
    capacity: usize,
}

/// Non-blocking end of a pump.
#[derive(Debug)]
pub(crate) struct PumpReader {
    shared: Arc<PumpShared>,
    channels: u16,
    sample_rate: u32,
}

/// Start pumping `source` into a buffer of roughly [`PUMP_BUFFER_MS`].
pub(crate) fn spawn(source: Box<dyn PullSource>) -> AudioResult<PumpReader> {
    let frames = (source.sample_rate() as usize * PUMP_BUFFER_MS as usize / 1000).max(1);
    let capacity = frames * source.channels().max(1) as usize;
    spawn_with_capacity(source, capacity)
}

/// Start pumping `source`, pausing the pump once `capacity` samples wait.
pub(crate) fn spawn_with_capacity(
    mut source: Box<dyn PullSource>,
    capacity: usize,
) -> AudioResult<PumpReader> {
    let channels = source.channels();
    let sample_rate = source.sample_rate();
    let shared = Arc::new(PumpShared {
        state: Mutex::new(PumpState::default()),
        space: Condvar::new(),
        capacity: capacity.max(1),
    });

    let pump = Arc::clone(&shared);
    thread::Builder::new()
        .name("pull-pump".into())
        .spawn(move || {
            pump.run(source.as_mut());
            pump.state.lock().finished = true;
            debug!("pull pump finished");
        })
        .map_err(|err| AudioError::backend_open("pull stream", err))?;

    Ok(PumpReader {
        shared,
        channels,
        sample_rate,
    })
}

impl PumpShared {
    fn run(&self, source: &mut dyn PullSource) {
        loop {
            {
                let mut state = self.state.lock();
                while !state.closed && !state.seek && state.samples.len() >= self.capacity {
                    self.space.wait(&mut state);
                }
                if state.closed {
                    return;
                }
                if state.seek {
                    state.seek = false;
                    drop(state);
                    source.seek();
                    continue;
                }
            }

            let Some(chunk) = source.pull() else {
                return;
            };
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            // A seek raced this pull; the chunk predates it.
            if !state.seek {
                state.samples.extend(chunk.iter().copied());
            }
        }
    }
}

impl PumpReader {
    /// Interleaved channel count of the source.
    pub(crate) fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames per second of the source.
    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Move up to `max` buffered samples into `out` without waiting. Only
    /// whole frames are moved.
    pub(crate) fn read_into(&self, out: &mut Vec<i16>, max: usize) -> Pumped {
        let channels = self.channels.max(1) as usize;
        let mut state = self.shared.state.lock();
        let available = state.samples.len().min(max);
        let take = available - available % channels;
        if take == 0 {
            return if state.finished && state.samples.len() < channels {
                Pumped::Finished
            } else {
                Pumped::Starved
            };
        }
        out.extend(state.samples.drain(..take));
        drop(state);
        self.shared.space.notify_one();
        Pumped::Samples(take)
    }

    /// Drop everything buffered and ask the source to reposition.
    pub(crate) fn seek(&self) {
        let mut state = self.shared.state.lock();
        state.samples.clear();
        state.seek = true;
        drop(state);
        self.shared.space.notify_one();
    }
}

impl Drop for PumpReader {
    fn drop(&mut self) {
        self.shared.state.lock().closed = true;
        // A pump blocked inside `pull` exits once its source shuts down.
        self.shared.space.notify_all();
    }
}
