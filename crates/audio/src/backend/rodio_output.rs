//! rodio-backed output, enabled with the `rodio_backend` feature.

use super::pump::{self, PumpReader, Pumped};
use super::{AudioBackend, ListenerPose, Placement, PullSource, Voice, VoiceStatus};
use crate::{AudioError, AudioResult, SampleBuffer};
use glam::Vec3;
use parking_lot::Mutex;
use rodio::buffer::SamplesBuffer;
use rodio::source::SeekError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source, SpatialSink};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Half the distance between the listener's ears, in world units.
const EAR_OFFSET: f32 = 1.0;

/// Most samples a pull stream takes from its pump per refill.
const PULL_BATCH: usize = 1024;

type BoxedSource = Box<dyn Source<Item = i16> + Send>;

/// Backend state for rodio audio.
pub struct RodioBackend {
    /// Output stream (must be kept alive)
    _stream: OutputStream,
    /// Stream handle for creating sinks
    handle: OutputStreamHandle,
    /// Directory streamed files are resolved against
    root: PathBuf,
    listener: Arc<Mutex<ListenerPose>>,
}

impl RodioBackend {
    /// Open the default output device.
    pub fn new(root: impl Into<PathBuf>) -> AudioResult<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|err| AudioError::backend_open("default output", err))?;
        debug!("Audio backend: rodio");
        Ok(Self {
            _stream: stream,
            handle,
            root: root.into(),
            listener: Arc::new(Mutex::new(ListenerPose::default())),
        })
    }

    fn open_decoder(&self, filename: &str) -> AudioResult<Decoder<BufReader<File>>> {
        let file = File::open(self.root.join(filename))
            .map_err(|err| AudioError::backend_open(filename, err))?;
        Decoder::new(BufReader::new(file)).map_err(|err| AudioError::backend_open(filename, err))
    }

    fn voice(&self, label: &str, source: BoxedSource, spatial: bool) -> AudioResult<RodioVoice> {
        let output = if spatial {
            let pose = *self.listener.lock();
            let (left, right) = ears(&pose);
            let sink = SpatialSink::try_new(
                &self.handle,
                pose.position.to_array(),
                left.to_array(),
                right.to_array(),
            )
            .map_err(|err| AudioError::backend_open(label, err))?;
            Output::Spatial(sink)
        } else {
            let sink =
                Sink::try_new(&self.handle).map_err(|err| AudioError::backend_open(label, err))?;
            Output::Flat(sink)
        };
        output.pause();
        Ok(RodioVoice {
            output,
            pending: Some(source),
            looping: false,
            started: false,
            listener: Arc::clone(&self.listener),
        })
    }
}

impl AudioBackend for RodioBackend {
    fn name(&self) -> &str {
        "rodio"
    }

    fn create_sample_voice(
        &mut self,
        filename: &str,
        buffer: Arc<SampleBuffer>,
        spatial: bool,
    ) -> AudioResult<Box<dyn Voice>> {
        let source = SamplesBuffer::new(
            buffer.channels(),
            buffer.sample_rate(),
            buffer.samples().to_vec(),
        );
        Ok(Box::new(self.voice(filename, Box::new(source), spatial)?))
    }

    fn open_stream(&mut self, filename: &str) -> AudioResult<Box<dyn Voice>> {
        let decoder = self.open_decoder(filename)?;
        Ok(Box::new(self.voice(filename, Box::new(decoder), false)?))
    }

    fn open_pull_stream(&mut self, source: Box<dyn PullSource>) -> AudioResult<Box<dyn Voice>> {
        if source.channels() == 0 || source.sample_rate() == 0 {
            return Err(AudioError::InvalidStreamFormat {
                channels: source.channels(),
                sample_rate: source.sample_rate(),
            });
        }
        let adapter = PullAdapter {
            reader: pump::spawn(source)?,
            batch: Vec::with_capacity(PULL_BATCH),
            pos: 0,
            done: false,
        };
        Ok(Box::new(self.voice("video audio", Box::new(adapter), false)?))
    }

    fn stream_duration(&mut self, filename: &str) -> Option<Duration> {
        self.open_decoder(filename).ok()?.total_duration()
    }

    fn set_listener(&mut self, pose: &ListenerPose) {
        *self.listener.lock() = *pose;
    }
}

fn ears(pose: &ListenerPose) -> (Vec3, Vec3) {
    let right = pose.forward.cross(pose.up).normalize_or_zero() * EAR_OFFSET;
    (pose.position - right, pose.position + right)
}

enum Output {
    Flat(Sink),
    Spatial(SpatialSink),
}

impl Output {
    fn append(&self, source: BoxedSource) {
        match self {
            Output::Flat(sink) => sink.append(source),
            Output::Spatial(sink) => sink.append(source),
        }
    }

    fn play(&self) {
        match self {
            Output::Flat(sink) => sink.play(),
            Output::Spatial(sink) => sink.play(),
        }
    }

    fn pause(&self) {
        match self {
            Output::Flat(sink) => sink.pause(),
            Output::Spatial(sink) => sink.pause(),
        }
    }

    fn stop(&self) {
        match self {
            Output::Flat(sink) => sink.stop(),
            Output::Spatial(sink) => sink.stop(),
        }
    }

    fn is_paused(&self) -> bool {
        match self {
            Output::Flat(sink) => sink.is_paused(),
            Output::Spatial(sink) => sink.is_paused(),
        }
    }

    fn empty(&self) -> bool {
        match self {
            Output::Flat(sink) => sink.empty(),
            Output::Spatial(sink) => sink.empty(),
        }
    }

    fn set_volume(&self, volume: f32) {
        match self {
            Output::Flat(sink) => sink.set_volume(volume),
            Output::Spatial(sink) => sink.set_volume(volume),
        }
    }

    fn set_speed(&self, speed: f32) {
        match self {
            Output::Flat(sink) => sink.set_speed(speed),
            Output::Spatial(sink) => sink.set_speed(speed),
        }
    }
}

struct RodioVoice {
    output: Output,
    pending: Option<BoxedSource>,
    looping: bool,
    started: bool,
    listener: Arc<Mutex<ListenerPose>>,
}

impl Voice for RodioVoice {
    fn play(&mut self) {
        if let Some(source) = self.pending.take() {
            if self.looping {
                self.output.append(Box::new(source.repeat_infinite()));
            } else {
                self.output.append(source);
            }
            self.started = true;
        }
        self.output.play();
    }

    fn pause(&mut self) {
        self.output.pause();
    }

    fn stop(&mut self) {
        self.pending = None;
        self.output.stop();
    }

    fn status(&self) -> VoiceStatus {
        if !self.started || self.output.empty() {
            VoiceStatus::Stopped
        } else if self.output.is_paused() {
            VoiceStatus::Paused
        } else {
            VoiceStatus::Playing
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.output.set_volume(volume);
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.output.set_speed(pitch);
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_placement(&mut self, placement: Placement) {
        let Output::Spatial(sink) = &self.output else {
            return;
        };
        let pose = *self.listener.lock();
        let emitter = match placement {
            Placement::Listener { offset } => pose.position + offset,
            Placement::World { position, .. } => position,
        };
        let (left, right) = ears(&pose);
        sink.set_emitter_position(emitter.to_array());
        sink.set_left_ear_position(left.to_array());
        sink.set_right_ear_position(right.to_array());
    }
}

/// Feeds rodio's mixer from a pull stream's pump. Never blocks: when the
/// producer falls behind, a frame of silence is emitted instead.
struct PullAdapter {
    reader: PumpReader,
    batch: Vec<i16>,
    pos: usize,
    done: bool,
}

impl Iterator for PullAdapter {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        while self.pos >= self.batch.len() {
            if self.done {
                return None;
            }
            self.batch.clear();
            self.pos = 0;
            match self.reader.read_into(&mut self.batch, PULL_BATCH) {
                Pumped::Samples(_) => {}
                Pumped::Starved => self.batch.resize(self.reader.channels() as usize, 0),
                Pumped::Finished => self.done = true,
            }
        }
        let sample = self.batch[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl Source for PullAdapter {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.reader.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.reader.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }

    fn try_seek(&mut self, _pos: Duration) -> Result<(), SeekError> {
        self.reader.seek();
        self.batch.clear();
        self.pos = 0;
        Ok(())
    }
}
