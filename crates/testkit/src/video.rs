//! Scripted video decoder that hands out pre-queued audio chunks.

use parking_lot::Mutex;
use rtsaudio_audio::{DecodedAudioTrack, TrackFormat, VideoDecoder};
use std::collections::VecDeque;
use std::sync::Arc;

type ChunkQueue = Arc<Mutex<VecDeque<Vec<i16>>>>;

/// Test-side handle that "decodes" chunks into the open track.
#[derive(Debug, Clone)]
pub struct VideoFeed {
    decoded: ChunkQueue,
}

impl VideoFeed {
    /// Make `chunk` available to the next `pop_decoded`.
    pub fn decode(&self, chunk: Vec<i16>) {
        self.decoded.lock().push_back(chunk);
    }

    /// Chunks decoded but not yet taken by the bridge.
    pub fn backlog(&self) -> usize {
        self.decoded.lock().len()
    }
}

/// Video whose audio tracks are fixed formats; `None` marks a track that
/// fails to open.
#[derive(Debug)]
pub struct ScriptedVideo {
    tracks: Vec<Option<TrackFormat>>,
    decoded: ChunkQueue,
    opened: Vec<usize>,
}

impl ScriptedVideo {
    /// Video with the given tracks.
    pub fn new(tracks: Vec<Option<TrackFormat>>) -> Self {
        Self {
            tracks,
            decoded: Arc::new(Mutex::new(VecDeque::new())),
            opened: Vec::new(),
        }
    }

    /// Video with one usable track.
    pub fn single(channels: u16, sample_rate: u32) -> Self {
        Self::new(vec![Some(TrackFormat {
            channels,
            sample_rate,
        })])
    }

    /// Feed for pushing decoded chunks.
    pub fn feed(&self) -> VideoFeed {
        VideoFeed {
            decoded: Arc::clone(&self.decoded),
        }
    }

    /// Track indices opened so far.
    pub fn opened(&self) -> &[usize] {
        &self.opened
    }
}

impl VideoDecoder for ScriptedVideo {
    fn audio_track_count(&self) -> usize {
        self.tracks.len()
    }

    fn open_audio_track(&mut self, index: usize) -> Option<Box<dyn DecodedAudioTrack>> {
        let format = (*self.tracks.get(index)?)?;
        self.opened.push(index);
        Some(Box::new(ScriptedTrack {
            format,
            decoded: Arc::clone(&self.decoded),
        }))
    }
}

struct ScriptedTrack {
    format: TrackFormat,
    decoded: ChunkQueue,
}

impl DecodedAudioTrack for ScriptedTrack {
    fn format(&self) -> TrackFormat {
        self.format
    }

    fn pop_decoded(&mut self) -> Option<Vec<i16>> {
        self.decoded.lock().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_tracks_that_fail_to_open() {
        let mut video = ScriptedVideo::new(vec![
            None,
            Some(TrackFormat {
                channels: 2,
                sample_rate: 48_000,
            }),
        ]);
        assert!(video.open_audio_track(0).is_none());
        let mut track = video.open_audio_track(1).expect("second track opens");
        assert_eq!(video.opened(), &[1]);

        video.feed().decode(vec![1, 2]);
        assert_eq!(track.pop_decoded(), Some(vec![1, 2]));
        assert_eq!(track.pop_decoded(), None);
    }
}
