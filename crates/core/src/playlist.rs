//! Music track ordering.

/// Resolves the track adjacent to the current one.
pub trait TrackOrdering {
    /// Track after `current`; the first track when `current` is empty or unknown.
    fn next_track(&self, current: &str) -> Option<String>;
    /// Track before `current`; the last track when `current` is empty or unknown.
    fn prev_track(&self, current: &str) -> Option<String>;
}

/// A fixed, wrapping list of music event names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MusicPlaylist {
    tracks: Vec<String>,
}

impl MusicPlaylist {
    /// Create a playlist from ordered track names.
    pub fn new(tracks: Vec<String>) -> Self {
        Self { tracks }
    }

    /// Track names in order.
    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    fn position(&self, current: &str) -> Option<usize> {
        self.tracks.iter().position(|track| track == current)
    }
}

impl TrackOrdering for MusicPlaylist {
    fn next_track(&self, current: &str) -> Option<String> {
        if self.tracks.is_empty() {
            return None;
        }
        let index = match self.position(current) {
            Some(i) => (i + 1) % self.tracks.len(),
            None => 0,
        };
        Some(self.tracks[index].clone())
    }

    fn prev_track(&self, current: &str) -> Option<String> {
        if self.tracks.is_empty() {
            return None;
        }
        let len = self.tracks.len();
        let index = match self.position(current) {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        Some(self.tracks[index].clone())
    }
}
