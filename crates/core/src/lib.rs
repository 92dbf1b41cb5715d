#![warn(missing_docs)]
//! Core primitives shared across the workspace: simulation ticks, audio
//! handles, event metadata and the collaborators that resolve it.

mod event;
mod handle;
mod playlist;
mod registry;

use serde::{Deserialize, Serialize};

pub use event::{AudioAffect, AudioEvent, Category, EventInfo, ShiftRange};
pub use handle::{AudioHandle, HandleAllocator};
pub use playlist::{MusicPlaylist, TrackOrdering};
pub use registry::{EventRegistry, EventResolver, RegistryError};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Wall-clock length of one tick in milliseconds.
    pub const MILLIS: u64 = 50;

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances() {
        assert_eq!(SimTick::ZERO.advance(3), SimTick(3));
    }

    #[test]
    fn ticks_order_and_serialize_as_numbers() {
        assert!(SimTick(2) < SimTick(10));
        assert_eq!(serde_json::to_string(&SimTick(42)).unwrap(), "42");
    }
}
