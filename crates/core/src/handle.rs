//! Audio handles and their allocator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Opaque identifier for one playing sound.
///
/// A handle is only meaningful while the coordinator still tracks a sound
/// for it. Control requests on a handle that has finished are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AudioHandle(pub u32);

impl AudioHandle {
    /// No sound.
    pub const NONE: Self = Self(0);
    /// Stop every music sound.
    pub const STOP_THE_MUSIC: Self = Self(1);
    /// Stop every music sound (fade requested; stops immediately).
    pub const STOP_THE_MUSIC_FADE: Self = Self(2);

    /// First value handed out by [`HandleAllocator`].
    pub const FIRST_ALLOCATED: u32 = 16;

    /// Whether this is one of the reserved music-stop sentinels.
    pub fn is_music_sentinel(self) -> bool {
        self == Self::STOP_THE_MUSIC || self == Self::STOP_THE_MUSIC_FADE
    }

    /// Whether the handle refers to an allocated (non-reserved) value.
    pub fn is_allocated(self) -> bool {
        self.0 >= Self::FIRST_ALLOCATED
    }
}

impl fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic handle source, shareable between the simulation and the
/// audio coordinator.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU32,
}

impl HandleAllocator {
    /// Create an allocator starting above the reserved range.
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(AudioHandle::FIRST_ALLOCATED),
        }
    }

    /// Hand out a fresh handle.
    pub fn allocate(&self) -> AudioHandle {
        let mut value = self.next.fetch_add(1, Ordering::Relaxed);
        if value < AudioHandle::FIRST_ALLOCATED {
            // Wrapped around: skip the reserved range.
            self.next
                .store(AudioHandle::FIRST_ALLOCATED + 1, Ordering::Relaxed);
            value = AudioHandle::FIRST_ALLOCATED;
        }
        AudioHandle(value)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
