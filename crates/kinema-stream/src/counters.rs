//! Frame accounting for the video lane.
//!
//! Audio is a byte stream with no drop concept, so only video is counted.

use kinema_core::FrameStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotone counters for frames pulled and frames sacrificed to keep up
/// with the configured playback speed.
///
/// Counters are owned per engine instance (not process-wide) and are reset
/// only when a new source is opened.
#[derive(Debug, Default)]
pub struct FrameCounters {
    frames_read: AtomicU64,
    frames_dropped: AtomicU64,
}

impl FrameCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one video pull that consumed `n` frames in the decoder.
    ///
    /// Only the newest of the `n` frames reaches listeners, so `n - 1`
    /// frames were dropped. A pull with `n == 0` records nothing.
    pub fn record(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.frames_read.fetch_add(n, Ordering::Relaxed);
        if n > 1 {
            self.frames_dropped.fetch_add(n - 1, Ordering::Relaxed);
        }
    }

    /// Snapshot both counters.
    pub fn snapshot(&self) -> FrameStats {
        FrameStats {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }

    /// Reset both counters to zero. Called when a new source is opened.
    pub fn reset(&self) {
        self.frames_read.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
    }
}
