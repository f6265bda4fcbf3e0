// Playhead position shared with the playback thread
//
// This is the only state read outside the model thread. It is a single
// beat value stored as f64 bits in an atomic; the sequences themselves are
// never touched by the playback side.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Current playback position in beats
#[derive(Debug)]
pub struct PlayheadPosition {
    beat_bits: AtomicU64,
}

impl PlayheadPosition {
    /// Create a new shared playhead at beat 0
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            beat_bits: AtomicU64::new(0.0f64.to_bits()),
        })
    }

    /// Get current position in beats
    pub fn beat(&self) -> f64 {
        f64::from_bits(self.beat_bits.load(Ordering::Acquire))
    }

    /// Set position in beats
    pub fn set_beat(&self, beat: f64) {
        self.beat_bits.store(beat.to_bits(), Ordering::Release);
    }

    /// Advance position by `delta` beats, returning the new position
    pub fn advance(&self, delta: f64) -> f64 {
        let previous = self
            .beat_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f64::from_bits(previous) + delta
    }
}
