// Sample ring - Bounded lock-free FIFO between the emulation step and the
// audio device
//
// The step pushes samples on the event-loop thread; the playback callback pulls
// fixed-size blocks on the audio thread. Neither side blocks:
// - a full ring evicts its oldest samples to make room (drop-oldest)
// - a pull that finds fewer samples than a block returns silence and leaves
//   the ring untouched

use super::AudioStats;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default ring capacity in samples
pub const DEFAULT_RING_CAPACITY: usize = 8192;

/// Bounded single-producer/single-consumer sample queue
pub struct SampleRing {
    queue: ArrayQueue<f32>,
    produced: AtomicU64,
    dropped: AtomicU64,
    pulled: AtomicU64,
    underruns: AtomicU64,
}

impl SampleRing {
    /// Create a ring holding at most `capacity` samples
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sample ring capacity must be non-zero");
        Self {
            queue: ArrayQueue::new(capacity),
            produced: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            pulled: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
        }
    }

    /// Append one sample, evicting the oldest if the ring is full
    ///
    /// Returns false if a sample was evicted.
    pub fn push(&self, sample: f32) -> bool {
        self.produced.fetch_add(1, Ordering::Relaxed);
        if self.queue.force_push(sample).is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        } else {
            true
        }
    }

    /// Append samples in order
    pub fn extend(&self, samples: &[f32]) {
        for &sample in samples {
            self.push(sample);
        }
    }

    /// Fill `out` with the oldest `out.len()` samples
    ///
    /// Removes the samples it returns. When fewer than `out.len()` samples are
    /// buffered, `out` is filled with silence, nothing is removed, and false is
    /// returned.
    pub fn pull_block(&self, out: &mut [f32]) -> bool {
        if self.queue.len() < out.len() {
            out.fill(0.0);
            self.underruns.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // Only this consumer removes samples and a concurrent force_push never
        // shrinks the queue, so every pop here finds a sample.
        for slot in out.iter_mut() {
            *slot = self.queue.pop().unwrap_or(0.0);
        }
        self.pulled.fetch_add(out.len() as u64, Ordering::Relaxed);
        true
    }

    /// Number of buffered samples
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check whether the ring is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Check whether the ring is full
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Maximum number of buffered samples
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Discard every buffered sample
    pub fn clear(&self) {
        while self.queue.pop().is_some() {}
    }

    /// Counters and fill level
    pub fn stats(&self) -> AudioStats {
        AudioStats {
            samples_produced: self.produced.load(Ordering::Relaxed),
            samples_dropped: self.dropped.load(Ordering::Relaxed),
            samples_pulled: self.pulled.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            buffer_len: self.len(),
            buffer_capacity: self.capacity(),
        }
    }
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}
