// FPS counter - Measures presented frames per second
//
// Keeps the durations of the most recent frames and averages them, so the
// window title shows a steady figure instead of per-frame jitter.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of frame times kept for averaging
const WINDOW: usize = 60;

/// Rolling frames-per-second counter
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frame_times: VecDeque<Duration>,
    last_frame: Option<Instant>,
    total_frames: u64,
}

impl FpsCounter {
    /// Create an empty counter
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(WINDOW),
            last_frame: None,
            total_frames: 0,
        }
    }

    /// Record a frame presented at `now`
    pub fn record(&mut self, now: Instant) {
        if let Some(last) = self.last_frame {
            if self.frame_times.len() == WINDOW {
                self.frame_times.pop_front();
            }
            self.frame_times.push_back(now.saturating_duration_since(last));
        }
        self.last_frame = Some(now);
        self.total_frames += 1;
    }

    /// Average frames per second over the recent window
    ///
    /// Returns 0.0 until two frames have been recorded.
    pub fn fps(&self) -> f32 {
        let total: Duration = self.frame_times.iter().sum();
        if total.is_zero() {
            return 0.0;
        }
        self.frame_times.len() as f32 / total.as_secs_f32()
    }

    /// Frames recorded since creation or the last reset
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Forget all recorded frames
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
