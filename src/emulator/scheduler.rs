// Frame scheduling
//
// The display's repaint notification drives emulation: one step per paced
// refresh while the scheduler is armed, none otherwise.

use std::time::{Duration, Instant};

/// Scheduling handle for the emulation step
///
/// Armed on entering Running and disarmed before anything the step touches
/// is released.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    armed: bool,
    ticks: u64,
}

impl FrameScheduler {
    /// Create a disarmed scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Start issuing steps
    pub fn arm(&mut self) {
        self.armed = true;
        self.ticks = 0;
    }

    /// Stop issuing steps
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Check whether steps are being issued
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Handle one refresh notification
    ///
    /// Returns true if a step should run for it.
    pub fn tick(&mut self) -> bool {
        if self.armed {
            self.ticks += 1;
        }
        self.armed
    }

    /// Steps issued since the scheduler was last armed
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Limits refreshes to a target frame duration
///
/// Deadlines sit on a fixed grid of `frame_duration` periods, so jitter in the
/// repaint notifications neither skips frames nor makes the rate drift. A
/// notification up to a quarter period early still counts for the upcoming
/// deadline. Falling more than a whole period behind restarts the grid.
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame_duration: Duration,
    next_deadline: Option<Instant>,
}

impl FramePacer {
    /// Create a pacer allowing one frame per `frame_duration`
    pub fn new(frame_duration: Duration) -> Self {
        Self {
            frame_duration,
            next_deadline: None,
        }
    }

    /// Check if the next frame is due at `now`
    ///
    /// The first call is always due. A due call moves the deadline forward by
    /// one period.
    pub fn is_due(&mut self, now: Instant) -> bool {
        let slack = self.frame_duration / 4;
        match self.next_deadline {
            Some(deadline) if now + slack < deadline => false,
            Some(deadline) if now < deadline + self.frame_duration => {
                self.next_deadline = Some(deadline + self.frame_duration);
                true
            }
            _ => {
                self.next_deadline = Some(now + self.frame_duration);
                true
            }
        }
    }

    /// Target frame duration
    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }
}
