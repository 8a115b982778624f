// Emulation driver - Runs the core one frame at a time
//
// Each step feeds the current controller snapshot to the core, then routes the
// frame it emits into the surface's back buffer and its samples into the ring.

use crate::audio::SampleRing;
use crate::core::{EmulationCore, LoadError, ProgramImage, StepFault, StepOutput};
use crate::display::{FrameBuffer, FrameSurface, SCREEN_SIZE};
use crate::input::{Button, ControllerState, Port};
use std::sync::Arc;

/// What one step produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Frames committed to the surface (0 or 1)
    pub frames: u32,

    /// Samples appended to the ring
    pub samples: usize,
}

/// Owns a core and connects its output to the host
pub struct EmulationDriver {
    core: Box<dyn EmulationCore>,
    surface: FrameSurface,
    ring: Arc<SampleRing>,
    controllers: Arc<ControllerState>,
    loaded: bool,
    steps: u64,
}

impl EmulationDriver {
    /// Wrap `core`, sending samples to `ring` and reading `controllers`
    pub fn new(
        core: Box<dyn EmulationCore>,
        ring: Arc<SampleRing>,
        controllers: Arc<ControllerState>,
    ) -> Self {
        Self {
            core,
            surface: FrameSurface::new(),
            ring,
            controllers,
            loaded: false,
            steps: 0,
        }
    }

    /// Load a program image into the core
    ///
    /// A driver whose last load failed refuses to step.
    pub fn load(&mut self, image: &ProgramImage) -> Result<(), LoadError> {
        self.loaded = false;
        if image.is_empty() {
            return Err(LoadError::Empty);
        }
        self.core.load(image.as_bytes())?;
        self.loaded = true;
        self.steps = 0;
        Ok(())
    }

    /// Advance the core by one frame
    pub fn step(&mut self) -> Result<StepReport, StepFault> {
        if !self.loaded {
            return Err(StepFault::NotLoaded);
        }

        for port in Port::ALL {
            let bits = self.controllers.bits(port);
            for button in Button::ALL {
                self.core.set_button(port, button, bits & button.bit() != 0);
            }
        }

        let mut sink = StepSink {
            surface: &mut self.surface,
            ring: &self.ring,
            frames: 0,
            bad_frame: None,
            samples: 0,
        };
        self.core.step(&mut sink)?;

        if let Some(found) = sink.bad_frame {
            return Err(StepFault::FrameSize {
                expected: SCREEN_SIZE,
                found,
            });
        }

        let report = StepReport {
            frames: sink.frames,
            samples: sink.samples,
        };
        if report.frames > 0 {
            self.surface.commit();
        }
        self.steps += 1;
        Ok(report)
    }

    /// Check whether an image is loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Steps completed since the last load
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Last committed frame
    pub fn frame(&self) -> &FrameBuffer {
        self.surface.front()
    }

    /// Frames committed since the driver was created
    pub fn frames_committed(&self) -> u64 {
        self.surface.frames_committed()
    }

    /// Ring receiving the core's samples
    pub fn ring(&self) -> &Arc<SampleRing> {
        &self.ring
    }

    /// Controller state read before each step
    pub fn controllers(&self) -> &Arc<ControllerState> {
        &self.controllers
    }
}

/// StepOutput routing one step's output into the surface and ring
struct StepSink<'a> {
    surface: &'a mut FrameSurface,
    ring: &'a SampleRing,
    frames: u32,
    bad_frame: Option<usize>,
    samples: usize,
}

impl StepOutput for StepSink<'_> {
    fn on_frame(&mut self, pixels: &[u32]) {
        if self.surface.write(pixels) {
            // A second frame in one step replaces the first
            self.frames = 1;
        } else {
            self.bad_frame = Some(pixels.len());
        }
    }

    fn on_sample(&mut self, sample: f32) {
        self.ring.push(sample);
        self.samples += 1;
    }
}
