// Core module - Boundary to the emulation engine
//
// The host never looks inside the emulated hardware. It only needs an engine
// that can load a program image, advance one video frame per call, and report
// that frame's pixels and audio samples. This module describes that contract
// and provides a small built-in test-pattern core.

pub mod demo;

pub use demo::{DemoCore, BUILTIN_IMAGE};

use crate::input::{Button, Port};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Error raised when a program image cannot be loaded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The image has no bytes
    #[error("program image is empty")]
    Empty,

    /// The image is structurally invalid
    #[error("malformed program image: {0}")]
    Malformed(String),

    /// The core refused the image
    #[error("core rejected program image: {0}")]
    Rejected(String),

    /// The image could not be read from its source
    #[error("could not read program image: {0}")]
    Unreadable(String),
}

/// Unrecoverable fault raised by the core during a step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepFault {
    /// Fault reported by the core itself
    #[error("core fault: {0}")]
    Core(String),

    /// The core emitted a frame with the wrong number of pixels
    #[error("frame has {found} pixels, expected {expected}")]
    FrameSize { expected: usize, found: usize },

    /// Step was attempted before an image was loaded
    #[error("no program image loaded")]
    NotLoaded,
}

/// Options handed to a core when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreOptions {
    /// Output sample rate in Hz the core should emit audio at
    pub sample_rate: u32,
}

/// Receiver for one step's output
///
/// `on_frame` borrows the core's pixel storage for the duration of the call
/// only; implementations copy what they need before returning.
pub trait StepOutput {
    /// One full frame of `0x00RRGGBB` pixels, row-major
    fn on_frame(&mut self, pixels: &[u32]);

    /// One mono sample in `[-1.0, 1.0]`
    fn on_sample(&mut self, sample: f32);
}

/// A frame-stepped emulation engine
pub trait EmulationCore {
    /// Load a program image
    fn load(&mut self, image: &[u8]) -> Result<(), LoadError>;

    /// Advance exactly one video frame
    ///
    /// Must emit one frame through `output.on_frame` and zero or more samples
    /// through `output.on_sample`, in emission order.
    fn step(&mut self, output: &mut dyn StepOutput) -> Result<(), StepFault>;

    /// Set the level of a controller button
    fn set_button(&mut self, port: Port, button: Button, pressed: bool);
}

/// Creates a fresh core for each session
pub trait CoreFactory {
    fn create(&mut self, options: CoreOptions) -> Box<dyn EmulationCore>;
}

impl<F> CoreFactory for F
where
    F: FnMut(CoreOptions) -> Box<dyn EmulationCore>,
{
    fn create(&mut self, options: CoreOptions) -> Box<dyn EmulationCore> {
        self(options)
    }
}

/// Program data supplied by the caller
///
/// Immutable once created. The session owns it while it plays and drops it
/// on stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    name: String,
    data: Vec<u8>,
}

impl ProgramImage {
    /// Create an image from bytes
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Read an image from a file, named after the file
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, data })
    }

    /// Display name (usually the file name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw image bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the image has no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
