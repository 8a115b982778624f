// Retro Host Library
// Real-time host for frame-stepped emulation cores

// Public modules
pub mod audio;
pub mod core;
pub mod display;
pub mod emulator;
pub mod input;

// Re-export main types for convenience
#[cfg(feature = "audio")]
pub use audio::CpalAudioHost;
pub use audio::{AudioConfig, AudioHost, AudioStats, NullAudioHost, SampleRing};
pub use self::core::{
    CoreFactory, CoreOptions, DemoCore, EmulationCore, LoadError, ProgramImage, StepFault,
    StepOutput,
};
pub use display::{FrameBuffer, FrameSurface, WindowConfig};
pub use emulator::{
    EmulationDriver, HostConfig, Session, SessionError, SessionState, StopHandle, TickOutcome,
};
pub use input::{Button, Controller, ControllerState, InputTranslator, KeyMap, Port};
