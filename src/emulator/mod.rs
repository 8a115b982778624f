// Emulator module - Drives the emulation core in real time
//
// This module provides the session that owns the core while it plays: the
// driver stepping it once per display refresh, the scheduling handle, the
// load/play/stop lifecycle, and the persisted host configuration.

mod config;
mod driver;
mod scheduler;
mod session;

pub use config::{AudioSettings, ConfigError, HostConfig, VideoConfig, CONFIG_FILE};
pub use driver::{EmulationDriver, StepReport};
pub use scheduler::{FramePacer, FrameScheduler};
pub use session::{
    Resources, Session, SessionError, SessionState, StopHandle, TickOutcome,
};
