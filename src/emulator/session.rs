// Session - Load/play/stop lifecycle
//
// A session moves Idle -> Loading -> Running -> Stopped -> Idle, or ends in
// Error when the image cannot be loaded. Everything a running session needs
// (driver, playback connection, input listener, scheduling) is acquired on
// entering Running and released on every exit from it, in this order:
// 1. disarm the scheduler so no further step runs
// 2. disconnect playback so the audio callback stops touching the ring
// 3. unregister the input listener
// 4. drop the driver together with its surface, ring and controller state

use super::driver::{EmulationDriver, StepReport};
use super::scheduler::FrameScheduler;
use crate::audio::{AudioConfig, AudioHost, AudioStats, PlaybackAdapter, SampleRing};
use crate::core::{CoreFactory, CoreOptions, LoadError, ProgramImage, StepFault};
use crate::display::FrameBuffer;
use crate::input::{ControllerState, InputTranslator, KeyMap};
use crossbeam_channel::{Receiver, TryRecvError};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use winit::keyboard::{KeyCode, PhysicalKey};

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded
    Idle,
    /// An image was requested and is waiting to start
    Loading,
    /// Stepping once per refresh
    Running,
    /// Releasing resources
    ///
    /// Only held inside a teardown, which always ends in Idle before control
    /// returns, so `current_state` never reports it. A completed stop is
    /// reported as [`TickOutcome::Stopped`].
    Stopped,
    /// The last load failed
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::Loading => "Loading",
            SessionState::Running => "Running",
            SessionState::Stopped => "Stopped",
            SessionState::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Error reported by the session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Fault(#[from] StepFault),
}

/// Resources currently held by the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resources {
    /// An emulation driver exists
    pub driver: bool,
    /// The playback device is connected
    pub playback: bool,
    /// An input listener is registered
    pub input_listeners: bool,
    /// The scheduler is issuing steps
    pub scheduler_armed: bool,
}

impl Resources {
    /// Check that nothing is held
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of one refresh notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do
    Idle,
    /// Still waiting for the image
    Loading,
    /// The session entered Running; no step was issued
    Started,
    /// One step ran
    Stepped(StepReport),
    /// A latched stop was applied
    Stopped,
}

/// Requests a stop from anywhere, including other threads
///
/// The request is latched and applied by the session at its next refresh. A
/// stop latched while loading cancels the load, or stops the session as soon
/// as it reaches Running if the load completes in that refresh.
#[derive(Debug, Clone)]
pub struct StopHandle {
    latch: Arc<AtomicBool>,
}

impl StopHandle {
    /// Latch a stop request
    pub fn request_stop(&self) {
        self.latch.store(true, Ordering::Release);
    }

    /// Check whether a stop is latched
    pub fn is_requested(&self) -> bool {
        self.latch.load(Ordering::Acquire)
    }
}

/// Where the current image comes from, kept for restarts
#[derive(Debug, Clone)]
enum LoadRequest {
    Image(ProgramImage),
    File(PathBuf),
}

enum PendingLoad {
    Ready(ProgramImage),
    Reading(Receiver<io::Result<ProgramImage>>),
}

/// Lifecycle controller for one host
pub struct Session {
    factory: Box<dyn CoreFactory>,
    audio_host: Box<dyn AudioHost>,
    audio_config: AudioConfig,
    key_map: KeyMap,

    state: SessionState,
    pending: Option<PendingLoad>,
    last_request: Option<LoadRequest>,
    last_error: Option<SessionError>,
    stop_latch: Arc<AtomicBool>,

    image: Option<ProgramImage>,
    driver: Option<EmulationDriver>,
    playback: Option<PlaybackAdapter>,
    input: Option<InputTranslator>,
    scheduler: FrameScheduler,
}

impl Session {
    /// Create an idle session
    ///
    /// `factory` creates a fresh core for every load and `audio_host` opens
    /// the playback device for every run.
    pub fn new(factory: Box<dyn CoreFactory>, audio_host: Box<dyn AudioHost>) -> Self {
        Self {
            factory,
            audio_host,
            audio_config: AudioConfig::default(),
            key_map: KeyMap::player1_default(),
            state: SessionState::Idle,
            pending: None,
            last_request: None,
            last_error: None,
            stop_latch: Arc::new(AtomicBool::new(false)),
            image: None,
            driver: None,
            playback: None,
            input: None,
            scheduler: FrameScheduler::new(),
        }
    }

    /// Use these audio settings for subsequent runs
    pub fn with_audio_config(mut self, config: AudioConfig) -> Self {
        self.audio_config = config;
        self
    }

    /// Use this key table for subsequent runs
    pub fn with_key_map(mut self, key_map: KeyMap) -> Self {
        self.key_map = key_map;
        self
    }

    /// Request a session for `image`
    ///
    /// Any running session is released first. The image starts at the next
    /// refresh.
    pub fn request_load(&mut self, image: ProgramImage) {
        self.last_request = Some(LoadRequest::Image(image.clone()));
        self.begin_loading(PendingLoad::Ready(image));
    }

    /// Request a session for the image stored at `path`
    ///
    /// The file is read on a background thread; the session stays Loading
    /// until it arrives.
    pub fn request_load_file<P: AsRef<Path>>(&mut self, path: P) {
        let path = path.as_ref().to_path_buf();
        self.last_request = Some(LoadRequest::File(path.clone()));

        let (sender, receiver) = crossbeam_channel::bounded(1);
        let reader_path = path.clone();
        let spawned = thread::Builder::new()
            .name("image-loader".to_string())
            .spawn(move || {
                // The session may have moved on; nobody to tell then
                let _ = sender.send(ProgramImage::from_file(&reader_path));
            });
        // On spawn failure the sender is gone and the next refresh reports it
        if let Err(err) = spawned {
            tracing::warn!("Could not start loader for {}: {}", path.display(), err);
        }

        self.begin_loading(PendingLoad::Reading(receiver));
    }

    /// Load the most recent image again
    ///
    /// Returns false if nothing was ever requested.
    pub fn restart(&mut self) -> bool {
        match self.last_request.clone() {
            Some(LoadRequest::Image(image)) => {
                self.request_load(image);
                true
            }
            Some(LoadRequest::File(path)) => {
                self.request_load_file(path);
                true
            }
            None => false,
        }
    }

    /// Stop the session
    ///
    /// - Loading: the pending load is cancelled
    /// - Running: every resource is released
    /// - Error: the error is cleared
    ///
    /// The session is Idle afterwards.
    pub fn request_stop(&mut self) {
        match self.state {
            SessionState::Loading => self.cancel_loading(),
            SessionState::Running => self.teardown(),
            SessionState::Error => {
                self.last_error = None;
                self.state = SessionState::Idle;
                tracing::debug!("Error cleared");
            }
            SessionState::Idle | SessionState::Stopped => {}
        }
    }

    /// Handle that latches a stop from any thread
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            latch: Arc::clone(&self.stop_latch),
        }
    }

    /// Current lifecycle state
    pub fn current_state(&self) -> SessionState {
        self.state
    }

    /// Handle one display refresh
    ///
    /// While Running this issues exactly one step. While Loading it starts the
    /// session once the image is available. A load failure or step fault is
    /// returned here and also kept as [`Session::last_error`].
    pub fn on_refresh(&mut self) -> Result<TickOutcome, SessionError> {
        if self.stop_latch.swap(false, Ordering::AcqRel) {
            match self.state {
                SessionState::Loading => {
                    self.cancel_loading();
                    return Ok(TickOutcome::Stopped);
                }
                SessionState::Running => {
                    self.teardown();
                    return Ok(TickOutcome::Stopped);
                }
                SessionState::Error => self.request_stop(),
                SessionState::Idle | SessionState::Stopped => {}
            }
        }

        match self.state {
            SessionState::Loading => self.advance_loading(),
            SessionState::Running => self.step(),
            SessionState::Idle | SessionState::Stopped | SessionState::Error => {
                Ok(TickOutcome::Idle)
            }
        }
    }

    /// Forward a key event to the controller state
    ///
    /// Ignored unless Running. Returns true if the key was mapped.
    pub fn on_key_event(&mut self, key: KeyCode, pressed: bool) -> bool {
        match (&self.input, self.state) {
            (Some(input), SessionState::Running) => input.on_key_event(key, pressed),
            _ => false,
        }
    }

    /// Forward a winit physical key event
    pub fn on_physical_key(&mut self, key: PhysicalKey, pressed: bool) -> bool {
        match key {
            PhysicalKey::Code(code) => self.on_key_event(code, pressed),
            PhysicalKey::Unidentified(_) => false,
        }
    }

    /// Snapshot of the resources held right now
    pub fn resources(&self) -> Resources {
        Resources {
            driver: self.driver.is_some(),
            playback: self
                .playback
                .as_ref()
                .is_some_and(|playback| playback.is_connected()),
            input_listeners: self.input.is_some(),
            scheduler_armed: self.scheduler.is_armed(),
        }
    }

    /// Sample ring statistics of the running session
    pub fn stats(&self) -> Option<AudioStats> {
        self.driver.as_ref().map(|driver| driver.ring().stats())
    }

    /// Last committed frame of the running session
    pub fn frame(&self) -> Option<&FrameBuffer> {
        self.driver.as_ref().map(|driver| driver.frame())
    }

    /// Controller state of the running session
    pub fn controllers(&self) -> Option<&Arc<ControllerState>> {
        self.driver.as_ref().map(|driver| driver.controllers())
    }

    /// Steps issued since the session entered Running
    pub fn steps(&self) -> u64 {
        self.scheduler.ticks()
    }

    /// Name of the running image
    pub fn image_name(&self) -> Option<&str> {
        self.image.as_ref().map(|image| image.name())
    }

    /// Name of the playback device, if one is connected
    pub fn audio_device(&self) -> Option<&str> {
        self.playback
            .as_ref()
            .and_then(|playback| playback.device_name())
    }

    /// Most recent load failure or step fault
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    fn begin_loading(&mut self, pending: PendingLoad) {
        if self.state == SessionState::Running {
            self.teardown();
        }
        self.stop_latch.store(false, Ordering::Release);
        self.last_error = None;
        self.pending = Some(pending);
        self.state = SessionState::Loading;
        tracing::info!("Session loading");
    }

    fn cancel_loading(&mut self) {
        self.pending = None;
        self.state = SessionState::Idle;
        tracing::info!("Load cancelled");
    }

    fn advance_loading(&mut self) -> Result<TickOutcome, SessionError> {
        let image = match self.pending.take() {
            Some(PendingLoad::Ready(image)) => image,
            Some(PendingLoad::Reading(receiver)) => match receiver.try_recv() {
                Ok(Ok(image)) => image,
                Ok(Err(err)) => return Err(self.fail_load(LoadError::Unreadable(err.to_string()))),
                Err(TryRecvError::Empty) => {
                    self.pending = Some(PendingLoad::Reading(receiver));
                    return Ok(TickOutcome::Loading);
                }
                Err(TryRecvError::Disconnected) => {
                    return Err(self.fail_load(LoadError::Unreadable(
                        "image loader stopped without a result".to_string(),
                    )));
                }
            },
            None => {
                self.state = SessionState::Idle;
                return Ok(TickOutcome::Idle);
            }
        };

        self.start(image)
    }

    fn start(&mut self, image: ProgramImage) -> Result<TickOutcome, SessionError> {
        let config = self.audio_config.clone();
        let ring = Arc::new(SampleRing::new(config.ring_capacity.max(1)));
        let controllers = Arc::new(ControllerState::new());

        let core = self.factory.create(CoreOptions {
            sample_rate: config.sample_rate,
        });
        let mut driver = EmulationDriver::new(core, Arc::clone(&ring), Arc::clone(&controllers));
        if let Err(err) = driver.load(&image) {
            return Err(self.fail_load(err));
        }

        self.playback =
            match PlaybackAdapter::connect(self.audio_host.as_mut(), &config, Arc::clone(&ring)) {
                Ok(playback) => Some(playback),
                Err(err) => {
                    tracing::warn!("{}; running without sound", err);
                    None
                }
            };
        self.input = Some(InputTranslator::new(self.key_map.clone(), controllers));
        self.driver = Some(driver);
        self.scheduler.arm();
        tracing::info!("Session running: {} ({} bytes)", image.name(), image.len());
        self.image = Some(image);
        self.state = SessionState::Running;

        if self.stop_latch.swap(false, Ordering::AcqRel) {
            tracing::info!("Stop was requested during load");
            self.teardown();
            return Ok(TickOutcome::Stopped);
        }
        Ok(TickOutcome::Started)
    }

    fn step(&mut self) -> Result<TickOutcome, SessionError> {
        if !self.scheduler.tick() {
            return Ok(TickOutcome::Idle);
        }
        let Some(driver) = self.driver.as_mut() else {
            return Ok(TickOutcome::Idle);
        };

        match driver.step() {
            Ok(report) => Ok(TickOutcome::Stepped(report)),
            Err(fault) => {
                tracing::error!("Emulation fault: {}", fault);
                self.teardown();
                let err = SessionError::Fault(fault);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn fail_load(&mut self, err: LoadError) -> SessionError {
        tracing::error!("Load failed: {}", err);
        self.release();
        self.pending = None;
        self.state = SessionState::Error;
        let err = SessionError::Load(err);
        self.last_error = Some(err.clone());
        err
    }

    /// Leave Running through Stopped to Idle
    fn teardown(&mut self) {
        self.state = SessionState::Stopped;
        self.release();
        tracing::info!("Session stopped");
        self.state = SessionState::Idle;
    }

    fn release(&mut self) {
        self.scheduler.disarm();
        if let Some(mut playback) = self.playback.take() {
            playback.disconnect();
        }
        self.input = None;
        if let Some(driver) = self.driver.take() {
            let stats = driver.ring().stats();
            tracing::debug!(
                "Released driver after {} steps ({} samples produced, {} dropped, {} underruns)",
                driver.steps(),
                stats.samples_produced,
                stats.samples_dropped,
                stats.underruns
            );
        }
        self.image = None;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state == SessionState::Running {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudioHost;
    use crate::core::{DemoCore, EmulationCore, BUILTIN_IMAGE};

    fn demo_session() -> Session {
        let factory =
            |options: CoreOptions| Box::new(DemoCore::new(options)) as Box<dyn EmulationCore>;
        Session::new(Box::new(factory), Box::new(NullAudioHost))
    }

    fn builtin() -> ProgramImage {
        ProgramImage::from_bytes("builtin", BUILTIN_IMAGE)
    }

    #[test]
    fn test_starts_idle() {
        let session = demo_session();
        assert_eq!(session.current_state(), SessionState::Idle);
        assert!(session.resources().is_empty());
        assert!(session.frame().is_none());
    }

    #[test]
    fn test_load_then_run() {
        let mut session = demo_session();
        session.request_load(builtin());
        assert_eq!(session.current_state(), SessionState::Loading);

        assert_eq!(session.on_refresh(), Ok(TickOutcome::Started));
        assert_eq!(session.current_state(), SessionState::Running);
        assert_eq!(session.image_name(), Some("builtin"));

        assert!(matches!(session.on_refresh(), Ok(TickOutcome::Stepped(_))));
        assert_eq!(session.steps(), 1);
    }

    #[test]
    fn test_null_audio_runs_without_playback() {
        let mut session = demo_session();
        session.request_load(builtin());
        session.on_refresh().unwrap();

        let resources = session.resources();
        assert!(resources.driver);
        assert!(!resources.playback);
        assert!(resources.input_listeners);
        assert!(resources.scheduler_armed);
    }

    #[test]
    fn test_stop_from_error_returns_to_idle() {
        let mut session = demo_session();
        session.request_load(ProgramImage::from_bytes("empty", Vec::new()));
        assert_eq!(
            session.on_refresh(),
            Err(SessionError::Load(LoadError::Empty))
        );
        assert_eq!(session.current_state(), SessionState::Error);
        assert!(session.last_error().is_some());

        session.request_stop();
        assert_eq!(session.current_state(), SessionState::Idle);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_latched_stop_clears_error() {
        let mut session = demo_session();
        session.request_load(ProgramImage::from_bytes("empty", Vec::new()));
        assert!(session.on_refresh().is_err());
        assert_eq!(session.current_state(), SessionState::Error);

        session.stop_handle().request_stop();
        assert_eq!(session.on_refresh(), Ok(TickOutcome::Idle));
        assert_eq!(session.current_state(), SessionState::Idle);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_stopped_is_never_observed() {
        let mut session = demo_session();
        session.request_load(builtin());
        session.on_refresh().unwrap();

        session.stop_handle().request_stop();
        assert_eq!(session.on_refresh(), Ok(TickOutcome::Stopped));
        assert_ne!(session.current_state(), SessionState::Stopped);
        assert_eq!(session.current_state(), SessionState::Idle);
    }

    #[test]
    fn test_cancel_while_loading() {
        let mut session = demo_session();
        session.request_load(builtin());
        session.request_stop();
        assert_eq!(session.current_state(), SessionState::Idle);
        assert_eq!(session.on_refresh(), Ok(TickOutcome::Idle));
        assert!(session.resources().is_empty());
    }

    #[test]
    fn test_latched_stop_cancels_pending_load() {
        let mut session = demo_session();
        session.request_load(builtin());
        session.stop_handle().request_stop();

        assert_eq!(session.on_refresh(), Ok(TickOutcome::Stopped));
        assert_eq!(session.current_state(), SessionState::Idle);
        assert!(session.resources().is_empty());
    }

    #[test]
    fn test_stale_latch_ignored_by_new_load() {
        let mut session = demo_session();
        session.stop_handle().request_stop();
        session.request_load(builtin());
        assert_eq!(session.on_refresh(), Ok(TickOutcome::Started));
    }

    #[test]
    fn test_restart() {
        let mut session = demo_session();
        assert!(!session.restart());

        session.request_load(builtin());
        session.on_refresh().unwrap();
        session.on_refresh().unwrap();

        assert!(session.restart());
        assert_eq!(session.current_state(), SessionState::Loading);
        assert!(session.resources().is_empty());
        assert_eq!(session.on_refresh(), Ok(TickOutcome::Started));
        assert_eq!(session.steps(), 0);
    }

    #[test]
    fn test_keys_ignored_unless_running() {
        let mut session = demo_session();
        assert!(!session.on_key_event(KeyCode::KeyX, true));

        session.request_load(builtin());
        session.on_refresh().unwrap();
        assert!(session.on_key_event(KeyCode::KeyX, true));
        assert!(!session.on_key_event(KeyCode::KeyQ, true));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Running.to_string(), "Running");
        assert_eq!(SessionState::Error.to_string(), "Error");
    }
}
