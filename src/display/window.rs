// Window module - Manages display window and rendering
//
// This module provides window creation, scaling, and frame rendering
// using the winit and pixels crates. Every paced redraw is one refresh
// notification for the session.

use super::fps::FpsCounter;
use super::framebuffer::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::emulator::{FramePacer, Session, SessionState, TickOutcome};
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const TITLE: &str = "Retro Host";

/// How often the FPS figure in the title is refreshed
const TITLE_INTERVAL: Duration = Duration::from_millis(500);

/// Window configuration
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    /// Scale factor (1x, 2x, 3x, 4x, etc.)
    pub scale: u32,
    /// Target frame rate in Hz
    pub target_fps: u32,
    /// Whether to enable VSync
    pub vsync: bool,
}

impl WindowConfig {
    /// Create a new window configuration with default values
    ///
    /// Default: 3x scale, 60 FPS, VSync enabled
    pub fn new() -> Self {
        Self {
            scale: 3,
            target_fps: 60,
            vsync: true,
        }
    }

    /// Set the scale factor
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.clamp(1, 8); // Clamp between 1x and 8x
        self
    }

    /// Set the target frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps.max(1);
        self
    }

    /// Set VSync enabled or disabled
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Get the window width in pixels
    pub fn window_width(&self) -> u32 {
        SCREEN_WIDTH as u32 * self.scale
    }

    /// Get the window height in pixels
    pub fn window_height(&self) -> u32 {
        SCREEN_HEIGHT as u32 * self.scale
    }

    /// Get the frame duration for the target FPS
    pub fn frame_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.target_fps as u64)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Host window - presents the session and feeds it refreshes and keys
pub struct HostWindow {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    config: WindowConfig,
    session: Session,
    pacer: FramePacer,
    fps: FpsCounter,
    last_title_update: Instant,
}

impl HostWindow {
    /// Create a new host window (window will be created when event loop starts)
    pub fn new(config: WindowConfig, session: Session) -> Self {
        Self {
            window: None,
            pixels: None,
            config,
            session,
            pacer: FramePacer::new(config.frame_duration()),
            fps: FpsCounter::new(),
            last_title_update: Instant::now(),
        }
    }

    /// Get a reference to the session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get a mutable reference to the session
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run one refresh of the session and present its frame
    fn refresh_and_render(&mut self) -> Result<(), pixels::Error> {
        match self.session.on_refresh() {
            Ok(TickOutcome::Started) => self.fps.reset(),
            Ok(_) => {}
            Err(err) => tracing::error!("Session ended: {}", err),
        }

        if let Some(pixels) = &mut self.pixels {
            let frame = pixels.frame_mut();
            match self.session.frame() {
                Some(buffer) => buffer.to_rgba(frame),
                None => {
                    for rgba in frame.chunks_exact_mut(4) {
                        rgba.copy_from_slice(&[0, 0, 0, 0xFF]);
                    }
                }
            }
            pixels.render()?;
        }
        Ok(())
    }

    fn update_title(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_title_update) < TITLE_INTERVAL {
            return;
        }
        self.last_title_update = now;

        let title = match (self.session.current_state(), self.session.image_name()) {
            (SessionState::Running, Some(name)) => {
                format!("{} - {} - {:.1} FPS", TITLE, name, self.fps.fps())
            }
            (state, _) => format!("{} - {}", TITLE, state),
        };
        if let Some(window) = &self.window {
            window.set_title(&title);
        }
    }

    /// Keys handled by the host itself rather than the controller
    fn handle_hotkey(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Escape => {
                tracing::info!("Stop requested");
                self.session.request_stop();
                true
            }
            KeyCode::F1 => {
                if !self.session.restart() {
                    tracing::warn!("Nothing to reload");
                }
                true
            }
            _ => false,
        }
    }
}

impl ApplicationHandler for HostWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        // Create window
        let window_attributes = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(
                self.config.window_width(),
                self.config.window_height(),
            ))
            .with_resizable(false);

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                tracing::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };
        let window_size = window.inner_size();

        // Create surface texture using Arc<Window> for safe 'static lifetime
        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());

        let pixels =
            match Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface_texture) {
                Ok(pixels) => pixels,
                Err(err) => {
                    tracing::error!("Failed to create pixel buffer: {}", err);
                    event_loop.exit();
                    return;
                }
            };

        self.window = Some(window);
        self.pixels = Some(pixels);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting...");
                self.session.request_stop();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key,
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if let PhysicalKey::Code(key) = physical_key {
                    if pressed && !repeat && self.handle_hotkey(key) {
                        return;
                    }
                }
                self.session.on_physical_key(physical_key, pressed);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                // Step and render if enough time has passed
                if self.pacer.is_due(now) {
                    if let Err(err) = self.refresh_and_render() {
                        tracing::error!("Render error: {}", err);
                        self.session.request_stop();
                        event_loop.exit();
                        return;
                    }
                    self.fps.record(now);
                }
                self.update_title(now);

                // Request next frame
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Create the window and run the session until it is closed
///
/// # Arguments
/// * `config` - Window configuration
/// * `session` - Session with its first load already requested (or idle)
pub fn run_host(config: WindowConfig, session: Session) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;

    // Set control flow based on VSync setting
    if config.vsync {
        event_loop.set_control_flow(ControlFlow::Wait);
    } else {
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    tracing::info!("Starting host window...");
    tracing::info!("  Resolution: {}x{}", SCREEN_WIDTH, SCREEN_HEIGHT);
    tracing::info!(
        "  Window size: {}x{}",
        config.window_width(),
        config.window_height()
    );
    tracing::info!("  Scale: {}x", config.scale);
    tracing::info!("  Target FPS: {}", config.target_fps);
    tracing::info!("  VSync: {}", config.vsync);

    let mut host = HostWindow::new(config, session);
    event_loop.run_app(&mut host)?;

    Ok(())
}
