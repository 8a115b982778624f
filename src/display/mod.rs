// Display module - Handles window creation and frame rendering
//
// This module provides:
// - Double-buffered frame surface (256×240 pixels)
// - Window creation with scaling support (1x to 8x)
// - Frame rendering using winit + pixels
// - Frame pacing and FPS reporting

pub mod fps;
pub mod framebuffer;
pub mod window;

pub use fps::FpsCounter;
pub use framebuffer::{FrameBuffer, FrameSurface, SCREEN_HEIGHT, SCREEN_SIZE, SCREEN_WIDTH};
pub use window::{run_host, HostWindow, WindowConfig};
