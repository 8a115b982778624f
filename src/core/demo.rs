// Demo core - Built-in test-pattern engine
//
// Lets the host run without an external emulation engine. Any non-empty image
// is accepted; its bytes seed a scrolling tile pattern. The D-pad scrolls the
// pattern and A/B play a square-wave tone, which makes the video, audio and
// input paths easy to check by eye and ear.

use super::{CoreOptions, EmulationCore, LoadError, StepFault, StepOutput};
use crate::display::{SCREEN_HEIGHT, SCREEN_SIZE, SCREEN_WIDTH};
use crate::input::{Button, Port};

/// Image used when the host is started without one
pub const BUILTIN_IMAGE: &[u8] = b"RETRO-HOST BUILTIN TEST PATTERN";

const INES_MAGIC: &[u8; 4] = b"NES\x1A";
const INES_HEADER_LEN: usize = 16;

/// Video frames per second the core emits audio for
const FRAME_RATE: u64 = 60;

const TILE_SIZE: i32 = 16;
const SCROLL_SPEED: i32 = 2;
const AMPLITUDE: f32 = 0.1;

const PALETTE: [u32; 16] = [
    0x1D2B53, 0x7E2553, 0x008751, 0xAB5236, 0x5F574F, 0xC2C3C7, 0xFFF1E8, 0xFF004D,
    0xFFA300, 0xFFEC27, 0x00E436, 0x29ADFF, 0x83769C, 0xFF77A8, 0xFFCCAA, 0x000000,
];

/// Test-pattern emulation core
pub struct DemoCore {
    sample_rate: u32,
    seed: u32,
    loaded: bool,
    frames: u64,
    scroll_x: i32,
    scroll_y: i32,
    buttons: [u8; 2],
    phase: f32,
    pixels: Vec<u32>,
}

impl DemoCore {
    /// Create a core emitting audio at `options.sample_rate`
    pub fn new(options: CoreOptions) -> Self {
        Self {
            sample_rate: options.sample_rate.max(1),
            seed: 0,
            loaded: false,
            frames: 0,
            scroll_x: 0,
            scroll_y: 0,
            buttons: [0; 2],
            phase: 0.0,
            pixels: vec![0; SCREEN_SIZE],
        }
    }

    /// Number of frames stepped since load
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn is_pressed(&self, port: Port, button: Button) -> bool {
        let index = match port {
            Port::One => 0,
            Port::Two => 1,
        };
        self.buttons[index] & button.bit() != 0
    }

    /// Samples owed for the current frame, spreading the remainder of
    /// `sample_rate / 60` evenly across frames
    fn samples_this_frame(&self) -> usize {
        let rate = self.sample_rate as u64;
        let before = rate * self.frames / FRAME_RATE;
        let after = rate * (self.frames + 1) / FRAME_RATE;
        (after - before) as usize
    }

    fn tone_frequency(&self) -> Option<f32> {
        match (
            self.is_pressed(Port::One, Button::A),
            self.is_pressed(Port::One, Button::B),
        ) {
            (true, true) => Some(550.0),
            (true, false) => Some(440.0),
            (false, true) => Some(330.0),
            (false, false) => None,
        }
    }

    fn scroll(&mut self) {
        if self.is_pressed(Port::One, Button::Left) {
            self.scroll_x -= SCROLL_SPEED;
        }
        if self.is_pressed(Port::One, Button::Right) {
            self.scroll_x += SCROLL_SPEED;
        }
        if self.is_pressed(Port::One, Button::Up) {
            self.scroll_y -= SCROLL_SPEED;
        }
        if self.is_pressed(Port::One, Button::Down) {
            self.scroll_y += SCROLL_SPEED;
        }
    }

    fn render(&mut self) {
        let offset = self.seed as usize;
        for y in 0..SCREEN_HEIGHT {
            let ty = (y as i32 + self.scroll_y).div_euclid(TILE_SIZE);
            for x in 0..SCREEN_WIDTH {
                let tx = (x as i32 + self.scroll_x).div_euclid(TILE_SIZE);
                let index = (tx + ty * 3).rem_euclid(PALETTE.len() as i32) as usize;
                self.pixels[y * SCREEN_WIDTH + x] = PALETTE[(index + offset) % PALETTE.len()];
            }
        }
    }
}

impl EmulationCore for DemoCore {
    fn load(&mut self, image: &[u8]) -> Result<(), LoadError> {
        if image.is_empty() {
            return Err(LoadError::Empty);
        }
        if image.starts_with(INES_MAGIC) && image.len() < INES_HEADER_LEN {
            return Err(LoadError::Malformed(format!(
                "iNES header truncated to {} bytes",
                image.len()
            )));
        }

        // FNV-1a
        self.seed = image.iter().fold(0x811C_9DC5u32, |hash, &byte| {
            (hash ^ byte as u32).wrapping_mul(0x0100_0193)
        });
        self.loaded = true;
        self.frames = 0;
        self.scroll_x = 0;
        self.scroll_y = 0;
        self.phase = 0.0;
        Ok(())
    }

    fn step(&mut self, output: &mut dyn StepOutput) -> Result<(), StepFault> {
        if !self.loaded {
            return Err(StepFault::NotLoaded);
        }

        self.scroll();
        self.render();
        output.on_frame(&self.pixels);

        let count = self.samples_this_frame();
        match self.tone_frequency() {
            Some(frequency) => {
                let increment = frequency / self.sample_rate as f32;
                for _ in 0..count {
                    self.phase = (self.phase + increment).fract();
                    let sample = if self.phase < 0.5 { AMPLITUDE } else { -AMPLITUDE };
                    output.on_sample(sample);
                }
            }
            None => {
                for _ in 0..count {
                    output.on_sample(0.0);
                }
            }
        }

        self.frames += 1;
        Ok(())
    }

    fn set_button(&mut self, port: Port, button: Button, pressed: bool) {
        let index = match port {
            Port::One => 0,
            Port::Two => 1,
        };
        if pressed {
            self.buttons[index] |= button.bit();
        } else {
            self.buttons[index] &= !button.bit();
        }
    }
}
