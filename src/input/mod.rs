// Input module - Controller state and keyboard translation
//
// This module provides:
// - Per-port controller state shared between key handling and the emulation step
// - Keyboard-to-controller translation with a configurable key table
// - Serializable key bindings for the host configuration file

pub mod config;
pub mod keyboard;

pub use config::{InputConfig, KeyboardMappingConfig};
pub use keyboard::{InputTranslator, KeyMap};

use std::sync::atomic::{AtomicU8, Ordering};

/// Logical controller slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    /// Player 1
    One,
    /// Player 2
    Two,
}

impl Port {
    /// Every port, in index order
    pub const ALL: [Port; 2] = [Port::One, Port::Two];

    fn index(self) -> usize {
        match self {
            Port::One => 0,
            Port::Two => 1,
        }
    }
}

/// Emulated controller button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// A button
    A,
    /// B button
    B,
    /// Select button
    Select,
    /// Start button
    Start,
    /// Up on D-pad
    Up,
    /// Down on D-pad
    Down,
    /// Left on D-pad
    Left,
    /// Right on D-pad
    Right,
}

impl Button {
    /// Every button, in bit order
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];

    /// Bit used for this button in a controller bitmask
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Snapshot of one controller's buttons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controller {
    pub button_a: bool,
    pub button_b: bool,
    pub select: bool,
    pub start: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Controller {
    /// Create a new controller snapshot with all buttons released
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a button bitmask
    pub fn from_bits(bits: u8) -> Self {
        let pressed = |button: Button| bits & button.bit() != 0;
        Controller {
            button_a: pressed(Button::A),
            button_b: pressed(Button::B),
            select: pressed(Button::Select),
            start: pressed(Button::Start),
            up: pressed(Button::Up),
            down: pressed(Button::Down),
            left: pressed(Button::Left),
            right: pressed(Button::Right),
        }
    }

    /// Check a single button
    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::A => self.button_a,
            Button::B => self.button_b,
            Button::Select => self.select,
            Button::Start => self.start,
            Button::Up => self.up,
            Button::Down => self.down,
            Button::Left => self.left,
            Button::Right => self.right,
        }
    }

    /// Check whether any button is held
    pub fn any_pressed(&self) -> bool {
        Button::ALL.iter().any(|&button| self.is_pressed(button))
    }
}

/// Live controller state for every port
///
/// Written by the key handler at arbitrary times and read once per emulation
/// step. Each port is a single atomic bitmask, so the most recent write wins
/// and neither side ever blocks.
#[derive(Debug, Default)]
pub struct ControllerState {
    ports: [AtomicU8; 2],
}

impl ControllerState {
    /// Create controller state with every button released
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear one button
    pub fn set(&self, port: Port, button: Button, pressed: bool) {
        let cell = &self.ports[port.index()];
        if pressed {
            cell.fetch_or(button.bit(), Ordering::AcqRel);
        } else {
            cell.fetch_and(!button.bit(), Ordering::AcqRel);
        }
    }

    /// Check one button
    pub fn is_pressed(&self, port: Port, button: Button) -> bool {
        self.bits(port) & button.bit() != 0
    }

    /// Raw bitmask for a port
    pub fn bits(&self, port: Port) -> u8 {
        self.ports[port.index()].load(Ordering::Acquire)
    }

    /// Snapshot of a port's buttons
    pub fn snapshot(&self, port: Port) -> Controller {
        Controller::from_bits(self.bits(port))
    }

    /// Release every button on every port
    pub fn clear(&self) {
        for cell in &self.ports {
            cell.store(0, Ordering::Release);
        }
    }
}
