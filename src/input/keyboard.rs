// Keyboard input mapping module
//
// This module translates physical key events into controller state changes.
// The translator holds no state of its own beyond the key table: every mapped
// event is written straight into the shared ControllerState.

use super::{Button, ControllerState, Port};
use std::collections::HashMap;
use std::sync::Arc;
use winit::keyboard::{KeyCode, PhysicalKey};

/// Table from physical keys to controller buttons
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<KeyCode, (Port, Button)>,
}

impl KeyMap {
    /// Create an empty key map
    pub fn new() -> Self {
        Self::default()
    }

    /// Default key map for Player 1
    ///
    /// # Default Mappings
    /// - Arrow keys: D-pad
    /// - X: A button
    /// - Z: B button
    /// - Enter: Start
    /// - Either Ctrl: Select
    pub fn player1_default() -> Self {
        Self::new()
            .with_binding(KeyCode::ArrowUp, Port::One, Button::Up)
            .with_binding(KeyCode::ArrowDown, Port::One, Button::Down)
            .with_binding(KeyCode::ArrowLeft, Port::One, Button::Left)
            .with_binding(KeyCode::ArrowRight, Port::One, Button::Right)
            .with_binding(KeyCode::KeyX, Port::One, Button::A)
            .with_binding(KeyCode::KeyZ, Port::One, Button::B)
            .with_binding(KeyCode::Enter, Port::One, Button::Start)
            .with_binding(KeyCode::ControlLeft, Port::One, Button::Select)
            .with_binding(KeyCode::ControlRight, Port::One, Button::Select)
    }

    /// Bind a key, replacing any previous binding for that key
    pub fn bind(&mut self, key: KeyCode, port: Port, button: Button) {
        self.bindings.insert(key, (port, button));
    }

    /// Builder form of [`KeyMap::bind`]
    pub fn with_binding(mut self, key: KeyCode, port: Port, button: Button) -> Self {
        self.bind(key, port, button);
        self
    }

    /// Look up the button bound to a key
    pub fn get(&self, key: KeyCode) -> Option<(Port, Button)> {
        self.bindings.get(&key).copied()
    }

    /// All keys bound to a given button
    pub fn keys_for(&self, port: Port, button: Button) -> Vec<KeyCode> {
        self.bindings
            .iter()
            .filter(|(_, target)| **target == (port, button))
            .map(|(&key, _)| key)
            .collect()
    }

    /// Number of bound keys
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check whether no keys are bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Translates key events into controller state
///
/// One translator is registered per running session; dropping it is what
/// unregisters the listener.
pub struct InputTranslator {
    key_map: KeyMap,
    state: Arc<ControllerState>,
}

impl InputTranslator {
    /// Create a translator writing into `state`
    pub fn new(key_map: KeyMap, state: Arc<ControllerState>) -> Self {
        Self { key_map, state }
    }

    /// Handle a key event
    ///
    /// Returns true if the key was mapped. Unmapped keys are ignored.
    pub fn on_key_event(&self, key: KeyCode, pressed: bool) -> bool {
        match self.key_map.get(key) {
            Some((port, button)) => {
                self.state.set(port, button, pressed);
                true
            }
            None => false,
        }
    }

    /// Handle a winit physical key event
    ///
    /// Keys winit cannot identify are ignored.
    pub fn on_physical_key(&self, physical_key: PhysicalKey, pressed: bool) -> bool {
        match physical_key {
            PhysicalKey::Code(key) => self.on_key_event(key, pressed),
            PhysicalKey::Unidentified(_) => false,
        }
    }

    /// The key table in use
    pub fn key_map(&self) -> &KeyMap {
        &self.key_map
    }

    /// The controller state this translator writes to
    pub fn state(&self) -> &Arc<ControllerState> {
        &self.state
    }
}
