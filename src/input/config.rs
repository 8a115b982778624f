// Input configuration module
//
// Serializable key bindings for the `[input]` section of the host
// configuration file. Keys are named by their winit `KeyCode` names
// ("KeyX", "ArrowUp", "ControlLeft", ...).

use super::{Button, KeyMap, Port};
use crate::emulator::ConfigError;
use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

/// Serializable key bindings for one controller port
///
/// Every button takes a list of keys so that, for example, both Ctrl keys can
/// drive Select.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardMappingConfig {
    /// Keys for A button
    pub button_a: Vec<String>,
    /// Keys for B button
    pub button_b: Vec<String>,
    /// Keys for Select button
    pub select: Vec<String>,
    /// Keys for Start button
    pub start: Vec<String>,
    /// Keys for Up on D-pad
    pub up: Vec<String>,
    /// Keys for Down on D-pad
    pub down: Vec<String>,
    /// Keys for Left on D-pad
    pub left: Vec<String>,
    /// Keys for Right on D-pad
    pub right: Vec<String>,
}

impl KeyboardMappingConfig {
    /// Create default key bindings for Player 1
    pub fn player1_default() -> Self {
        fn keys(names: &[&str]) -> Vec<String> {
            names.iter().map(|name| name.to_string()).collect()
        }

        Self {
            button_a: keys(&["KeyX"]),
            button_b: keys(&["KeyZ"]),
            select: keys(&["ControlLeft", "ControlRight"]),
            start: keys(&["Enter"]),
            up: keys(&["ArrowUp"]),
            down: keys(&["ArrowDown"]),
            left: keys(&["ArrowLeft"]),
            right: keys(&["ArrowRight"]),
        }
    }

    fn entries(&self) -> [(Button, &Vec<String>); 8] {
        [
            (Button::A, &self.button_a),
            (Button::B, &self.button_b),
            (Button::Select, &self.select),
            (Button::Start, &self.start),
            (Button::Up, &self.up),
            (Button::Down, &self.down),
            (Button::Left, &self.left),
            (Button::Right, &self.right),
        ]
    }

    /// Add these bindings for `port` to a runtime key map
    pub fn apply_to(&self, port: Port, key_map: &mut KeyMap) -> Result<(), ConfigError> {
        for (button, names) in self.entries() {
            for name in names {
                key_map.bind(string_to_keycode(name)?, port, button);
            }
        }
        Ok(())
    }

    /// Create from the bindings a runtime key map holds for `port`
    pub fn from_key_map(key_map: &KeyMap, port: Port) -> Self {
        let keys = |button| {
            let mut names: Vec<String> = key_map
                .keys_for(port, button)
                .into_iter()
                .map(keycode_to_string)
                .collect();
            names.sort();
            names
        };

        Self {
            button_a: keys(Button::A),
            button_b: keys(Button::B),
            select: keys(Button::Select),
            start: keys(Button::Start),
            up: keys(Button::Up),
            down: keys(Button::Down),
            left: keys(Button::Left),
            right: keys(Button::Right),
        }
    }
}

/// Complete input configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Key bindings for Player 1
    #[serde(default = "KeyboardMappingConfig::player1_default")]
    pub keyboard_player1: KeyboardMappingConfig,
    /// Key bindings for Player 2 (unmapped unless configured)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard_player2: Option<KeyboardMappingConfig>,
}

impl InputConfig {
    /// Create a new input configuration with default mappings
    pub fn new() -> Self {
        Self {
            keyboard_player1: KeyboardMappingConfig::player1_default(),
            keyboard_player2: None,
        }
    }

    /// Convert to a runtime key map
    pub fn to_key_map(&self) -> Result<KeyMap, ConfigError> {
        let mut key_map = KeyMap::new();
        self.keyboard_player1.apply_to(Port::One, &mut key_map)?;
        if let Some(player2) = &self.keyboard_player2 {
            player2.apply_to(Port::Two, &mut key_map)?;
        }
        Ok(key_map)
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert KeyCode to string representation
fn keycode_to_string(key: KeyCode) -> String {
    format!("{:?}", key)
}

/// Convert string to KeyCode
fn string_to_keycode(s: &str) -> Result<KeyCode, ConfigError> {
    let key = match s {
        "KeyA" => KeyCode::KeyA,
        "KeyB" => KeyCode::KeyB,
        "KeyC" => KeyCode::KeyC,
        "KeyD" => KeyCode::KeyD,
        "KeyE" => KeyCode::KeyE,
        "KeyF" => KeyCode::KeyF,
        "KeyG" => KeyCode::KeyG,
        "KeyH" => KeyCode::KeyH,
        "KeyI" => KeyCode::KeyI,
        "KeyJ" => KeyCode::KeyJ,
        "KeyK" => KeyCode::KeyK,
        "KeyL" => KeyCode::KeyL,
        "KeyM" => KeyCode::KeyM,
        "KeyN" => KeyCode::KeyN,
        "KeyO" => KeyCode::KeyO,
        "KeyP" => KeyCode::KeyP,
        "KeyQ" => KeyCode::KeyQ,
        "KeyR" => KeyCode::KeyR,
        "KeyS" => KeyCode::KeyS,
        "KeyT" => KeyCode::KeyT,
        "KeyU" => KeyCode::KeyU,
        "KeyV" => KeyCode::KeyV,
        "KeyW" => KeyCode::KeyW,
        "KeyX" => KeyCode::KeyX,
        "KeyY" => KeyCode::KeyY,
        "KeyZ" => KeyCode::KeyZ,
        "Digit0" => KeyCode::Digit0,
        "Digit1" => KeyCode::Digit1,
        "Digit2" => KeyCode::Digit2,
        "Digit3" => KeyCode::Digit3,
        "Digit4" => KeyCode::Digit4,
        "Digit5" => KeyCode::Digit5,
        "Digit6" => KeyCode::Digit6,
        "Digit7" => KeyCode::Digit7,
        "Digit8" => KeyCode::Digit8,
        "Digit9" => KeyCode::Digit9,
        "ArrowUp" => KeyCode::ArrowUp,
        "ArrowDown" => KeyCode::ArrowDown,
        "ArrowLeft" => KeyCode::ArrowLeft,
        "ArrowRight" => KeyCode::ArrowRight,
        "Enter" => KeyCode::Enter,
        "NumpadEnter" => KeyCode::NumpadEnter,
        "Space" => KeyCode::Space,
        "Tab" => KeyCode::Tab,
        "Backspace" => KeyCode::Backspace,
        "ShiftLeft" => KeyCode::ShiftLeft,
        "ShiftRight" => KeyCode::ShiftRight,
        "ControlLeft" => KeyCode::ControlLeft,
        "ControlRight" => KeyCode::ControlRight,
        "AltLeft" => KeyCode::AltLeft,
        "AltRight" => KeyCode::AltRight,
        _ => return Err(ConfigError::UnknownKey(s.to_string())),
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_config_defaults() {
        let config = KeyboardMappingConfig::player1_default();
        assert_eq!(config.button_a, vec!["KeyX"]);
        assert_eq!(config.button_b, vec!["KeyZ"]);
        assert_eq!(config.select, vec!["ControlLeft", "ControlRight"]);
        assert_eq!(config.up, vec!["ArrowUp"]);
    }

    #[test]
    fn test_default_config_matches_default_key_map() {
        let from_config = InputConfig::new().to_key_map().unwrap();
        let builtin = KeyMap::player1_default();

        assert_eq!(from_config.len(), builtin.len());
        for key in [
            KeyCode::KeyX,
            KeyCode::KeyZ,
            KeyCode::Enter,
            KeyCode::ControlLeft,
            KeyCode::ControlRight,
            KeyCode::ArrowUp,
            KeyCode::ArrowDown,
            KeyCode::ArrowLeft,
            KeyCode::ArrowRight,
        ] {
            assert_eq!(from_config.get(key), builtin.get(key));
        }
    }

    #[test]
    fn test_keycode_conversion() {
        assert_eq!(keycode_to_string(KeyCode::KeyX), "KeyX");
        assert_eq!(string_to_keycode("KeyX").unwrap(), KeyCode::KeyX);
        assert!(matches!(
            string_to_keycode("InvalidKey"),
            Err(ConfigError::UnknownKey(name)) if name == "InvalidKey"
        ));
    }

    #[test]
    fn test_unknown_key_rejected_by_key_map() {
        let mut config = InputConfig::new();
        config.keyboard_player1.start = vec!["Hyper".to_string()];
        assert!(config.to_key_map().is_err());
    }

    #[test]
    fn test_key_map_conversion() {
        let key_map = KeyMap::player1_default();
        let config = KeyboardMappingConfig::from_key_map(&key_map, Port::One);
        assert_eq!(config, KeyboardMappingConfig::player1_default());

        let empty = KeyboardMappingConfig::from_key_map(&key_map, Port::Two);
        assert_eq!(empty, KeyboardMappingConfig::default());
    }

    #[test]
    fn test_player2_bindings() {
        let mut config = InputConfig::new();
        config.keyboard_player2 = Some(KeyboardMappingConfig {
            button_a: vec!["KeyK".to_string()],
            up: vec!["KeyW".to_string()],
            ..KeyboardMappingConfig::default()
        });

        let key_map = config.to_key_map().unwrap();
        assert_eq!(key_map.get(KeyCode::KeyK), Some((Port::Two, Button::A)));
        assert_eq!(key_map.get(KeyCode::KeyW), Some((Port::Two, Button::Up)));
        assert_eq!(key_map.get(KeyCode::KeyX), Some((Port::One, Button::A)));
    }

    #[test]
    fn test_config_serialization() {
        let config = InputConfig::new();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("keyboard_player1"));
        assert!(!toml_str.contains("keyboard_player2"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [keyboard_player1]
            button_a = ["KeyX", "Space"]
            button_b = ["KeyZ"]
            select = ["ShiftRight"]
            start = ["Enter"]
            up = ["ArrowUp"]
            down = ["ArrowDown"]
            left = ["ArrowLeft"]
            right = ["ArrowRight"]

            [keyboard_player2]
            button_a = ["KeyK"]
        "#;

        let config: InputConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.keyboard_player1.button_a, vec!["KeyX", "Space"]);
        let player2 = config.keyboard_player2.as_ref().unwrap();
        assert_eq!(player2.button_a, vec!["KeyK"]);
        assert!(player2.start.is_empty());

        let key_map = config.to_key_map().unwrap();
        assert_eq!(key_map.get(KeyCode::Space), Some((Port::One, Button::A)));
        assert_eq!(key_map.get(KeyCode::ShiftRight), Some((Port::One, Button::Select)));
    }
}
