// Configuration management
//
// Handles host configuration and settings persistence.

use crate::audio::{AudioConfig, DEFAULT_BLOCK_SIZE, DEFAULT_RING_CAPACITY, DEFAULT_SAMPLE_RATE};
use crate::display::WindowConfig;
use crate::input::InputConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Default configuration file path
pub const CONFIG_FILE: &str = "retro_host.toml";

/// Error raised while reading, writing or applying configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown key name: {0}")]
    UnknownKey(String),

    #[error("audio block size {block_size} must be between 1 and ring capacity {ring_capacity}")]
    InvalidAudio {
        block_size: usize,
        ring_capacity: usize,
    },
}

/// Host configuration
///
/// Stores all user-configurable settings for the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Video settings
    pub video: VideoConfig,

    /// Audio settings
    pub audio: AudioSettings,

    /// Key bindings
    pub input: InputConfig,
}

/// Video configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Window scale (1-8)
    pub scale: u32,

    /// Enable VSync
    pub vsync: bool,

    /// Target FPS (usually 60)
    pub fps: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            scale: 3,
            vsync: true,
            fps: 60,
        }
    }
}

/// Audio configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Enable audio output
    pub enabled: bool,

    /// Output sample rate in Hz
    pub sample_rate: u32,

    /// Samples per device pull
    pub block_size: usize,

    /// Sample ring capacity
    pub ring_capacity: usize,

    /// Output channels (0 = device default)
    pub channels: u16,

    /// Volume (0.0-1.0)
    pub volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            ring_capacity: DEFAULT_RING_CAPACITY,
            channels: 0,
            volume: 1.0,
        }
    }
}

impl HostConfig {
    /// Load configuration from `path`, or create it with defaults
    ///
    /// A missing file is replaced by the default configuration, which is then
    /// written to `path`. A file that exists but cannot be parsed is an error.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use retro_host::emulator::{HostConfig, CONFIG_FILE};
    ///
    /// let config = HostConfig::load_or_default(CONFIG_FILE).unwrap();
    /// ```
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                // Try to save the default config, but don't fail if we can't
                if let Err(err) = config.save(path) {
                    tracing::warn!("Could not write {}: {}", path.display(), err);
                }
                Ok(config)
            }
            Err(err) => Err(err),
        }
    }

    /// Load configuration from a file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validated()
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Clamp out-of-range values and reject inconsistent ones
    ///
    /// Scale is clamped to 1..=8, fps to at least 1 and volume to 0.0..=1.0.
    /// The block size must be non-zero and fit in the ring, and every key name
    /// must be known.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.video.scale = self.video.scale.clamp(1, 8);
        self.video.fps = self.video.fps.max(1);
        self.audio.volume = self.audio.volume.clamp(0.0, 1.0);
        self.audio.sample_rate = self.audio.sample_rate.max(1);

        if self.audio.block_size == 0 || self.audio.block_size > self.audio.ring_capacity {
            return Err(ConfigError::InvalidAudio {
                block_size: self.audio.block_size,
                ring_capacity: self.audio.ring_capacity,
            });
        }

        self.input.to_key_map()?;
        Ok(self)
    }

    /// Audio output settings
    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig::new()
            .with_sample_rate(self.audio.sample_rate)
            .with_block_size(self.audio.block_size)
            .with_ring_capacity(self.audio.ring_capacity)
            .with_channels(self.audio.channels)
            .with_volume(self.audio.volume)
    }

    /// Window settings
    pub fn window_config(&self) -> WindowConfig {
        WindowConfig::new()
            .with_scale(self.video.scale)
            .with_fps(self.video.fps)
            .with_vsync(self.video.vsync)
    }
}
