// Audio output - Playback device adapter
//
// The audio device pulls samples at its own clock. Each pull is served from a
// staged block of `block_size` samples taken from the SampleRing in one go, so
// the ring's block-level underrun policy holds no matter what buffer length the
// device asks for. Devices are reached through the AudioHost trait; the cpal
// implementation lives behind the `audio` feature.

use super::ring::{SampleRing, DEFAULT_RING_CAPACITY};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Default output sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default pull block size in samples
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Audio output configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Samples removed from the ring per pull
    pub block_size: usize,

    /// Ring capacity in samples
    pub ring_capacity: usize,

    /// Number of device channels; `None` uses the device's preferred layout
    pub channels: Option<u16>,

    /// Output gain (0.0 = mute, 1.0 = unchanged)
    pub volume: f32,
}

impl AudioConfig {
    /// Create default audio configuration
    ///
    /// - Sample rate: 44.1 kHz
    /// - Block size: 4096 samples
    /// - Ring capacity: 8192 samples
    /// - Channels: device default
    /// - Volume: 1.0
    pub fn new() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            ring_capacity: DEFAULT_RING_CAPACITY,
            channels: None,
            volume: 1.0,
        }
    }

    /// Set the sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the pull block size
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the ring capacity
    pub fn with_ring_capacity(mut self, ring_capacity: usize) -> Self {
        self.ring_capacity = ring_capacity;
        self
    }

    /// Set the number of channels (1 = mono, 2 = stereo); 0 means device default
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = (channels > 0).then_some(channels);
        self
    }

    /// Channel count to open the device with, given its preferred count
    pub fn resolve_channels(&self, device_default: u16) -> u16 {
        self.channels.unwrap_or(device_default).max(1)
    }

    /// Set the output volume, clamped to 0.0..=1.0
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The playback device could not be acquired
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("audio device unavailable: {reason}")]
pub struct DeviceUnavailable {
    reason: String,
}

impl DeviceUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Pull side of the sample ring, handed to the audio device callback
pub struct BlockPuller {
    ring: Arc<SampleRing>,
    block: Vec<f32>,
    cursor: usize,
    volume: f32,
    connected: Arc<AtomicBool>,
}

impl BlockPuller {
    /// Create a puller removing `block_size` samples from `ring` per pull
    pub fn new(ring: Arc<SampleRing>, block_size: usize, volume: f32) -> Self {
        let block_size = block_size.max(1);
        Self {
            ring,
            block: vec![0.0; block_size],
            cursor: block_size,
            volume,
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Samples removed per pull
    pub fn block_size(&self) -> usize {
        self.block.len()
    }

    /// Check whether the adapter is still connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Pull one block from the ring
    ///
    /// Returns the oldest `block_size` samples with the volume applied, or
    /// silence on underrun.
    pub fn pull(&mut self) -> &[f32] {
        if self.is_connected() {
            self.stage();
        } else {
            self.block.fill(0.0);
        }
        self.cursor = self.block.len();
        &self.block
    }

    fn stage(&mut self) {
        if self.ring.pull_block(&mut self.block) && self.volume != 1.0 {
            for sample in &mut self.block {
                *sample *= self.volume;
            }
        }
    }

    /// Fill an interleaved device buffer, duplicating mono across `channels`
    ///
    /// Once disconnected, writes silence without touching the ring.
    pub fn fill(&mut self, out: &mut [f32], channels: usize) {
        if !self.is_connected() {
            out.fill(0.0);
            return;
        }

        for frame in out.chunks_mut(channels.max(1)) {
            if self.cursor == self.block.len() {
                self.stage();
                self.cursor = 0;
            }
            let sample = self.block[self.cursor];
            self.cursor += 1;
            frame.fill(sample);
        }
    }

    fn connection(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }
}

/// A running playback stream; dropping it stops the device
pub trait PlaybackStream {
    /// Human-readable device name
    fn device_name(&self) -> &str;
}

/// Host audio subsystem
pub trait AudioHost {
    /// Open an output stream whose callback drives `puller`
    fn open(
        &mut self,
        config: &AudioConfig,
        puller: BlockPuller,
    ) -> Result<Box<dyn PlaybackStream>, DeviceUnavailable>;
}

/// Audio host used when audio is disabled
///
/// Always reports the device as unavailable, which puts sessions in silent
/// mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioHost;

impl AudioHost for NullAudioHost {
    fn open(
        &mut self,
        _config: &AudioConfig,
        _puller: BlockPuller,
    ) -> Result<Box<dyn PlaybackStream>, DeviceUnavailable> {
        Err(DeviceUnavailable::new("audio output disabled"))
    }
}

/// Connection between a sample ring and the audio device
///
/// While connected the device callback drains the ring. After
/// [`PlaybackAdapter::disconnect`] the callback never touches the ring again.
pub struct PlaybackAdapter {
    stream: Option<Box<dyn PlaybackStream>>,
    connected: Arc<AtomicBool>,
}

impl PlaybackAdapter {
    /// Register a pull callback for `ring` with the audio host
    pub fn connect(
        host: &mut dyn AudioHost,
        config: &AudioConfig,
        ring: Arc<SampleRing>,
    ) -> Result<Self, DeviceUnavailable> {
        let puller = BlockPuller::new(ring, config.block_size, config.volume);
        let connected = puller.connection();
        let stream = host.open(config, puller)?;
        tracing::info!(
            "Audio output connected: {} ({} Hz, {}-sample blocks)",
            stream.device_name(),
            config.sample_rate,
            config.block_size
        );

        Ok(Self {
            stream: Some(stream),
            connected,
        })
    }

    /// Check whether the device is still attached
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Name of the attached device
    pub fn device_name(&self) -> Option<&str> {
        self.stream.as_deref().map(|stream| stream.device_name())
    }

    /// Detach from the device
    pub fn disconnect(&mut self) {
        self.connected.store(false, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            tracing::debug!("Audio output disconnected: {}", stream.device_name());
        }
    }
}

impl Drop for PlaybackAdapter {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(feature = "audio")]
pub use cpal_host::CpalAudioHost;

#[cfg(feature = "audio")]
mod cpal_host {
    use super::{AudioConfig, AudioHost, BlockPuller, DeviceUnavailable, PlaybackStream};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{Stream, StreamConfig};

    /// Audio host backed by the system's default cpal output device
    #[derive(Debug, Default, Clone, Copy)]
    pub struct CpalAudioHost;

    struct CpalPlayback {
        _stream: Stream,
        device_name: String,
    }

    impl PlaybackStream for CpalPlayback {
        fn device_name(&self) -> &str {
            &self.device_name
        }
    }

    impl AudioHost for CpalAudioHost {
        fn open(
            &mut self,
            config: &AudioConfig,
            mut puller: BlockPuller,
        ) -> Result<Box<dyn PlaybackStream>, DeviceUnavailable> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| DeviceUnavailable::new("no output device available"))?;
            let device_name = device.name().unwrap_or_default();

            // Many backends refuse mono; follow the device unless told otherwise
            let preferred = device
                .default_output_config()
                .map(|supported| supported.channels())
                .unwrap_or(2);

            let stream_config = StreamConfig {
                channels: config.resolve_channels(preferred),
                sample_rate: cpal::SampleRate(config.sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };
            let channels = stream_config.channels as usize;
            tracing::info!(
                "Opening {} at {} Hz, {} channel(s)",
                device_name,
                config.sample_rate,
                channels
            );

            let stream = device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        puller.fill(data, channels);
                    },
                    move |err| {
                        tracing::error!("Audio stream error: {}", err);
                    },
                    None,
                )
                .map_err(|e| {
                    DeviceUnavailable::new(format!("failed to build audio stream: {}", e))
                })?;

            stream.play().map_err(|e| {
                DeviceUnavailable::new(format!("failed to start audio stream: {}", e))
            })?;

            Ok(Box::new(CpalPlayback {
                _stream: stream,
                device_name,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorded(&'static str);

    impl PlaybackStream for Recorded {
        fn device_name(&self) -> &str {
            self.0
        }
    }

    #[derive(Default)]
    struct CaptureHost {
        puller: Arc<Mutex<Option<BlockPuller>>>,
    }

    impl AudioHost for CaptureHost {
        fn open(
            &mut self,
            _config: &AudioConfig,
            puller: BlockPuller,
        ) -> Result<Box<dyn PlaybackStream>, DeviceUnavailable> {
            *self.puller.lock().unwrap() = Some(puller);
            Ok(Box::new(Recorded("capture")))
        }
    }

    fn ring_with(samples: &[f32], capacity: usize) -> Arc<SampleRing> {
        let ring = Arc::new(SampleRing::new(capacity));
        ring.extend(samples);
        ring
    }

    #[test]
    fn test_audio_config_creation() {
        let config = AudioConfig::new();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.block_size, 4096);
        assert_eq!(config.ring_capacity, 8192);
        assert_eq!(config.channels, None);
        assert_eq!(config.volume, 1.0);
    }

    #[test]
    fn test_channels_follow_device_unless_set() {
        let config = AudioConfig::new();
        assert_eq!(config.resolve_channels(2), 2);
        assert_eq!(config.resolve_channels(6), 6);

        let stereo = AudioConfig::new().with_channels(2);
        assert_eq!(stereo.channels, Some(2));
        assert_eq!(stereo.resolve_channels(1), 2);

        let auto = AudioConfig::new().with_channels(0);
        assert_eq!(auto.channels, None);
        assert_eq!(auto.resolve_channels(0), 1);
    }

    #[test]
    fn test_audio_config_builder() {
        let config = AudioConfig::new()
            .with_sample_rate(48_000)
            .with_block_size(512)
            .with_ring_capacity(2048)
            .with_volume(3.0);

        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.block_size, 512);
        assert_eq!(config.ring_capacity, 2048);
        assert_eq!(config.volume, 1.0);
    }

    #[test]
    fn test_pull_full_block() {
        let ring = ring_with(&[1.0, 2.0, 3.0, 4.0, 5.0], 16);
        let mut puller = BlockPuller::new(Arc::clone(&ring), 4, 1.0);

        assert_eq!(puller.pull(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_pull_underrun_is_silent() {
        let ring = ring_with(&[1.0, 2.0], 16);
        let mut puller = BlockPuller::new(Arc::clone(&ring), 4, 1.0);

        assert_eq!(puller.pull(), &[0.0; 4]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_fill_stages_blocks_across_callbacks() {
        let ring = ring_with(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 16);
        let mut puller = BlockPuller::new(Arc::clone(&ring), 4, 1.0);

        let mut out = [0.0f32; 3];
        puller.fill(&mut out, 1);
        assert_eq!(out, [1.0, 2.0, 3.0]);
        // The whole first block left the ring on the first callback
        assert_eq!(ring.len(), 4);

        puller.fill(&mut out, 1);
        assert_eq!(out, [4.0, 5.0, 6.0]);
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_fill_duplicates_mono_across_channels() {
        let ring = ring_with(&[0.5, -0.5], 16);
        let mut puller = BlockPuller::new(ring, 2, 1.0);

        let mut out = [0.0f32; 4];
        puller.fill(&mut out, 2);
        assert_eq!(out, [0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_fill_applies_volume() {
        let ring = ring_with(&[0.8, -0.4], 16);
        let mut puller = BlockPuller::new(ring, 2, 0.5);

        let mut out = [0.0f32; 2];
        puller.fill(&mut out, 1);
        assert_eq!(out, [0.4, -0.2]);
    }

    #[test]
    fn test_pull_and_fill_apply_same_volume() {
        let ring = ring_with(&[0.8, -0.4, 0.8, -0.4], 16);
        let mut puller = BlockPuller::new(ring, 2, 0.5);

        assert_eq!(puller.pull(), &[0.4, -0.2]);

        let mut out = [0.0f32; 4];
        puller.fill(&mut out, 2);
        assert_eq!(out, [0.4, 0.4, -0.2, -0.2]);
    }

    #[test]
    fn test_null_host_is_unavailable() {
        let ring = Arc::new(SampleRing::new(16));
        let result = PlaybackAdapter::connect(&mut NullAudioHost, &AudioConfig::new(), ring);
        assert!(result.is_err());
    }

    #[test]
    fn test_adapter_connect_and_disconnect() {
        let mut host = CaptureHost::default();
        let ring = ring_with(&[1.0, 2.0, 3.0, 4.0], 16);
        let config = AudioConfig::new().with_block_size(2);

        let mut adapter = PlaybackAdapter::connect(&mut host, &config, Arc::clone(&ring)).unwrap();
        assert!(adapter.is_connected());
        assert_eq!(adapter.device_name(), Some("capture"));

        let mut guard = host.puller.lock().unwrap();
        let puller = guard.as_mut().unwrap();
        let mut out = [0.0f32; 2];
        puller.fill(&mut out, 1);
        assert_eq!(out, [1.0, 2.0]);

        adapter.disconnect();
        assert!(!adapter.is_connected());
        assert!(!puller.is_connected());

        // A late callback after disconnection leaves the ring alone
        let mut out = [7.0f32; 2];
        puller.fill(&mut out, 1);
        assert_eq!(out, [0.0, 0.0]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_adapter_drop_disconnects() {
        let mut host = CaptureHost::default();
        let ring = Arc::new(SampleRing::new(16));
        let adapter = PlaybackAdapter::connect(&mut host, &AudioConfig::new(), ring).unwrap();
        drop(adapter);

        let guard = host.puller.lock().unwrap();
        assert!(!guard.as_ref().unwrap().is_connected());
    }
}
