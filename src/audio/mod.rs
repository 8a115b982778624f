// Audio module - Sample buffering and playback
//
// This module provides:
// - A bounded lock-free sample ring between the emulation step and the device
// - Block-based pulling with silence on underrun
// - Cross-platform audio output using cpal (feature `audio`)
//
// # Usage
//
// ```
// use retro_host::audio::{AudioConfig, BlockPuller, SampleRing};
// use std::sync::Arc;
//
// let config = AudioConfig::new().with_block_size(4);
// let ring = Arc::new(SampleRing::new(config.ring_capacity));
// let mut puller = BlockPuller::new(Arc::clone(&ring), config.block_size, config.volume);
//
// // Producer side (emulation step)
// ring.extend(&[0.1, 0.2, 0.3, 0.4]);
//
// // Consumer side (audio callback)
// assert_eq!(puller.pull(), &[0.1, 0.2, 0.3, 0.4]);
// ```

pub mod output;
pub mod ring;

#[cfg(feature = "audio")]
pub use output::CpalAudioHost;
pub use output::{
    AudioConfig, AudioHost, BlockPuller, DeviceUnavailable, NullAudioHost, PlaybackAdapter,
    PlaybackStream, DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE,
};
pub use ring::{SampleRing, DEFAULT_RING_CAPACITY};

/// Audio statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStats {
    /// Total samples pushed by the emulation step
    pub samples_produced: u64,

    /// Samples evicted because the ring was full
    pub samples_dropped: u64,

    /// Samples delivered to the device
    pub samples_pulled: u64,

    /// Pulls answered with silence
    pub underruns: u64,

    /// Current buffer length
    pub buffer_len: usize,

    /// Buffer capacity
    pub buffer_capacity: usize,
}

impl AudioStats {
    /// Get buffer fullness as a fraction (0.0 - 1.0)
    pub fn buffer_fullness(&self) -> f32 {
        if self.buffer_capacity == 0 {
            0.0
        } else {
            self.buffer_len as f32 / self.buffer_capacity as f32
        }
    }

    /// Get the fraction of produced samples that were dropped
    pub fn drop_ratio(&self) -> f64 {
        if self.samples_produced == 0 {
            0.0
        } else {
            self.samples_dropped as f64 / self.samples_produced as f64
        }
    }
}
