// Common test utilities for session integration tests
//
// This module provides a scripted emulation core whose output is fully
// predictable and an audio host that hands the pull side to the test instead
// of a real device.

#![allow(dead_code)]

use retro_host::audio::{AudioConfig, AudioHost, BlockPuller, DeviceUnavailable, PlaybackStream};
use retro_host::core::{
    CoreFactory, CoreOptions, EmulationCore, LoadError, ProgramImage, StepFault, StepOutput,
};
use retro_host::display::SCREEN_SIZE;
use retro_host::input::{Button, Port};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Hook run inside the core's load
pub type LoadHook = Arc<dyn Fn() + Send + Sync>;

/// What a scripted core does on each call
#[derive(Clone)]
pub struct CoreScript {
    /// Samples emitted per step, cycled
    pub samples_per_step: Vec<usize>,
    /// Reject every image with this message
    pub reject: Option<String>,
    /// Fault on this step (1-based)
    pub fault_at: Option<usize>,
    /// Run during load, before it succeeds
    pub on_load: Option<LoadHook>,
}

impl Default for CoreScript {
    fn default() -> Self {
        Self {
            samples_per_step: vec![735],
            reject: None,
            fault_at: None,
            on_load: None,
        }
    }
}

impl CoreScript {
    pub fn with_samples(counts: Vec<usize>) -> Self {
        Self {
            samples_per_step: counts,
            ..Self::default()
        }
    }
}

/// Shared view of everything the scripted cores did
#[derive(Clone, Default)]
pub struct CoreProbe {
    pub created: Arc<AtomicUsize>,
    pub loads: Arc<AtomicUsize>,
    pub steps: Arc<AtomicUsize>,
    pub samples: Arc<AtomicUsize>,
    /// Port One button bits seen at each step
    pub buttons: Arc<Mutex<Vec<u8>>>,
}

impl CoreProbe {
    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub fn last_buttons(&self) -> Option<u8> {
        self.buttons.lock().unwrap().last().copied()
    }
}

/// Core emitting a black frame and consecutive sample values 1.0, 2.0, ...
pub struct ScriptedCore {
    script: CoreScript,
    probe: CoreProbe,
    buttons: u8,
    steps: usize,
    next_sample: f32,
    pixels: Vec<u32>,
}

impl ScriptedCore {
    pub fn new(script: CoreScript, probe: CoreProbe) -> Self {
        probe.created.fetch_add(1, Ordering::SeqCst);
        Self {
            script,
            probe,
            buttons: 0,
            steps: 0,
            next_sample: 1.0,
            pixels: vec![0; SCREEN_SIZE],
        }
    }
}

impl EmulationCore for ScriptedCore {
    fn load(&mut self, _image: &[u8]) -> Result<(), LoadError> {
        self.probe.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.script.on_load {
            hook();
        }
        match &self.script.reject {
            Some(reason) => Err(LoadError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }

    fn step(&mut self, output: &mut dyn StepOutput) -> Result<(), StepFault> {
        self.steps += 1;
        if self.script.fault_at == Some(self.steps) {
            return Err(StepFault::Core(format!("scripted fault at step {}", self.steps)));
        }

        self.probe.steps.fetch_add(1, Ordering::SeqCst);
        self.probe.buttons.lock().unwrap().push(self.buttons);

        output.on_frame(&self.pixels);
        let counts = &self.script.samples_per_step;
        let count = if counts.is_empty() {
            0
        } else {
            counts[(self.steps - 1) % counts.len()]
        };
        for _ in 0..count {
            output.on_sample(self.next_sample);
            self.next_sample += 1.0;
        }
        self.probe.samples.fetch_add(count, Ordering::SeqCst);
        Ok(())
    }

    fn set_button(&mut self, port: Port, button: Button, pressed: bool) {
        if port != Port::One {
            return;
        }
        if pressed {
            self.buttons |= button.bit();
        } else {
            self.buttons &= !button.bit();
        }
    }
}

/// Factory creating a fresh scripted core per load
pub fn scripted_factory(script: CoreScript, probe: CoreProbe) -> Box<dyn CoreFactory> {
    Box::new(move |_options: CoreOptions| {
        Box::new(ScriptedCore::new(script.clone(), probe.clone())) as Box<dyn EmulationCore>
    })
}

/// Shared view of the recording audio host
#[derive(Clone, Default)]
pub struct AudioProbe {
    pub opened: Arc<AtomicUsize>,
    pub puller: Arc<Mutex<Option<BlockPuller>>>,
}

impl AudioProbe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Pull one block the way the device callback would
    pub fn pull(&self) -> Option<Vec<f32>> {
        let mut guard = self.puller.lock().unwrap();
        guard.as_mut().map(|puller| puller.pull().to_vec())
    }

    /// Whether the last opened stream is still connected
    pub fn is_connected(&self) -> bool {
        self.puller
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|puller| puller.is_connected())
    }
}

struct RecordedStream;

impl PlaybackStream for RecordedStream {
    fn device_name(&self) -> &str {
        "recording"
    }
}

/// Audio host that never pulls on its own
#[derive(Default)]
pub struct RecordingAudioHost {
    probe: AudioProbe,
}

impl RecordingAudioHost {
    pub fn new(probe: AudioProbe) -> Self {
        Self { probe }
    }
}

impl AudioHost for RecordingAudioHost {
    fn open(
        &mut self,
        _config: &AudioConfig,
        puller: BlockPuller,
    ) -> Result<Box<dyn PlaybackStream>, DeviceUnavailable> {
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        *self.probe.puller.lock().unwrap() = Some(puller);
        Ok(Box::new(RecordedStream))
    }
}

/// Audio host whose device is always missing
pub struct FailingAudioHost;

impl AudioHost for FailingAudioHost {
    fn open(
        &mut self,
        _config: &AudioConfig,
        _puller: BlockPuller,
    ) -> Result<Box<dyn PlaybackStream>, DeviceUnavailable> {
        Err(DeviceUnavailable::new("no device in test"))
    }
}

/// Small deterministic generator for sample counts
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Next value in `0..=max`
    pub fn next_up_to(&mut self, max: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) % (max as u64 + 1)) as usize
    }
}

pub fn test_image() -> ProgramImage {
    ProgramImage::from_bytes("test.bin", vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, 0, 0])
}
