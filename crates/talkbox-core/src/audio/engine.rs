//! Live audio host for the talkbox engine
//!
//! Provides high-level interface for:
//! - Enumerating audio devices
//! - Opening a duplex (input + output) stream pair
//! - Running the engine inside the output callback
//!
//! ## Signal routing
//!
//! - Input channel 0: modulator (voice)
//! - Input channel 1: carrier (synth)
//! - Output channels 0/1: vocoded mix (identical content), remaining
//!   channels silent
//!
//! The input callback pushes (modulator, carrier) pairs into a lock-free
//! ring buffer. The output callback owns the engine, pops the pairs and
//! processes them in blocks. Parameter changes reach the output callback
//! through a bounded lock-free channel and are applied between blocks, so
//! the audio thread never locks or allocates.

use crate::dsp::params::TalkBoxParams;
use crate::dsp::processor::TalkBoxProcessor;
use crate::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleRate, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Ring buffer size in frames (enough for ~0.7 second at 96kHz)
const RING_BUFFER_SIZE: usize = 65536;

/// Pending parameter updates the output callback can lag behind by
const PARAM_QUEUE_SIZE: usize = 16;

/// Errors that can occur during audio engine operations
#[derive(Error, Debug)]
pub enum AudioEngineError {
    #[error("No audio devices found")]
    NoDevicesFound,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("No device selected")]
    NoDeviceSelected,

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Input needs {required} channels (modulator, carrier), device has {available}")]
    NotEnoughInputChannels { required: u16, available: u16 },

    #[error("No output channels available")]
    NoOutputChannels,
}

/// Audio device information
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device name
    pub name: String,
    /// Whether this is the default device
    pub is_default: bool,
    /// Supported sample rates
    pub sample_rates: Vec<u32>,
    /// Number of input channels
    pub input_channels: u16,
    /// Number of output channels
    pub output_channels: u16,
}

/// Audio engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Engine is stopped
    Stopped,
    /// Engine is running and processing audio
    Running,
}

/// Live talkbox host on one duplex audio device
pub struct AudioEngine {
    state: EngineState,
    sample_rate: u32,
    block_size: usize,
    params: TalkBoxParams,
    device_name: Option<String>,
    device: Option<Device>,
    input_stream: Option<Stream>,
    output_stream: Option<Stream>,
    /// Parameter updates for the output callback
    param_tx: Option<Sender<TalkBoxParams>>,
    /// Running flag (shared with callbacks via Arc)
    running: Option<Arc<AtomicBool>>,
    /// Frames received by the input callback
    input_frames: Option<Arc<AtomicUsize>>,
    /// Frames produced by the output callback
    output_frames: Option<Arc<AtomicUsize>>,
    /// Output frames rendered from silence because input had not arrived
    underruns: Option<Arc<AtomicUsize>>,
}

impl AudioEngine {
    /// Create a new audio engine with the host defaults
    /// (48kHz, block size 48, full wet)
    pub fn new() -> Self {
        Self {
            state: EngineState::Stopped,
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            params: TalkBoxParams::full_wet(),
            device_name: None,
            device: None,
            input_stream: None,
            output_stream: None,
            param_tx: None,
            running: None,
            input_frames: None,
            output_frames: None,
            underruns: None,
        }
    }

    /// Get current engine state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Get configured sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Set sample rate (must be called before start)
    ///
    /// Rates the engine cannot run at are ignored.
    pub fn set_sample_rate(&mut self, rate: u32) {
        if (MIN_SAMPLE_RATE as u32..=MAX_SAMPLE_RATE as u32).contains(&rate) {
            self.sample_rate = rate;
        } else {
            tracing::warn!(rate, "Ignoring unsupported sample rate");
        }
    }

    /// Engine block size in frames
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Set the engine block size (clamped to `1..=MAX_BLOCK_SIZE`, applied on start)
    pub fn set_block_size(&mut self, block_size: usize) {
        self.block_size = block_size.clamp(1, MAX_BLOCK_SIZE);
    }

    /// Current parameters
    pub fn params(&self) -> TalkBoxParams {
        self.params
    }

    /// Change parameters
    ///
    /// While running, the update is handed to the audio callback and applied
    /// before its next block without resetting any engine state.
    pub fn set_params(&mut self, params: TalkBoxParams) {
        self.params = params;
        if let Some(tx) = &self.param_tx {
            if tx.try_send(params).is_err() {
                tracing::warn!("Parameter queue full, update dropped");
            }
        }
    }

    fn get_host() -> Host {
        cpal::default_host()
    }

    /// List available audio devices
    ///
    /// # Returns
    /// Vector of device information for all devices of the default host
    pub fn list_devices() -> Result<Vec<DeviceInfo>> {
        let host = Self::get_host();
        let mut devices = Vec::new();

        let default_input = host.default_input_device().map(|d| d.name().ok());
        let default_output = host.default_output_device().map(|d| d.name().ok());

        for device in host.devices()? {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

            let is_default = default_input
                .as_ref()
                .map(|d| d.as_ref() == Some(&name))
                .unwrap_or(false)
                || default_output
                    .as_ref()
                    .map(|d| d.as_ref() == Some(&name))
                    .unwrap_or(false);

            let input_channels = device
                .default_input_config()
                .map(|c| c.channels())
                .unwrap_or(0);

            let output_channels = device
                .default_output_config()
                .map(|c| c.channels())
                .unwrap_or(0);

            // Rates the engine accepts and devices commonly offer
            let common_rates = [8000, 16000, 22050, 32000, 44100, 48000, 88200, 96000];
            let mut sample_rates = Vec::new();

            if let Ok(configs) = device.supported_output_configs() {
                for config in configs {
                    for &rate in &common_rates {
                        if (config.min_sample_rate().0..=config.max_sample_rate().0).contains(&rate)
                            && !sample_rates.contains(&rate)
                        {
                            sample_rates.push(rate);
                        }
                    }
                }
            }

            sample_rates.sort();

            devices.push(DeviceInfo {
                name,
                is_default,
                sample_rates,
                input_channels,
                output_channels,
            });
        }

        Ok(devices)
    }

    /// Select an audio device by name
    ///
    /// # Arguments
    /// * `name` - Name of the device to use for both input and output
    pub fn select_device(&mut self, name: &str) -> Result<()> {
        let host = Self::get_host();

        let device = host
            .devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioEngineError::DeviceNotFound(name.to_string()))?;

        self.device = Some(device);
        self.device_name = Some(name.to_string());

        Ok(())
    }

    /// Select the host's default input device
    pub fn select_default_device(&mut self) -> Result<()> {
        let host = Self::get_host();
        let device = host
            .default_input_device()
            .ok_or(AudioEngineError::NoDevicesFound)?;
        let name = device.name().unwrap_or_else(|_| "default".to_string());

        self.device = Some(device);
        self.device_name = Some(name);

        Ok(())
    }

    /// Get the selected device name
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Start audio processing
    ///
    /// Opens input and output streams on the selected device, initialises a
    /// fresh engine and begins vocoding.
    pub fn start(&mut self) -> Result<()> {
        if self.state == EngineState::Running {
            return Ok(());
        }

        let device = self.device.as_ref().ok_or(AudioEngineError::NoDeviceSelected)?;

        let default_input = device.default_input_config();
        let default_output = device.default_output_config();

        tracing::info!(
            "Device default input config: {:?}",
            default_input
                .as_ref()
                .map(|c| (c.sample_rate().0, c.channels()))
        );
        tracing::info!(
            "Device default output config: {:?}",
            default_output
                .as_ref()
                .map(|c| (c.sample_rate().0, c.channels()))
        );

        let input_channels = default_input.as_ref().map(|c| c.channels()).unwrap_or(0);
        let output_channels = default_output.as_ref().map(|c| c.channels()).unwrap_or(0);

        if input_channels < 2 {
            return Err(AudioEngineError::NotEnoughInputChannels {
                required: 2,
                available: input_channels,
            }
            .into());
        }
        if output_channels == 0 {
            return Err(AudioEngineError::NoOutputChannels.into());
        }

        let rate = self.sample_rate;
        let input_config = StreamConfig {
            channels: input_channels,
            sample_rate: SampleRate(rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let output_config = StreamConfig {
            channels: output_channels,
            sample_rate: SampleRate(rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // (modulator, carrier) pairs from input to output callback
        let ring = HeapRb::<[f32; 2]>::new(RING_BUFFER_SIZE);
        let (mut producer, mut consumer) = ring.split();

        let (param_tx, param_rx): (Sender<TalkBoxParams>, Receiver<TalkBoxParams>) =
            crossbeam_channel::bounded(PARAM_QUEUE_SIZE);

        let running = Arc::new(AtomicBool::new(true));
        let input_frames = Arc::new(AtomicUsize::new(0));
        let output_frames = Arc::new(AtomicUsize::new(0));
        let underruns = Arc::new(AtomicUsize::new(0));

        // Engine moved into the output closure (no Mutex)
        let mut engine = TalkBoxProcessor::new(rate as f32, &self.params);
        let block_size = self.block_size;
        tracing::info!(
            frame_len = engine.frame_length(),
            order = engine.lpc_order(),
            block_size,
            "Engine initialised"
        );

        let input_running = Arc::clone(&running);
        let input_count = Arc::clone(&input_frames);
        let num_input_channels = input_channels as usize;
        let input_stream = device
            .build_input_stream(
                &input_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !input_running.load(Ordering::Relaxed) {
                        return;
                    }
                    let mut pushed = 0usize;
                    for frame in data.chunks(num_input_channels) {
                        if frame.len() < 2 {
                            continue;
                        }
                        // Full ring: output side is stalled, drop input
                        if producer.try_push([frame[0], frame[1]]).is_ok() {
                            pushed += 1;
                        }
                    }
                    input_count.fetch_add(pushed, Ordering::Relaxed);
                },
                move |err| {
                    tracing::error!("Input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioEngineError::StreamError(e.to_string()))?;

        let output_running = Arc::clone(&running);
        let output_count = Arc::clone(&output_frames);
        let underrun_count = Arc::clone(&underruns);
        let num_output_channels = output_channels as usize;

        // Preallocated block scratch, owned by the closure
        let mut modulator = [0.0f32; MAX_BLOCK_SIZE];
        let mut carrier = [0.0f32; MAX_BLOCK_SIZE];
        let mut left = [0.0f32; MAX_BLOCK_SIZE];
        let mut right = [0.0f32; MAX_BLOCK_SIZE];

        let output_stream = device
            .build_output_stream(
                &output_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !output_running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    while let Ok(params) = param_rx.try_recv() {
                        engine.update_parameters(&params);
                    }

                    let mut missing = 0usize;
                    for out_block in data.chunks_mut(block_size * num_output_channels) {
                        let frames = out_block.len() / num_output_channels;

                        for i in 0..frames {
                            let [m, c] = consumer.try_pop().unwrap_or_else(|| {
                                missing += 1;
                                [0.0, 0.0]
                            });
                            modulator[i] = m;
                            carrier[i] = c;
                        }

                        engine.process_block(
                            &modulator[..frames],
                            &carrier[..frames],
                            &mut left[..frames],
                            &mut right[..frames],
                        );

                        for (i, frame) in out_block.chunks_mut(num_output_channels).enumerate() {
                            frame[0] = left[i];
                            if frame.len() > 1 {
                                frame[1] = right[i];
                            }
                            for ch in frame.iter_mut().skip(2) {
                                *ch = 0.0;
                            }
                        }
                    }

                    output_count.fetch_add(data.len() / num_output_channels, Ordering::Relaxed);
                    if missing > 0 {
                        underrun_count.fetch_add(missing, Ordering::Relaxed);
                    }
                },
                move |err| {
                    tracing::error!("Output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioEngineError::StreamError(e.to_string()))?;

        input_stream.play()?;
        output_stream.play()?;

        self.input_stream = Some(input_stream);
        self.output_stream = Some(output_stream);
        self.param_tx = Some(param_tx);
        self.running = Some(running);
        self.input_frames = Some(input_frames);
        self.output_frames = Some(output_frames);
        self.underruns = Some(underruns);
        self.state = EngineState::Running;

        tracing::info!(
            "Talkbox started: {} @ {}Hz, {} in / {} out channels",
            self.device_name.as_deref().unwrap_or("unknown"),
            rate,
            input_channels,
            output_channels
        );

        Ok(())
    }

    /// Stop audio processing
    pub fn stop(&mut self) -> Result<()> {
        if let Some(ref running) = self.running {
            running.store(false, Ordering::Relaxed);
        }

        self.input_stream = None;
        self.output_stream = None;
        self.param_tx = None;
        self.running = None;
        self.input_frames = None;
        self.output_frames = None;
        self.underruns = None;

        if self.state == EngineState::Running {
            tracing::info!("Talkbox stopped");
        }
        self.state = EngineState::Stopped;

        Ok(())
    }

    /// Frame counts for monitoring (input, output)
    pub fn frame_counts(&self) -> (usize, usize) {
        let load = |c: &Option<Arc<AtomicUsize>>| {
            c.as_ref().map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
        };
        (load(&self.input_frames), load(&self.output_frames))
    }

    /// Output frames rendered from silence because input was late
    pub fn underruns(&self) -> usize {
        self.underruns
            .as_ref()
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Select a device by name, or the default when `name` is `None`
    pub fn open(&mut self, name: Option<&str>) -> Result<()> {
        match name {
            Some(name) => self.select_device(name),
            None => self
                .select_default_device()
                .map_err(|e| anyhow!("No default device: {}", e)),
        }
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
