//! Talkbox Core - LPC vocoder engine, offline harness and live host
//!
//! This library implements a real-time linear-predictive-coding "talkbox":
//! the spectral envelope of a modulator (voice) is imposed onto a carrier
//! (synth) signal and mixed with the dry modulator. The processing engine
//! runs sample by sample inside a fixed-size audio callback without heap
//! allocation or blocking.

pub mod audio;
pub mod config;
pub mod dsp;

pub use config::AppConfig;
pub use dsp::params::TalkBoxParams;
pub use dsp::processor::TalkBoxProcessor;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date stamped by build.rs
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Capacity of every OLA buffer and of the window table (samples)
pub const BUF_MAX: usize = 1600;

/// Size of the LPC scratch arrays; the order is always below this bound
pub const ORD_MAX: usize = 50;

/// Lowest accepted sample rate (Hz)
pub const MIN_SAMPLE_RATE: f32 = 8000.0;

/// Highest accepted sample rate (Hz)
pub const MAX_SAMPLE_RATE: f32 = 96000.0;

/// Default sample rate for the live host (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default processing block size (1 ms at 48 kHz)
pub const DEFAULT_BLOCK_SIZE: usize = 48;

/// Largest block handed to the engine in one call by the hosts
pub const MAX_BLOCK_SIZE: usize = 4096;
