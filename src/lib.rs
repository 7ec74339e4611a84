//! Talkbox - real-time LPC vocoder
//!
//! This library re-exports the engine, the offline WAV harness and the
//! live host from `talkbox-core`.

pub use talkbox_core::audio;
pub use talkbox_core::config;
pub use talkbox_core::dsp;

pub use talkbox_core::{AppConfig, TalkBoxParams, TalkBoxProcessor};
pub use talkbox_core::{BUF_MAX, BUILD_DATE, DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, MAX_BLOCK_SIZE, ORD_MAX, VERSION};
