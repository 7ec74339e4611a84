//! Audio plumbing around the engine
//!
//! - Offline WAV render harness ([`wav`])
//! - Spectral and level summaries of rendered audio ([`analysis`])
//! - Live duplex host on an audio device ([`engine`], feature `live`)

pub mod analysis;
#[cfg(feature = "live")]
pub mod engine;
pub mod wav;
