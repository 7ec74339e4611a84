//! Signal processing stages of the talkbox
//!
//! - Parameter validation and derived constants ([`params`])
//! - Fixed all-pass conditioning networks ([`allpass`])
//! - Overlap-add buffers and the half-rate gate ([`ola`])
//! - LPC analysis and lattice synthesis ([`lpc`])
//! - The engine that ties them together ([`processor`])

pub mod allpass;
pub mod lpc;
pub mod ola;
pub mod params;
pub mod processor;
