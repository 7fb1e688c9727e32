//! Audio front-end — microphone capture → conversion → forwarding slot.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → audio-convert thread
//!           → stereo_to_mono → resample_to_16k → ForwardingSlot::forward
//! ```
//!
//! The cpal callback is the real-time producer: it only copies the hardware
//! buffer and sends it over a channel. All conversion work happens on the
//! `audio-convert` thread so the callback can never be delayed by it.

pub mod capture;
pub mod resample;

pub use capture::{AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use resample::{resample_to_16k, stereo_to_mono};
