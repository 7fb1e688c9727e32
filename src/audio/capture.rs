//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle. Call
//! [`AudioCapture::start`] to begin streaming [`AudioChunk`]s over an mpsc
//! channel, or [`AudioCapture::start_forwarding`] to additionally spawn the
//! conversion thread that feeds 16 kHz mono samples into a
//! [`ForwardingSlot`]. The returned [`StreamHandle`] is a RAII guard —
//! dropping it stops the underlying cpal stream.
//!
//! The cpal callback itself never locks anything owned by this crate: it
//! copies the hardware buffer into an [`AudioChunk`] and sends it over a
//! std mpsc channel. Downmix/resample happen on the dedicated conversion
//! thread, which then performs the single short-lock hand-off into the slot.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use std::sync::Arc;
use thiserror::Error;

use crate::stream::ForwardingSlot;

use super::resample::{resample_to_16k, stereo_to_mono};

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]` at the device's
/// native rate. Use [`stereo_to_mono`] and [`resample_to_16k`] to convert
/// to the 16 kHz mono format the recognition engines require.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value stops the underlying hardware stream, which closes
/// the chunk channel and lets the conversion thread exit.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use voxstream::audio::AudioCapture;
/// use voxstream::stream::ForwardingSlot;
///
/// let slot = Arc::new(ForwardingSlot::new());
/// let capture = AudioCapture::new().unwrap();
/// let _handle = capture.start_forwarding(Arc::clone(&slot)).unwrap();
/// // `_handle` keeps the stream alive; drop it to stop capturing.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Native sample rate reported by the device (Hz).
    sample_rate: u32,
    /// Number of interleaved channels reported by the device.
    channels: u16,
}

impl AudioCapture {
    /// Create a new [`AudioCapture`] using the system default input device.
    ///
    /// Queries the device's preferred stream configuration (sample rate,
    /// channels, buffer size) so no manual configuration is required.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NoDevice`] when no input device is available,
    /// or [`CaptureError::DefaultConfig`] when the device cannot report a
    /// default stream configuration.
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;

        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start recording and send raw [`AudioChunk`]s to `tx`.
    ///
    /// The cpal callback runs on a dedicated real-time audio thread; each
    /// time the hardware delivers a buffer the raw `f32` samples are wrapped
    /// in an [`AudioChunk`] and forwarded over the channel. Send errors
    /// (receiver dropped) are silently ignored so the audio thread never
    /// panics.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`]
    /// if the platform rejects the stream configuration.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                };
                // Ignore send errors; the receiver may have been dropped.
                let _ = tx.send(chunk);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Start recording and forward converted 16 kHz mono samples into
    /// `slot`.
    ///
    /// Spawns the `audio-convert` thread, which drains raw chunks from the
    /// cpal callback, downmixes and resamples them, and hands each converted
    /// buffer to [`ForwardingSlot::forward`]. When no provider is installed
    /// in the slot the buffer is dropped there — the capture keeps running
    /// across sessions.
    ///
    /// The thread exits when the returned [`StreamHandle`] is dropped (the
    /// chunk channel closes).
    pub fn start_forwarding(&self, slot: Arc<ForwardingSlot>) -> Result<StreamHandle, CaptureError> {
        let channels = self.channels;
        let (chunk_tx, chunk_rx) = mpsc::channel::<AudioChunk>();

        std::thread::Builder::new()
            .name("audio-convert".into())
            .spawn(move || {
                while let Ok(chunk) = chunk_rx.recv() {
                    let mono = if channels > 1 {
                        stereo_to_mono(&chunk.samples, channels)
                    } else {
                        chunk.samples
                    };

                    let samples = if chunk.sample_rate != 16_000 {
                        resample_to_16k(&mono, chunk.sample_rate)
                    } else {
                        mono
                    };

                    slot.forward(&samples);
                }
                log::debug!("audio-convert thread exiting");
            })
            .expect("failed to spawn audio-convert thread");

        self.start(chunk_tx)
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`AudioChunk`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// `AudioChunk` must be `Send` so it can cross thread boundaries.
    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
    }

    #[test]
    fn audio_chunk_fields() {
        let chunk = AudioChunk {
            samples: vec![0.0_f32; 512],
            sample_rate: 48_000,
            channels: 2,
        };
        assert_eq!(chunk.samples.len(), 512);
        assert_eq!(chunk.sample_rate, 48_000);
        assert_eq!(chunk.channels, 2);
    }
}
