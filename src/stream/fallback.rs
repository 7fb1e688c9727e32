//! Whole-buffer transcription over a streaming-only backend.
//!
//! Streaming-only models (and the system speech service) expose no batch
//! decode, yet pre-recorded imports still need the plain [`SttEngine`]
//! contract. This wrapper drives one complete streaming run internally:
//! start, replay the buffer as real-time-sized chunks, stop, and hand back
//! the finalize text.

use std::sync::Arc;

use log::debug;

use crate::stream::{StartError, StreamingProvider};
use crate::stt::{SttEngine, SttError};

/// Samples per replayed chunk: 1 s of 16 kHz mono. Large enough to keep the
/// per-chunk overhead negligible on long files.
const REPLAY_CHUNK_SAMPLES: usize = 16_000;

/// Minimum buffer length accepted, matching the plain contract.
const MIN_AUDIO_SAMPLES: usize = 8_000;

// ---------------------------------------------------------------------------
// StreamingBatchFallback
// ---------------------------------------------------------------------------

/// Adapts an `Arc<dyn StreamingProvider>` to [`SttEngine`].
///
/// `transcribe` must be called off the async runtime's core threads (the
/// callers all run it inside `spawn_blocking`): it drives the provider's
/// async lifecycle on a private current-thread runtime.
pub struct StreamingBatchFallback {
    provider: Arc<dyn StreamingProvider>,
    locale: String,
}

impl StreamingBatchFallback {
    pub fn new(provider: Arc<dyn StreamingProvider>, locale: impl Into<String>) -> Self {
        Self {
            provider,
            locale: locale.into(),
        }
    }

    async fn run_once(&self, audio: &[f32]) -> Result<String, SttError> {
        if !self.provider.request_authorization().await {
            return Err(SttError::Unavailable("streaming backend".into()));
        }
        self.provider
            .start_streaming(&self.locale)
            .await
            .map_err(|e| match e {
                StartError::NotAuthorized | StartError::EngineUnavailable(_) => {
                    SttError::Unavailable(e.to_string())
                }
                StartError::AlreadyActive | StartError::Engine(_) => {
                    SttError::Transcription(e.to_string())
                }
            })?;

        for chunk in audio.chunks(REPLAY_CHUNK_SAMPLES) {
            self.provider.append_buffer(chunk);
        }

        // stop_streaming waits for the backend to drain and finalize, so no
        // pacing is needed between chunks.
        Ok(self.provider.stop_streaming().await)
    }
}

impl SttEngine for StreamingBatchFallback {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        if audio.len() < MIN_AUDIO_SAMPLES {
            return Err(SttError::AudioTooShort);
        }
        debug!(
            "batch fallback: replaying {} samples through streaming backend",
            audio.len()
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SttError::Transcription(format!("fallback runtime: {e}")))?;
        runtime.block_on(self.run_once(audio))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
