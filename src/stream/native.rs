//! Streaming adapter over the operating system's speech-recognition
//! service.
//!
//! The OS surface is abstracted behind [`SpeechService`] so the adapter
//! logic (locale expansion, on-device preference, benign-error swallowing,
//! the activation gate) is testable without platform bindings. On targets
//! without a binding the default service reports itself unavailable and the
//! caller falls back to non-streaming transcription.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;

use crate::stream::{
    StartError, StreamingProvider, TranscriptAccumulator, TranscriptionUpdate, UpdateListener,
};

// ---------------------------------------------------------------------------
// Raw service surface
// ---------------------------------------------------------------------------

/// Engine-side recognition events, before adapter translation.
#[derive(Debug, Clone)]
pub enum RawSpeechEvent {
    /// An in-progress hypothesis; replaces the previous one.
    Partial(String),
    /// A finalized utterance segment.
    Final(String),
    /// The engine reported an error with a platform error code.
    Error { code: i32, message: String },
}

/// Error codes the adapter treats as benign: cancellation on stop and
/// "no speech detected". These are routine outcomes, not failures.
const BENIGN_ERROR_CODES: &[i32] = &[216, 1110];

/// Errors from establishing a raw recognition session.
#[derive(Debug, Clone, Error)]
pub enum SpeechServiceError {
    /// The service or the requested locale has no recognizer on this
    /// machine. Maps to [`StartError::EngineUnavailable`].
    #[error("speech service unavailable: {0}")]
    Unavailable(String),
    /// The recognizer exists but failed to start. Maps to
    /// [`StartError::Engine`].
    #[error("speech session failed to start: {0}")]
    Failed(String),
}

/// Minimal surface of the platform speech framework.
pub trait SpeechService: Send + Sync {
    /// Whether recognition is permitted. Triggers the platform consent
    /// prompt at most once; later calls return the stored decision.
    fn request_authorization(&self) -> bool;

    /// Whether `locale` (full form, e.g. `"en-US"`) can be recognized
    /// without leaving the device.
    fn supports_on_device(&self, locale: &str) -> bool;

    /// Open a recognition session. `events` is invoked from an
    /// engine-internal thread for every partial, final and error.
    fn start_session(
        &self,
        locale: &str,
        on_device: bool,
        events: Arc<dyn Fn(RawSpeechEvent) + Send + Sync>,
    ) -> Result<Arc<dyn SpeechSession>, SpeechServiceError>;
}

/// One live recognition session.
pub trait SpeechSession: Send + Sync {
    /// Hand one buffer of 16 kHz mono samples to the recognizer's own
    /// queue. Must not block.
    fn feed(&self, samples: &[f32]);

    /// Quiesce input and block until the engine delivers its final text.
    fn finish(&self) -> Result<String, SpeechServiceError>;
}

/// The platform service for the current target.
///
/// No binding is compiled in on this target set, so the returned service
/// reports every locale unavailable and session starts fail with
/// [`SpeechServiceError::Unavailable`]; the registry then falls back to the
/// local models.
pub fn system_speech_service() -> Arc<dyn SpeechService> {
    Arc::new(UnboundSpeechService)
}

struct UnboundSpeechService;

impl SpeechService for UnboundSpeechService {
    fn request_authorization(&self) -> bool {
        // Not a consent problem: the binding simply is not present, and
        // that is reported at session start instead.
        true
    }

    fn supports_on_device(&self, _locale: &str) -> bool {
        false
    }

    fn start_session(
        &self,
        locale: &str,
        _on_device: bool,
        _events: Arc<dyn Fn(RawSpeechEvent) + Send + Sync>,
    ) -> Result<Arc<dyn SpeechSession>, SpeechServiceError> {
        Err(SpeechServiceError::Unavailable(format!(
            "no system speech binding on this platform (locale {locale})"
        )))
    }
}

// ---------------------------------------------------------------------------
// Locale expansion
// ---------------------------------------------------------------------------

/// Expand a short language code to the full locale identifier the OS
/// recognizer expects. Unknown codes fall back to `en-US`.
pub fn expand_locale(short: &str) -> &'static str {
    match short {
        "en" => "en-US",
        "de" => "de-DE",
        "fr" => "fr-FR",
        "es" => "es-ES",
        "it" => "it-IT",
        "pt" => "pt-BR",
        "nl" => "nl-NL",
        "ja" => "ja-JP",
        "ko" => "ko-KR",
        "zh" => "zh-CN",
        "ru" => "ru-RU",
        "pl" => "pl-PL",
        "sv" => "sv-SE",
        _ => "en-US",
    }
}

// ---------------------------------------------------------------------------
// NativeSpeechProvider
// ---------------------------------------------------------------------------

/// [`StreamingProvider`] implementation over [`SpeechService`].
pub struct NativeSpeechProvider {
    service: Arc<dyn SpeechService>,
    // `Some` means a session is active; the flag and the session reference
    // change together.
    gate: Mutex<Option<Arc<dyn SpeechSession>>>,
    listener: Mutex<Option<Arc<dyn UpdateListener>>>,
    accumulator: Arc<Mutex<TranscriptAccumulator>>,
}

impl NativeSpeechProvider {
    pub fn new(service: Arc<dyn SpeechService>) -> Self {
        Self {
            service,
            gate: Mutex::new(None),
            listener: Mutex::new(None),
            accumulator: Arc::new(Mutex::new(TranscriptAccumulator::new())),
        }
    }

    fn snapshot(&self) -> String {
        self.accumulator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot()
    }
}

#[async_trait]
impl StreamingProvider for NativeSpeechProvider {
    async fn request_authorization(&self) -> bool {
        self.service.request_authorization()
    }

    fn set_listener(&self, listener: Arc<dyn UpdateListener>) {
        let mut guard = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(listener);
    }

    async fn start_streaming(&self, locale: &str) -> Result<(), StartError> {
        {
            let gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            if gate.is_some() {
                return Err(StartError::AlreadyActive);
            }
        }

        let full_locale = expand_locale(locale);
        let on_device = self.service.supports_on_device(full_locale);
        info!(
            "starting system speech session: locale {full_locale}, {}",
            if on_device { "on-device" } else { "networked" }
        );

        self.accumulator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        let accumulator = Arc::clone(&self.accumulator);
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(Arc::clone);

        let events: Arc<dyn Fn(RawSpeechEvent) + Send + Sync> =
            Arc::new(move |event: RawSpeechEvent| {
                let update = match event {
                    RawSpeechEvent::Partial(text) => TranscriptionUpdate::volatile(text),
                    RawSpeechEvent::Final(text) => TranscriptionUpdate::confirmed(text),
                    RawSpeechEvent::Error { code, message } => {
                        if BENIGN_ERROR_CODES.contains(&code) {
                            debug!("benign speech engine notice {code}: {message}");
                        } else if let Some(listener) = &listener {
                            listener.on_error(&format!("speech engine error {code}: {message}"));
                        } else {
                            warn!("speech engine error {code}: {message}");
                        }
                        return;
                    }
                };
                accumulator
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .apply(&update);
                if let Some(listener) = &listener {
                    listener.on_update(update);
                }
            });

        let session = self
            .service
            .start_session(full_locale, on_device, events)
            .map_err(|e| match e {
                SpeechServiceError::Unavailable(msg) => StartError::EngineUnavailable(msg),
                SpeechServiceError::Failed(msg) => StartError::Engine(msg),
            })?;

        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        *gate = Some(session);
        Ok(())
    }

    fn append_buffer(&self, samples: &[f32]) {
        let session = {
            let gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            gate.as_ref().map(Arc::clone)
        };
        if let Some(session) = session {
            session.feed(samples);
        }
    }

    async fn stop_streaming(&self) -> String {
        let session = self.gate.lock().unwrap_or_else(|e| e.into_inner()).take();
        let session = match session {
            Some(s) => s,
            None => return self.snapshot(),
        };

        let finished = tokio::task::spawn_blocking(move || session.finish()).await;
        match finished {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) => self.snapshot(),
            Ok(Err(e)) => {
                // Cancellation-style errors on stop are routine; anything
                // else still resolves to best-effort accumulated text.
                debug!("system speech finalize reported: {e}");
                self.snapshot()
            }
            Err(e) => {
                warn!("system speech finalize task failed: {e}");
                self.snapshot()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
