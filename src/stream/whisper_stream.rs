//! Streaming adapter over the local Whisper-style models.
//!
//! # How it streams
//!
//! The underlying engine only knows whole-buffer decoding, so the adapter
//! synthesises streaming on top of it: a dedicated worker thread accumulates
//! incoming 16 kHz audio and re-decodes the session roughly once per second
//! of new material. Consecutive passes feed [`LocalAgreement`]; tokens two
//! passes agree on are emitted as confirmed, the remainder as the volatile
//! hypothesis. On stop the worker runs one last authoritative pass over the
//! full audio.
//!
//! # Activation gate
//!
//! The active flag and the channel into the worker are one value: the
//! `Mutex<Option<Sender>>` gate. `start_streaming` publishes the sender only
//! after the engine is warm and the worker is running; `stop_streaming`
//! takes it out, which both deactivates the adapter and hangs up the
//! channel, letting the worker drain and finalize. `append_buffer` clones
//! the sender under a short lock and sends outside it, so the hot path never
//! waits on engine work.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use async_trait::async_trait;
use log::{debug, warn};

use crate::stream::{
    LocalAgreement, StartError, StreamingProvider, TranscriptAccumulator, TranscriptionUpdate,
    UpdateListener,
};
use crate::stt::{
    streaming_model_for_revision, EngineRevision, ModelPaths, SttEngine, SttError,
    TranscribeParams, WhisperEngine,
};

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

/// New audio required before the worker runs another decoding pass: 1 s.
const PASS_STEP_SAMPLES: usize = 16_000;

/// The engine rejects very short buffers, so early passes are zero-padded up
/// to this length: 0.5 s.
const MIN_DECODE_SAMPLES: usize = 8_000;

// ---------------------------------------------------------------------------
// WhisperStreamProvider
// ---------------------------------------------------------------------------

/// [`StreamingProvider`] implementation for the local streaming models.
///
/// The engine revision is fixed at construction; switching revisions means
/// constructing a new provider (the registry discards and rebuilds).
pub struct WhisperStreamProvider {
    revision: EngineRevision,
    model_path: PathBuf,
    base_params: TranscribeParams,
    prepared: Mutex<Option<PreparedEngine>>,
    // `Some` means a run is active; taking the sender hangs up the worker.
    gate: Mutex<Option<Sender<Vec<f32>>>>,
    worker: Mutex<Option<JoinHandle<Option<String>>>>,
    listener: Mutex<Option<Arc<dyn UpdateListener>>>,
    accumulator: Arc<Mutex<TranscriptAccumulator>>,
}

struct PreparedEngine {
    language: String,
    engine: Arc<dyn SttEngine>,
}

impl WhisperStreamProvider {
    /// Resolve the model for `revision` under `paths` and construct a cold
    /// provider. No engine work happens until
    /// [`prepare_for_streaming`](Self::prepare_for_streaming) or
    /// `start_streaming`.
    ///
    /// # Errors
    ///
    /// [`StartError::EngineUnavailable`] when the revision's model carries
    /// no weights file entry.
    pub fn new(
        revision: EngineRevision,
        paths: &ModelPaths,
        base_params: TranscribeParams,
    ) -> Result<Self, StartError> {
        let descriptor = streaming_model_for_revision(revision);
        let model_path = paths.model_path(descriptor).ok_or_else(|| {
            StartError::EngineUnavailable(format!("model {} has no weights file", descriptor.id))
        })?;

        Ok(Self {
            revision,
            model_path,
            base_params,
            prepared: Mutex::new(None),
            gate: Mutex::new(None),
            worker: Mutex::new(None),
            listener: Mutex::new(None),
            accumulator: Arc::new(Mutex::new(TranscriptAccumulator::new())),
        })
    }

    /// The engine revision this provider was built for.
    pub fn revision(&self) -> EngineRevision {
        self.revision
    }

    /// Warm-load the engine ahead of the first session so `start_streaming`
    /// does not pay the model-load cost. Idempotent: a second call while the
    /// engine is already warm returns immediately.
    ///
    /// # Errors
    ///
    /// - [`StartError::EngineUnavailable`] — the weights file is missing.
    /// - [`StartError::Engine`] — the engine failed to initialise.
    pub async fn prepare_for_streaming(&self) -> Result<(), StartError> {
        let language = self.base_params.language.clone();
        self.ensure_engine(&language).await.map(|_| ())
    }

    /// Whether a warm engine instance is currently held.
    pub fn is_prepared(&self) -> bool {
        self.prepared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    async fn ensure_engine(&self, language: &str) -> Result<Arc<dyn SttEngine>, StartError> {
        {
            let guard = self.prepared.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(prepared) = guard.as_ref() {
                if prepared.language == language {
                    return Ok(Arc::clone(&prepared.engine));
                }
                debug!(
                    "reloading streaming engine: language {} -> {}",
                    prepared.language, language
                );
            }
        }

        let path = self.model_path.clone();
        let params = TranscribeParams {
            language: language.to_string(),
            ..self.base_params.clone()
        };
        let loaded = tokio::task::spawn_blocking(move || WhisperEngine::load(path, params))
            .await
            .map_err(|e| StartError::Engine(format!("engine load task failed: {e}")))?;

        let engine: Arc<dyn SttEngine> = match loaded {
            Ok(engine) => Arc::new(engine),
            Err(SttError::ModelNotFound(p)) => {
                return Err(StartError::EngineUnavailable(format!(
                    "weights file missing: {p}"
                )))
            }
            Err(e) => return Err(StartError::Engine(e.to_string())),
        };

        let mut guard = self.prepared.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(PreparedEngine {
            language: language.to_string(),
            engine: Arc::clone(&engine),
        });
        Ok(engine)
    }

    fn current_listener(&self) -> Option<Arc<dyn UpdateListener>> {
        self.listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(Arc::clone)
    }

    fn snapshot(&self) -> String {
        self.accumulator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot()
    }

    /// Construct a provider around an injected engine, already warm.
    #[cfg(test)]
    pub(crate) fn with_engine(engine: Arc<dyn SttEngine>, language: &str) -> Self {
        Self {
            revision: EngineRevision::V3,
            model_path: PathBuf::from("/nonexistent/test-model.bin"),
            base_params: TranscribeParams {
                language: language.to_string(),
                ..TranscribeParams::default()
            },
            prepared: Mutex::new(Some(PreparedEngine {
                language: language.to_string(),
                engine,
            })),
            gate: Mutex::new(None),
            worker: Mutex::new(None),
            listener: Mutex::new(None),
            accumulator: Arc::new(Mutex::new(TranscriptAccumulator::new())),
        }
    }
}

#[async_trait]
impl StreamingProvider for WhisperStreamProvider {
    /// Authorization for a local model means its weights are on disk (or an
    /// engine is already warm).
    async fn request_authorization(&self) -> bool {
        self.is_prepared() || self.model_path.exists()
    }

    fn set_listener(&self, listener: Arc<dyn UpdateListener>) {
        let mut guard = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(listener);
    }

    async fn prepare(&self) -> Result<(), StartError> {
        self.prepare_for_streaming().await
    }

    async fn start_streaming(&self, locale: &str) -> Result<(), StartError> {
        {
            let gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            if gate.is_some() {
                return Err(StartError::AlreadyActive);
            }
        }

        let engine = self.ensure_engine(locale).await?;

        self.accumulator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        let (tx, rx) = mpsc::channel::<Vec<f32>>();
        let worker = StreamWorker {
            engine,
            listener: self.current_listener(),
            accumulator: Arc::clone(&self.accumulator),
            agreement: LocalAgreement::new(),
            audio: Vec::new(),
            decoded_to: 0,
        };
        let handle = std::thread::Builder::new()
            .name("stream-decode".into())
            .spawn(move || worker.run(rx))
            .map_err(|e| StartError::Engine(format!("worker thread spawn failed: {e}")))?;

        // Worker is live and the engine is warm; only now does the adapter
        // become visible to the audio hot path.
        {
            let mut guard = self.worker.lock().unwrap_or_else(|e| e.into_inner());
            *guard = Some(handle);
        }
        {
            let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            *gate = Some(tx);
        }
        debug!("streaming started (revision {:?}, locale {locale})", self.revision);
        Ok(())
    }

    fn append_buffer(&self, samples: &[f32]) {
        let tx = {
            let gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            gate.as_ref().cloned()
        };
        if let Some(tx) = tx {
            // A send error means the worker already hung up mid-stop; the
            // buffer is dropped, which is the documented shutdown behaviour.
            let _ = tx.send(samples.to_vec());
        }
    }

    async fn stop_streaming(&self) -> String {
        // Deactivate and hang up the channel in one step.
        let sender = self.gate.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(sender);

        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        let handle = match handle {
            Some(h) => h,
            // Never started, or a second stop: best-effort text.
            None => return self.snapshot(),
        };

        let joined = tokio::task::spawn_blocking(move || handle.join()).await;
        match joined {
            Ok(Ok(Some(text))) => text,
            other => {
                // Finalize failed or the worker panicked. Return the merged
                // live text and discard the engine instance so the next
                // session starts from a clean load.
                warn!("streaming finalize failed ({other:?}); using accumulated text");
                let mut prepared = self.prepared.lock().unwrap_or_else(|e| e.into_inner());
                *prepared = None;
                drop(prepared);
                self.snapshot()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// StreamWorker
// ---------------------------------------------------------------------------

/// Owns the per-run decode loop on the `stream-decode` thread.
struct StreamWorker {
    engine: Arc<dyn SttEngine>,
    listener: Option<Arc<dyn UpdateListener>>,
    accumulator: Arc<Mutex<TranscriptAccumulator>>,
    agreement: LocalAgreement,
    audio: Vec<f32>,
    decoded_to: usize,
}

impl StreamWorker {
    /// Drain the channel, re-decoding as audio accumulates, then run the
    /// finalize pass once the sender hangs up. Returns `None` when the
    /// finalize pass itself failed.
    fn run(mut self, rx: Receiver<Vec<f32>>) -> Option<String> {
        while let Ok(chunk) = rx.recv() {
            self.audio.extend_from_slice(&chunk);
            // Batch up whatever else is already queued before deciding to
            // decode, so a backlog never causes one pass per chunk.
            while let Ok(more) = rx.try_recv() {
                self.audio.extend_from_slice(&more);
            }
            if self.audio.len() - self.decoded_to >= PASS_STEP_SAMPLES {
                self.periodic_pass();
            }
        }
        self.finalize_pass()
    }

    fn periodic_pass(&mut self) {
        self.decoded_to = self.audio.len();
        let text = match self.decode_current() {
            Ok(text) => text,
            Err(e) => {
                // Transient: skip this pass, the next one re-covers the
                // same audio.
                warn!("streaming pass failed: {e}");
                return;
            }
        };

        let tokens: Vec<String> = text.split_whitespace().map(String::from).collect();
        let newly = self.agreement.observe(&tokens);
        if !newly.is_empty() {
            self.emit(TranscriptionUpdate::confirmed(newly.join(" ")));
        }
        self.emit(TranscriptionUpdate::volatile(self.agreement.pending().join(" ")));
    }

    /// Authoritative last pass over the full session audio.
    fn finalize_pass(&mut self) -> Option<String> {
        if self.audio.is_empty() {
            return Some(self.agreement.committed_text());
        }
        match self.decode_current() {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("finalize pass failed: {e}");
                None
            }
        }
    }

    fn decode_current(&self) -> Result<String, SttError> {
        if self.audio.len() >= MIN_DECODE_SAMPLES {
            self.engine.transcribe(&self.audio)
        } else {
            let mut padded = self.audio.clone();
            padded.resize(MIN_DECODE_SAMPLES, 0.0);
            self.engine.transcribe(&padded)
        }
    }

    fn emit(&self, update: TranscriptionUpdate) {
        self.accumulator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(&update);
        if let Some(listener) = &self.listener {
            listener.on_update(update);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
