//! Session lifecycle over the streaming providers.
//!
//! The coordinator owns the session state machine and the ordering rules
//! that keep live audio, provider lifecycle and transcript delivery
//! consistent:
//!
//! - the forwarding slot is installed **before** `start_streaming`, so the
//!   engine is ready the instant audio can reach it, and cleared only
//!   **after** `stop_streaming` returns;
//! - one session at a time, with `Failed` as a recoverable excursion back
//!   to `Idle`;
//! - the finalize text is delivered to the sink and persisted exactly once
//!   per session.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::AppConfig;
use crate::stream::{
    ForwardingSlot, ProviderSource, StartError, StreamingProvider, TranscriptAccumulator,
    TranscriptionUpdate, UpdateListener,
};
use crate::stt::{ModelDescriptor, ProviderKind};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle of a live dictation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session. Accepts `begin`.
    Idle,
    /// Authorization, warm-up and engine start are in flight.
    Preparing,
    /// Audio is being forwarded and updates are flowing.
    Active,
    /// `finish` is draining and finalizing the engine.
    Finalizing,
    /// The last `begin` failed. Accepts `begin` like `Idle`.
    Failed,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Preparing => "preparing",
            SessionState::Active => "active",
            SessionState::Finalizing => "finalizing",
            SessionState::Failed => "failed",
        }
    }

    /// Whether `begin` may be called in this state.
    pub fn accepts_begin(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Failed)
    }
}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors from [`StreamingCoordinator::begin`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Streaming is disabled for this model (capability or preference);
    /// the caller should use the non-streaming capture path instead.
    #[error("streaming is not enabled for this model")]
    StreamingDisabled,

    /// A session is already in progress.
    #[error("a streaming session is already active")]
    SessionActive,

    /// The provider declined authorization. The user has been notified.
    #[error("speech recognition is not authorized")]
    NotAuthorized,

    /// The provider could not start.
    #[error(transparent)]
    Start(#[from] StartError),
}

// ---------------------------------------------------------------------------
// Outcome seams
// ---------------------------------------------------------------------------

/// Receives the final transcript of a session (paste target, UI field).
pub trait TranscriptSink: Send + Sync {
    fn deliver(&self, text: &str);
}

/// Persists finished transcripts to history.
pub trait TranscriptStore: Send + Sync {
    fn record(&self, record: &TranscriptRecord);
}

/// Surfaces user-facing failure notices (authorization, engine start).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// One persisted dictation result.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    pub text: String,
    pub model_name: String,
    /// Audio duration in seconds. Streamed sessions record `0.0`: audio is
    /// consumed live and never measured as a file.
    pub duration_secs: f32,
}

// ---------------------------------------------------------------------------
// Streaming decision
// ---------------------------------------------------------------------------

/// Whether a live session with `descriptor` should stream.
///
/// Streaming-only models always stream. Batch-only models never do.
/// Models capable of both follow the per-model preference, which defaults
/// to enabled.
pub fn should_stream(descriptor: &ModelDescriptor, config: &AppConfig) -> bool {
    use crate::stt::StreamingCapability::*;
    match descriptor.capability {
        StreamingOnly => true,
        BatchOnly => false,
        BatchAndStreaming => config.streaming.is_enabled_for(descriptor.id),
    }
}

// ---------------------------------------------------------------------------
// StreamingCoordinator
// ---------------------------------------------------------------------------

struct SessionInner {
    provider: Arc<dyn StreamingProvider>,
    kind: ProviderKind,
    model_id: String,
    accumulator: Arc<Mutex<TranscriptAccumulator>>,
}

/// Owns the one-at-a-time session lifecycle.
pub struct StreamingCoordinator {
    providers: Arc<dyn ProviderSource>,
    slot: Arc<ForwardingSlot>,
    sink: Arc<dyn TranscriptSink>,
    store: Arc<dyn TranscriptStore>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SessionState>,
    session: Mutex<Option<SessionInner>>,
}

/// Mirrors provider updates into the session accumulator.
struct SessionListener {
    accumulator: Arc<Mutex<TranscriptAccumulator>>,
}

impl UpdateListener for SessionListener {
    fn on_update(&self, update: TranscriptionUpdate) {
        self.accumulator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(&update);
    }

    fn on_error(&self, message: &str) {
        warn!("streaming engine error mid-session: {message}");
    }
}

impl StreamingCoordinator {
    pub fn new(
        providers: Arc<dyn ProviderSource>,
        slot: Arc<ForwardingSlot>,
        sink: Arc<dyn TranscriptSink>,
        store: Arc<dyn TranscriptStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            providers,
            slot,
            sink,
            store,
            notifier,
            state: Mutex::new(SessionState::Idle),
            session: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!("session state {} -> {}", state.label(), next.label());
        *state = next;
    }

    /// Engine-unavailable degrades silently to the non-streaming path;
    /// everything else is surfaced to the user.
    fn report_start_failure(&self, error: &StartError) {
        match error {
            StartError::EngineUnavailable(msg) => {
                debug!("streaming unavailable, falling back: {msg}");
            }
            other => {
                self.notifier
                    .notify(&format!("Streaming could not start: {other}"));
            }
        }
    }

    /// The merged confirmed-plus-volatile text of the live session, or
    /// `None` when no session exists.
    pub fn live_text(&self) -> Option<String> {
        let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        session.as_ref().map(|s| {
            s.accumulator
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .snapshot()
        })
    }

    /// Begin a streaming session with `descriptor`.
    ///
    /// On success the session is `Active`: captured audio forwarded through
    /// the slot reaches the engine and [`live_text`](Self::live_text)
    /// starts moving. Failures leave the coordinator ready for another
    /// `begin`; authorization and engine-start failures additionally notify
    /// the user exactly once.
    ///
    /// # Errors
    ///
    /// See [`SessionError`]. `EngineUnavailable` is deliberately silent:
    /// the caller degrades to the non-streaming capture path.
    pub async fn begin(
        &self,
        descriptor: &ModelDescriptor,
        config: &AppConfig,
    ) -> Result<(), SessionError> {
        {
            // Admission check and the Preparing transition happen under one
            // lock acquisition: a concurrent begin must observe Preparing,
            // never a still-idle state it could also claim.
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !state.accepts_begin() {
                return Err(SessionError::SessionActive);
            }
            if !should_stream(descriptor, config) {
                return Err(SessionError::StreamingDisabled);
            }
            debug!("session state {} -> preparing", state.label());
            *state = SessionState::Preparing;
        }
        info!("beginning streaming session with model {}", descriptor.id);

        let provider = match self.providers.streaming_provider_for(descriptor) {
            Ok(p) => p,
            Err(e) => {
                // No backend for this model here; the caller falls back to
                // non-streaming capture without bothering the user.
                self.set_state(SessionState::Idle);
                return Err(SessionError::Start(e));
            }
        };

        if !provider.request_authorization().await {
            self.notifier
                .notify("Speech recognition is not authorized. Grant access in system settings.");
            self.set_state(SessionState::Failed);
            return Err(SessionError::NotAuthorized);
        }

        if let Err(e) = provider.prepare().await {
            self.providers.discard_streaming(descriptor.provider);
            self.report_start_failure(&e);
            self.set_state(SessionState::Failed);
            return Err(SessionError::Start(e));
        }

        let accumulator = Arc::new(Mutex::new(TranscriptAccumulator::new()));
        provider.set_listener(Arc::new(SessionListener {
            accumulator: Arc::clone(&accumulator),
        }));

        {
            let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
            *session = Some(SessionInner {
                provider: Arc::clone(&provider),
                kind: descriptor.provider,
                model_id: descriptor.id.to_string(),
                accumulator,
            });
        }

        // Install before start: by the time the engine is live, forwarded
        // audio already has somewhere to go.
        self.slot.install(Arc::clone(&provider));

        match provider.start_streaming(&config.stt.language).await {
            Ok(()) => {
                self.set_state(SessionState::Active);
                Ok(())
            }
            Err(e) => {
                self.slot.clear();
                {
                    let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
                    *session = None;
                }
                self.providers.discard_streaming(descriptor.provider);
                self.report_start_failure(&e);
                self.set_state(SessionState::Failed);
                Err(SessionError::Start(e))
            }
        }
    }

    /// Finish the live session: stop forwarding, finalize the engine,
    /// deliver and persist the transcript. Returns the final text, or
    /// `None` when there was no session to finish (a second `finish` is a
    /// no-op).
    pub async fn finish(&self) -> Option<String> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match *state {
                SessionState::Active => *state = SessionState::Finalizing,
                SessionState::Failed => {
                    *state = SessionState::Idle;
                    return None;
                }
                _ => return None,
            }
        }

        let inner = {
            let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
            session.take()
        };
        let inner = match inner {
            Some(inner) => inner,
            None => {
                self.set_state(SessionState::Idle);
                return None;
            }
        };

        let text = inner.provider.stop_streaming().await;
        // Only now is it safe to stop forwarding: the provider has fully
        // quiesced, so no buffer can race a half-stopped engine.
        self.slot.clear();
        self.set_state(SessionState::Idle);

        if text.trim().is_empty() {
            debug!("session finished with empty transcript");
            return Some(text);
        }

        self.sink.deliver(&text);
        self.store.record(&TranscriptRecord {
            text: text.clone(),
            model_name: inner.model_id,
            duration_secs: 0.0,
        });
        info!("session finished: {} chars via {:?}", text.len(), inner.kind);
        Some(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::{
        streaming_model_for_revision, EngineRevision, StreamingCapability, SYSTEM_MODELS,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // --- scripted provider ---

    struct ScriptedProvider {
        authorized: bool,
        prepare_error: Mutex<Option<StartError>>,
        start_error: Mutex<Option<StartError>>,
        updates_on_start: Vec<TranscriptionUpdate>,
        final_text: String,
        listener: Mutex<Option<Arc<dyn UpdateListener>>>,
        prepares: AtomicUsize,
        stops: AtomicUsize,
    }

    impl ScriptedProvider {
        fn happy(final_text: &str, updates: Vec<TranscriptionUpdate>) -> Arc<Self> {
            Arc::new(Self {
                authorized: true,
                prepare_error: Mutex::new(None),
                start_error: Mutex::new(None),
                updates_on_start: updates,
                final_text: final_text.to_string(),
                listener: Mutex::new(None),
                prepares: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            })
        }

        fn unauthorized() -> Arc<Self> {
            Arc::new(Self {
                authorized: false,
                prepare_error: Mutex::new(None),
                start_error: Mutex::new(None),
                updates_on_start: Vec::new(),
                final_text: String::new(),
                listener: Mutex::new(None),
                prepares: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            })
        }

        fn failing_prepare(error: StartError) -> Arc<Self> {
            let provider = Self::happy("", Vec::new());
            *provider.prepare_error.lock().unwrap() = Some(error);
            provider
        }

        fn failing_start(error: StartError) -> Arc<Self> {
            let provider = Self::happy("", Vec::new());
            *provider.start_error.lock().unwrap() = Some(error);
            provider
        }
    }

    #[async_trait]
    impl StreamingProvider for ScriptedProvider {
        async fn request_authorization(&self) -> bool {
            self.authorized
        }
        fn set_listener(&self, listener: Arc<dyn UpdateListener>) {
            *self.listener.lock().unwrap() = Some(listener);
        }
        async fn prepare(&self) -> Result<(), StartError> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            match self.prepare_error.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
        async fn start_streaming(&self, _locale: &str) -> Result<(), StartError> {
            if let Some(e) = self.start_error.lock().unwrap().take() {
                return Err(e);
            }
            let listener = self.listener.lock().unwrap().as_ref().map(Arc::clone);
            if let Some(listener) = listener {
                for update in &self.updates_on_start {
                    listener.on_update(update.clone());
                }
            }
            Ok(())
        }
        fn append_buffer(&self, _samples: &[f32]) {}
        async fn stop_streaming(&self) -> String {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.final_text.clone()
        }
    }

    // --- scripted source ---

    struct ScriptedSource {
        provider: Arc<ScriptedProvider>,
        result: Option<StartError>,
        discards: AtomicUsize,
    }

    impl ScriptedSource {
        fn of(provider: Arc<ScriptedProvider>) -> Arc<Self> {
            Arc::new(Self {
                provider,
                result: None,
                discards: AtomicUsize::new(0),
            })
        }

        fn unavailable() -> Arc<Self> {
            Arc::new(Self {
                provider: ScriptedProvider::happy("", Vec::new()),
                result: Some(StartError::EngineUnavailable("none".into())),
                discards: AtomicUsize::new(0),
            })
        }
    }

    impl ProviderSource for ScriptedSource {
        fn streaming_provider_for(
            &self,
            _descriptor: &ModelDescriptor,
        ) -> Result<Arc<dyn StreamingProvider>, StartError> {
            match &self.result {
                Some(e) => Err(e.clone()),
                None => Ok(self.provider.clone()),
            }
        }
        fn discard_streaming(&self, _kind: ProviderKind) {
            self.discards.fetch_add(1, Ordering::SeqCst);
        }
    }

    // --- outcome doubles ---

    #[derive(Default)]
    struct MemorySink {
        delivered: Mutex<Vec<String>>,
    }
    impl TranscriptSink for MemorySink {
        fn deliver(&self, text: &str) {
            self.delivered.lock().unwrap().push(text.to_string());
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<TranscriptRecord>>,
    }
    impl TranscriptStore for MemoryStore {
        fn record(&self, record: &TranscriptRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        count: AtomicUsize,
    }
    impl Notifier for CountingNotifier {
        fn notify(&self, _message: &str) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        coordinator: StreamingCoordinator,
        slot: Arc<ForwardingSlot>,
        sink: Arc<MemorySink>,
        store: Arc<MemoryStore>,
        notifier: Arc<CountingNotifier>,
        source: Arc<ScriptedSource>,
    }

    fn harness(source: Arc<ScriptedSource>) -> Harness {
        let slot = Arc::new(ForwardingSlot::new());
        let sink = Arc::new(MemorySink::default());
        let store = Arc::new(MemoryStore::default());
        let notifier = Arc::new(CountingNotifier::default());
        let coordinator = StreamingCoordinator::new(
            source.clone(),
            slot.clone(),
            sink.clone(),
            store.clone(),
            notifier.clone(),
        );
        Harness {
            coordinator,
            slot,
            sink,
            store,
            notifier,
            source,
        }
    }

    fn v3() -> &'static ModelDescriptor {
        streaming_model_for_revision(EngineRevision::V3)
    }

    // --- should_stream ---

    #[test]
    fn streaming_only_models_always_stream() {
        let config = AppConfig::default();
        assert!(should_stream(v3(), &config));
    }

    #[test]
    fn batch_only_models_never_stream() {
        let config = AppConfig::default();
        let small = crate::stt::find_model_by_id("whisper-small").unwrap();
        assert_eq!(small.capability, StreamingCapability::BatchOnly);
        assert!(!should_stream(small, &config));
    }

    #[test]
    fn dual_capability_models_follow_the_preference() {
        let mut config = AppConfig::default();
        let system = &SYSTEM_MODELS[0];
        assert!(should_stream(system, &config), "defaults to enabled");

        config.streaming.set_enabled_for(system.id, false);
        assert!(!should_stream(system, &config));
    }

    // --- lifecycle ---

    #[tokio::test]
    async fn happy_path_delivers_and_persists_once() {
        let provider = ScriptedProvider::happy(
            "hello world",
            vec![
                TranscriptionUpdate::volatile("hello"),
                TranscriptionUpdate::confirmed("hello"),
                TranscriptionUpdate::volatile("world"),
            ],
        );
        let h = harness(ScriptedSource::of(provider.clone()));
        let config = AppConfig::default();

        h.coordinator.begin(v3(), &config).await.unwrap();
        assert_eq!(h.coordinator.state(), SessionState::Active);
        assert_eq!(provider.prepares.load(Ordering::SeqCst), 1, "pre-warmed");
        assert!(h.slot.is_installed());
        assert_eq!(h.coordinator.live_text().as_deref(), Some("hello world"));

        let text = h.coordinator.finish().await.unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(h.coordinator.state(), SessionState::Idle);
        assert!(!h.slot.is_installed());
        assert_eq!(h.sink.delivered.lock().unwrap().as_slice(), ["hello world"]);

        let records = h.store.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "hello world");
        assert_eq!(records[0].duration_secs, 0.0);
        assert_eq!(h.notifier.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_begin_while_active_is_rejected() {
        let h = harness(ScriptedSource::of(ScriptedProvider::happy("", Vec::new())));
        let config = AppConfig::default();

        h.coordinator.begin(v3(), &config).await.unwrap();
        assert!(matches!(
            h.coordinator.begin(v3(), &config).await,
            Err(SessionError::SessionActive)
        ));
        h.coordinator.finish().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_begins_admit_exactly_one_session() {
        let slot = Arc::new(ForwardingSlot::new());
        let coordinator = Arc::new(StreamingCoordinator::new(
            ScriptedSource::of(ScriptedProvider::happy("", Vec::new())),
            Arc::clone(&slot),
            Arc::new(MemorySink::default()),
            Arc::new(MemoryStore::default()),
            Arc::new(CountingNotifier::default()),
        ));
        let config = Arc::new(AppConfig::default());

        for _ in 0..200 {
            let barrier = Arc::new(tokio::sync::Barrier::new(2));
            let mut begins = Vec::new();
            for _ in 0..2 {
                let coordinator = Arc::clone(&coordinator);
                let config = Arc::clone(&config);
                let barrier = Arc::clone(&barrier);
                begins.push(tokio::spawn(async move {
                    barrier.wait().await;
                    coordinator.begin(v3(), &config).await
                }));
            }

            let mut admitted = 0;
            for begin in begins {
                match begin.await.unwrap() {
                    Ok(()) => admitted += 1,
                    Err(e) => assert!(matches!(e, SessionError::SessionActive)),
                }
            }
            assert_eq!(admitted, 1, "exactly one begin may win the session");
            assert!(slot.is_installed());
            coordinator.finish().await;
        }
    }

    #[tokio::test]
    async fn denied_authorization_notifies_once_and_recovers() {
        let h = harness(ScriptedSource::of(ScriptedProvider::unauthorized()));
        let config = AppConfig::default();

        let err = h.coordinator.begin(v3(), &config).await.unwrap_err();
        assert!(matches!(err, SessionError::NotAuthorized));
        assert_eq!(h.coordinator.state(), SessionState::Failed);
        assert_eq!(h.notifier.count.load(Ordering::SeqCst), 1);
        assert!(!h.slot.is_installed(), "no forwarding was ever installed");

        // A finish on the failed session is a clean no-op back to Idle.
        assert!(h.coordinator.finish().await.is_none());
        assert_eq!(h.coordinator.state(), SessionState::Idle);

        // And a new begin is accepted.
        assert!(matches!(
            h.coordinator.begin(v3(), &config).await,
            Err(SessionError::NotAuthorized)
        ));
        assert_eq!(h.notifier.count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn prepare_failure_discards_the_provider_and_notifies() {
        let provider = ScriptedProvider::failing_prepare(StartError::Engine("load failed".into()));
        let h = harness(ScriptedSource::of(provider));
        let config = AppConfig::default();

        let err = h.coordinator.begin(v3(), &config).await.unwrap_err();
        assert!(matches!(err, SessionError::Start(StartError::Engine(_))));
        assert_eq!(h.coordinator.state(), SessionState::Failed);
        assert!(!h.slot.is_installed(), "failed before install");
        assert_eq!(h.source.discards.load(Ordering::SeqCst), 1);
        assert_eq!(h.notifier.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_failure_discards_the_provider_and_notifies() {
        let provider = ScriptedProvider::failing_start(StartError::Engine("init failed".into()));
        let h = harness(ScriptedSource::of(provider));
        let config = AppConfig::default();

        let err = h.coordinator.begin(v3(), &config).await.unwrap_err();
        assert!(matches!(err, SessionError::Start(StartError::Engine(_))));
        assert_eq!(h.coordinator.state(), SessionState::Failed);
        assert!(!h.slot.is_installed());
        assert_eq!(h.source.discards.load(Ordering::SeqCst), 1);
        assert_eq!(h.notifier.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_engine_fails_silently() {
        let h = harness(ScriptedSource::unavailable());
        let config = AppConfig::default();

        let err = h.coordinator.begin(v3(), &config).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Start(StartError::EngineUnavailable(_))
        ));
        // No notification: the caller degrades to non-streaming capture.
        assert_eq!(h.notifier.count.load(Ordering::SeqCst), 0);
        assert_eq!(h.coordinator.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn disabled_preference_never_leaves_idle() {
        let h = harness(ScriptedSource::of(ScriptedProvider::happy("", Vec::new())));
        let mut config = AppConfig::default();
        let system = &SYSTEM_MODELS[0];
        config.streaming.set_enabled_for(system.id, false);

        let err = h.coordinator.begin(system, &config).await.unwrap_err();
        assert!(matches!(err, SessionError::StreamingDisabled));
        assert_eq!(h.coordinator.state(), SessionState::Idle);
        assert!(!h.slot.is_installed());
    }

    #[tokio::test]
    async fn finish_without_begin_is_a_no_op() {
        let h = harness(ScriptedSource::of(ScriptedProvider::happy("", Vec::new())));
        assert!(h.coordinator.finish().await.is_none());
        assert_eq!(h.coordinator.state(), SessionState::Idle);
        assert!(h.sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn double_finish_delivers_only_once() {
        let provider =
            ScriptedProvider::happy("once", vec![TranscriptionUpdate::confirmed("once")]);
        let h = harness(ScriptedSource::of(provider.clone()));
        let config = AppConfig::default();

        h.coordinator.begin(v3(), &config).await.unwrap();
        assert_eq!(h.coordinator.finish().await.as_deref(), Some("once"));
        assert!(h.coordinator.finish().await.is_none());

        assert_eq!(provider.stops.load(Ordering::SeqCst), 1);
        assert_eq!(h.sink.delivered.lock().unwrap().len(), 1);
        assert_eq!(h.store.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_transcript_is_not_delivered_or_persisted() {
        let provider = ScriptedProvider::happy("  ", Vec::new());
        let h = harness(ScriptedSource::of(provider));
        let config = AppConfig::default();

        h.coordinator.begin(v3(), &config).await.unwrap();
        let text = h.coordinator.finish().await.unwrap();
        assert!(text.trim().is_empty());
        assert!(h.sink.delivered.lock().unwrap().is_empty());
        assert!(h.store.records.lock().unwrap().is_empty());
    }
}
