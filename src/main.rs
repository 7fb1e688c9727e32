//! Application entry point — voxstream live dictation.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the provider registry and the session coordinator.
//! 5. Start cpal audio capture, forwarding into the shared slot.
//! 6. Spawn the live-transcript printer on the tokio runtime.
//! 7. Read stdin on the main thread — Enter toggles a session, `q` quits.

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use voxstream::{
    audio::AudioCapture,
    config::{AppConfig, AppPaths},
    stream::{
        ForwardingSlot, Notifier, ProviderRegistry, SessionError, SessionState,
        StreamingCoordinator, TranscriptRecord, TranscriptSink, TranscriptStore,
    },
    stt::{
        find_model_by_id, streaming_model_for_revision, ModelDescriptor, ModelPaths,
        TranscribeParams,
    },
};

// ---------------------------------------------------------------------------
// Outcome implementations
// ---------------------------------------------------------------------------

/// Prints the finished transcript to stdout.
struct StdoutSink;

impl TranscriptSink for StdoutSink {
    fn deliver(&self, text: &str) {
        println!("\n{text}");
    }
}

/// History persistence is out of scope for the CLI; finished sessions are
/// logged instead.
struct LogStore;

impl TranscriptStore for LogStore {
    fn record(&self, record: &TranscriptRecord) {
        log::info!(
            "transcript recorded: {} chars via {}",
            record.text.len(),
            record.model_name
        );
    }
}

/// User-facing failure notices go to stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("! {message}");
    }
}

// ---------------------------------------------------------------------------
// Model selection
// ---------------------------------------------------------------------------

/// Resolve the configured model id, falling back to the streaming model for
/// the configured engine revision when the id is unknown.
fn select_model(config: &AppConfig) -> &'static ModelDescriptor {
    match find_model_by_id(&config.stt.model) {
        Some(model) => model,
        None => {
            let fallback = streaming_model_for_revision(config.stt.revision);
            log::warn!(
                "unknown model id {:?} in config; using {}",
                config.stt.model,
                fallback.id
            );
            fallback
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voxstream starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 workers — engine lifecycle + live printer)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4. Registry and coordinator
    let paths = AppPaths::new();
    let params = TranscribeParams {
        language: config.stt.language.clone(),
        ..TranscribeParams::default()
    };
    let registry = Arc::new(ProviderRegistry::new(
        ModelPaths::from_app_paths(&paths),
        params,
    ));
    let slot = Arc::new(ForwardingSlot::new());
    let coordinator = Arc::new(StreamingCoordinator::new(
        registry,
        Arc::clone(&slot),
        Arc::new(StdoutSink),
        Arc::new(LogStore),
        Arc::new(StderrNotifier),
    ));

    let model = select_model(&config);
    log::info!("using model {} ({})", model.id, model.display_name);

    // 5. Audio capture — forwards 16 kHz mono buffers through the slot.
    //    The handle keeps the cpal stream alive for the process lifetime.
    let _capture_handle = match AudioCapture::new() {
        Ok(capture) => match capture.start_forwarding(Arc::clone(&slot)) {
            Ok(handle) => {
                log::info!(
                    "audio capture started ({} Hz, {} ch)",
                    capture.sample_rate(),
                    capture.channels()
                );
                Some(handle)
            }
            Err(e) => {
                log::warn!("failed to start audio stream: {e}");
                None
            }
        },
        Err(e) => {
            log::warn!("audio capture unavailable: {e}");
            None
        }
    };

    // 6. Live transcript printer — repaints the current line while a
    //    session is active.
    {
        let coordinator = Arc::clone(&coordinator);
        rt.spawn(async move {
            let mut last = String::new();
            loop {
                tokio::time::sleep(Duration::from_millis(300)).await;
                if coordinator.state() != SessionState::Active {
                    continue;
                }
                if let Some(text) = coordinator.live_text() {
                    if text != last {
                        eprint!("\r> {text}");
                        last = text;
                    }
                }
            }
        });
    }

    // 7. stdin loop on the main thread
    println!("Press Enter to start/stop dictation, q to quit.");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }

        if coordinator.state() == SessionState::Active {
            if let Some(text) = rt.block_on(coordinator.finish()) {
                if text.trim().is_empty() {
                    println!("(no speech)");
                }
            }
            continue;
        }

        match rt.block_on(coordinator.begin(model, &config)) {
            Ok(()) => println!("listening..."),
            Err(SessionError::StreamingDisabled) => {
                eprintln!(
                    "Streaming is disabled for {}; enable it in settings or pick a streaming model.",
                    model.id
                );
            }
            Err(e) => log::warn!("session did not start: {e}"),
        }
    }

    if coordinator.state() == SessionState::Active {
        rt.block_on(coordinator.finish());
    }
    log::info!("voxstream shutting down");
    Ok(())
}
