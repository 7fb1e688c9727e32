//! voxstream — live streaming speech-to-text coordination.
//!
//! The crate turns microphone audio into text while the user is still
//! speaking. Interchangeable streaming backends (local Whisper-style models
//! and the OS speech service) sit behind one provider contract; a
//! coordinator runs the session lifecycle and merges confirmed and volatile
//! text into a live transcript.
//!
//! # Layers
//!
//! - [`audio`]  — cpal capture, channel mixdown and resampling to the
//!   16 kHz mono format every engine consumes.
//! - [`stt`]    — the model catalog and the plain whole-buffer
//!   transcription contract for batch models and imports.
//! - [`stream`] — streaming providers, the forwarding slot, the session
//!   coordinator and the confirmed/volatile merge policy.
//! - [`config`] — TOML settings and platform paths.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use voxstream::config::AppConfig;
//! use voxstream::stream::{
//!     ForwardingSlot, Notifier, ProviderRegistry, StreamingCoordinator, TranscriptRecord,
//!     TranscriptSink, TranscriptStore,
//! };
//! use voxstream::stt::{find_model_by_id, ModelPaths, TranscribeParams};
//!
//! struct Stdout;
//! impl TranscriptSink for Stdout {
//!     fn deliver(&self, text: &str) {
//!         println!("{text}");
//!     }
//! }
//! impl TranscriptStore for Stdout {
//!     fn record(&self, _record: &TranscriptRecord) {}
//! }
//! impl Notifier for Stdout {
//!     fn notify(&self, message: &str) {
//!         eprintln!("{message}");
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AppConfig::load()?;
//! let registry = Arc::new(ProviderRegistry::new(
//!     ModelPaths::new("/path/to/models"),
//!     TranscribeParams::default(),
//! ));
//! let slot = Arc::new(ForwardingSlot::new());
//! let out = Arc::new(Stdout);
//! let coordinator = StreamingCoordinator::new(
//!     registry,
//!     slot.clone(),
//!     out.clone(),
//!     out.clone(),
//!     out,
//! );
//!
//! let model = find_model_by_id(&config.stt.model).expect("unknown model id");
//! coordinator.begin(model, &config).await?;
//! // ... forward captured audio through `slot` ...
//! let transcript = coordinator.finish().await;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod stream;
pub mod stt;
