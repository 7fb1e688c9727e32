//! Live streaming transcription: providers, session lifecycle and text
//! merging.
//!
//! # Architecture
//!
//! ```text
//!  audio thread                 coordination context        engine thread
//!  ────────────                 ────────────────────        ─────────────
//!  AudioCapture ──► ForwardingSlot ◄── StreamingCoordinator
//!                        │                    │
//!                        ▼                    ▼
//!                   append_buffer      ProviderRegistry
//!                        │                    │
//!                        ▼                    ▼
//!                   StreamingProvider (whisper / native) ──► UpdateListener
//!                                                                │
//!                                                                ▼
//!                                                      TranscriptAccumulator
//! ```
//!
//! The coordinator drives one session at a time: it resolves a provider
//! through the registry, installs it into the [`ForwardingSlot`], starts it,
//! and on finish quiesces the engine before tearing the slot down. Partial
//! and final updates merge in the [`TranscriptAccumulator`] following the
//! confirmed/volatile policy.

mod agreement;
mod coordinator;
mod fallback;
mod forward;
pub mod native;
mod provider;
mod registry;
mod session;
mod whisper_stream;

pub use agreement::LocalAgreement;
pub use coordinator::{
    should_stream, Notifier, SessionError, SessionState, StreamingCoordinator, TranscriptRecord,
    TranscriptSink, TranscriptStore,
};
pub use fallback::StreamingBatchFallback;
pub use forward::ForwardingSlot;
pub use provider::{StartError, StreamingProvider, TranscriptionUpdate, UpdateListener};
pub use registry::{ProviderRegistry, ProviderSource};
pub use session::TranscriptAccumulator;
pub use whisper_stream::WhisperStreamProvider;
