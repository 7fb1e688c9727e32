//! STT module — model catalog and the plain (whole-buffer) transcription
//! contract.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 SttEngine (trait)                    │
//! │                                                      │
//! │   ┌──────────────┐    ┌──────────────┐               │
//! │   │  ModelPaths  │    │ WhisperEngine│  batch models │
//! │   │ - resolve    │───▶│ - ctx        │               │
//! │   │ - exists?    │    │ - params     │               │
//! │   └──────────────┘    └──────────────┘               │
//! │                                                      │
//! │   StreamingBatchFallback (crate::stream) covers the  │
//! │   streaming-only models on the import path.          │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The streaming layer lives in [`crate::stream`]; this module supplies the
//! model descriptors it keys on and the non-streaming engine it falls back
//! to.

pub mod engine;
pub mod model;
pub mod transcribe;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{SttEngine, SttError, WhisperEngine};
pub use model::{
    find_model_by_id, streaming_model_for_revision, EngineRevision, ModelDescriptor, ModelPaths,
    ProviderKind, StreamingCapability, BATCH_MODELS, STREAMING_MODELS, SYSTEM_MODELS,
};
pub use transcribe::{SamplingStrategy, TranscribeParams, TranscriptionResult};
