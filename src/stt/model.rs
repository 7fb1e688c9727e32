//! Model catalog, descriptors and path resolution.
//!
//! Three const arrays are provided:
//! - [`STREAMING_MODELS`] — local streaming ASR models (two revisions)
//! - [`BATCH_MODELS`]     — local whole-file Whisper models
//! - [`SYSTEM_MODELS`]    — the OS speech-service pseudo-model (no file)
//!
//! [`ModelDescriptor`] is immutable catalog metadata; its
//! [`StreamingCapability`] tag drives the coordinator's streaming-use
//! decision and its [`ProviderKind`] keys the provider registry.
//!
//! [`ModelPaths`] resolves the on-disk location of a model given an
//! [`crate::config::AppPaths`] instance.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::AppPaths;

// ---------------------------------------------------------------------------
// StreamingCapability
// ---------------------------------------------------------------------------

/// Whether a model may, must, or must not be engaged in streaming mode.
///
/// The decision is made once per recording session:
///
/// | Variant            | Live capture behaviour                         |
/// |--------------------|------------------------------------------------|
/// | BatchOnly          | Never stream — record, then transcribe.        |
/// | StreamingOnly      | Always stream.                                 |
/// | BatchAndStreaming  | Stream unless the per-model preference says no.|
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamingCapability {
    /// Whole-file transcription only.
    BatchOnly,
    /// The model has no batch mode; live capture must stream. Pre-recorded
    /// files go through the batch-fallback wrapper.
    StreamingOnly,
    /// Both modes supported; a per-model persisted preference (default:
    /// enabled) picks between them.
    BatchAndStreaming,
}

impl StreamingCapability {
    /// Returns `true` when streaming is at least possible for this model.
    pub fn supports_streaming(&self) -> bool {
        !matches!(self, StreamingCapability::BatchOnly)
    }
}

// ---------------------------------------------------------------------------
// ProviderKind
// ---------------------------------------------------------------------------

/// Which engine adapter serves a model. Keys the provider registry cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// The general-purpose OS speech-recognition service.
    NativeSpeech,
    /// A local streaming ASR model with confirmed/volatile token semantics.
    NeuralStreaming,
    /// A remote transcription API. Present in the descriptor space, but no
    /// streaming adapter exists for it — lookups answer "unavailable" and
    /// the caller falls back to the non-streaming path.
    Cloud,
}

// ---------------------------------------------------------------------------
// EngineRevision
// ---------------------------------------------------------------------------

/// Revision of the local streaming ASR engine. Chosen before preparation
/// and fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngineRevision {
    /// First supported revision.
    V2,
    /// Current revision (recommended).
    #[default]
    V3,
}

// ---------------------------------------------------------------------------
// ModelDescriptor
// ---------------------------------------------------------------------------

/// Static metadata for a single recognition model. Immutable once
/// constructed — catalog entries are `'static`.
#[derive(Debug)]
pub struct ModelDescriptor {
    /// Unique identifier used in config and persistence (e.g. `"stream-base-v3"`).
    pub id: &'static str,
    /// Human-readable display name shown at the UI boundary.
    pub display_name: &'static str,
    /// File name under the models directory, or `None` for engines that
    /// ship with the OS and have no downloadable weights.
    pub file_name: Option<&'static str>,
    /// Which adapter serves this model.
    pub provider: ProviderKind,
    /// Streaming classification — see [`StreamingCapability`].
    pub capability: StreamingCapability,
    /// Engine revision for neural streaming models; `None` otherwise.
    pub revision: Option<EngineRevision>,
    /// ISO-639-1 language code this model is optimised for, or
    /// `"multilingual"`.
    pub language: &'static str,
}

// ---------------------------------------------------------------------------
// Streaming models (local streaming ASR, two revisions)
// ---------------------------------------------------------------------------

/// Local streaming ASR models. Streaming-only: they have no native
/// whole-file mode, so imports route through the batch-fallback wrapper.
pub const STREAMING_MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "stream-base-v2",
        display_name: "Streaming Base v2",
        file_name: Some("ggml-stream-base-v2.bin"),
        provider: ProviderKind::NeuralStreaming,
        capability: StreamingCapability::StreamingOnly,
        revision: Some(EngineRevision::V2),
        language: "multilingual",
    },
    ModelDescriptor {
        id: "stream-base-v3",
        display_name: "Streaming Base v3 [Recommended]",
        file_name: Some("ggml-stream-base-v3.bin"),
        provider: ProviderKind::NeuralStreaming,
        capability: StreamingCapability::StreamingOnly,
        revision: Some(EngineRevision::V3),
        language: "multilingual",
    },
];

// ---------------------------------------------------------------------------
// Batch models (whole-file Whisper)
// ---------------------------------------------------------------------------

/// Local whole-file Whisper models. Batch-only: the coordinator never
/// engages streaming for these.
pub const BATCH_MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "whisper-small",
        display_name: "Whisper Small (Multilingual)",
        file_name: Some("ggml-whisper-small.bin"),
        provider: ProviderKind::NeuralStreaming,
        capability: StreamingCapability::BatchOnly,
        revision: None,
        language: "multilingual",
    },
    ModelDescriptor {
        id: "whisper-medium",
        display_name: "Whisper Medium (Multilingual)",
        file_name: Some("ggml-whisper-medium.bin"),
        provider: ProviderKind::NeuralStreaming,
        capability: StreamingCapability::BatchOnly,
        revision: None,
        language: "multilingual",
    },
];

// ---------------------------------------------------------------------------
// System models (OS speech service)
// ---------------------------------------------------------------------------

/// The OS speech-recognition service, exposed as a pseudo-model. It needs
/// no downloaded file; authorization is a permission prompt instead.
pub const SYSTEM_MODELS: &[ModelDescriptor] = &[ModelDescriptor {
    id: "system-speech",
    display_name: "System Speech Recognition",
    file_name: None,
    provider: ProviderKind::NativeSpeech,
    capability: StreamingCapability::BatchAndStreaming,
    revision: None,
    language: "multilingual",
}];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Find a [`ModelDescriptor`] by its `id` string, searching all catalogs.
pub fn find_model_by_id(id: &str) -> Option<&'static ModelDescriptor> {
    STREAMING_MODELS
        .iter()
        .chain(BATCH_MODELS.iter())
        .chain(SYSTEM_MODELS.iter())
        .find(|m| m.id == id)
}

/// The streaming model descriptor for a given engine revision.
pub fn streaming_model_for_revision(revision: EngineRevision) -> &'static ModelDescriptor {
    STREAMING_MODELS
        .iter()
        .find(|m| m.revision == Some(revision))
        .expect("every EngineRevision has a catalog entry")
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files from [`AppPaths`].
///
/// ```rust,no_run
/// use voxstream::config::AppPaths;
/// use voxstream::stt::{ModelPaths, STREAMING_MODELS};
///
/// let paths = ModelPaths::from_app_paths(&AppPaths::new());
/// let available: Vec<_> = STREAMING_MODELS.iter()
///     .filter(|m| paths.is_available(m))
///     .collect();
/// ```
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory that contains (or will contain) GGML `.bin` files.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    /// Build a [`ModelPaths`] from the application's [`AppPaths`].
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self {
            models_dir: app_paths.models_dir.clone(),
        }
    }

    /// Construct directly from a models directory path (useful in tests).
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the weights file for the given model, if it has one.
    pub fn model_path(&self, model: &ModelDescriptor) -> Option<PathBuf> {
        model.file_name.map(|f| self.models_dir.join(f))
    }

    /// Returns `true` if the model can be used: its weights file exists on
    /// disk, or it has no file requirement at all (OS engines).
    pub fn is_available(&self, model: &ModelDescriptor) -> bool {
        match self.model_path(model) {
            Some(p) => p.exists(),
            None => true,
        }
    }

    /// All catalog models currently usable on this machine.
    pub fn list_local_models(&self) -> Vec<&'static ModelDescriptor> {
        STREAMING_MODELS
            .iter()
            .chain(BATCH_MODELS.iter())
            .chain(SYSTEM_MODELS.iter())
            .filter(|m| self.is_available(m))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
