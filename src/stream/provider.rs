//! The streaming provider contract and its update/listener types.
//!
//! # Overview
//!
//! [`StreamingProvider`] is the uniform interface over every streaming
//! engine adapter. It is object-safe and `Send + Sync` so the registry can
//! hand out `Arc<dyn StreamingProvider>` instances that are shared between
//! the coordination context (lifecycle calls) and the audio producer thread
//! (`append_buffer`).
//!
//! # Threading contract
//!
//! - `request_authorization`, `start_streaming` and `stop_streaming` may
//!   suspend (model loading, engine finalize) and must only be called from
//!   the coordination context — never from the audio thread.
//! - `append_buffer` is the hot path: it runs on the audio producer thread
//!   and must never block on anything slower than a short flag-and-reference
//!   read. Buffers that arrive while the provider is inactive are silently
//!   dropped; that is the expected outcome of a shutdown race, not an error.
//! - Listener callbacks arrive on an engine-internal thread. Ordering is
//!   guaranteed only between successive updates from the same provider
//!   instance, not relative to buffer submission.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// TranscriptionUpdate
// ---------------------------------------------------------------------------

/// A text fragment emitted by a streaming engine.
///
/// Confirmed fragments are monotonic: once emitted they are never retracted
/// or altered by a later update. A volatile fragment wholesale-replaces the
/// previous volatile fragment until a confirmation arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionUpdate {
    /// The fragment text. For confirmed updates this is the newly confirmed
    /// portion only; for volatile updates it is the entire current
    /// hypothesis beyond the confirmed text.
    pub text: String,
    /// `true` when the fragment is final and will never change.
    pub is_confirmed: bool,
}

impl TranscriptionUpdate {
    /// A confirmed (final, never-retracted) fragment.
    pub fn confirmed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_confirmed: true,
        }
    }

    /// A volatile hypothesis that replaces the previous one.
    pub fn volatile(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_confirmed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// UpdateListener
// ---------------------------------------------------------------------------

/// Observer for partial/final updates from a provider.
///
/// Implementations must be safe to invoke from a thread other than the one
/// that registered them, and must not assume any ordering relative to
/// `append_buffer` calls.
pub trait UpdateListener: Send + Sync {
    /// A new update from the engine. See [`TranscriptionUpdate`] for the
    /// confirmed/volatile semantics.
    fn on_update(&self, update: TranscriptionUpdate);

    /// A non-benign engine failure occurred mid-stream. Benign conditions
    /// (cancellation on stop, no speech detected) are swallowed by the
    /// adapter and never reach this method.
    fn on_error(&self, _message: &str) {}
}

// ---------------------------------------------------------------------------
// StartError
// ---------------------------------------------------------------------------

/// Errors from establishing a streaming run.
///
/// Engine-specific failures are translated into this taxonomy at the
/// provider boundary; callers never inspect engine internals.
#[derive(Debug, Clone, Error)]
pub enum StartError {
    /// Permission or consent is missing. Recoverable by re-requesting;
    /// surfaced to the user with a path to grant it.
    #[error("speech recognition is not authorized")]
    NotAuthorized,

    /// The requested locale or model has no available backend. Recoverable
    /// by falling back to non-streaming transcription for this session.
    #[error("no streaming backend available: {0}")]
    EngineUnavailable(String),

    /// `start_streaming` was called while a run is already active on this
    /// provider instance. Both adapters treat this as a hard error rather
    /// than an idempotent no-op.
    #[error("a streaming run is already active on this provider")]
    AlreadyActive,

    /// The engine failed to initialise. The session aborts and the caller
    /// falls back to the non-streaming path.
    #[error("streaming engine failed to start: {0}")]
    Engine(String),
}

// ---------------------------------------------------------------------------
// StreamingProvider trait
// ---------------------------------------------------------------------------

/// Uniform contract implemented by every streaming engine adapter.
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    /// Check (and, where the engine supports it, request) whatever
    /// precondition the engine needs: a permission grant for OS engines, a
    /// downloaded weights file for local models. Safe to call repeatedly;
    /// any user-visible prompt is triggered at most once.
    async fn request_authorization(&self) -> bool;

    /// Register the listener that receives partial/final updates for the
    /// next run. Replaces any previously registered listener.
    fn set_listener(&self, listener: Arc<dyn UpdateListener>);

    /// Warm any heavyweight engine state ahead of `start_streaming`, so
    /// repeated sessions skip the load cost. Idempotent; adapters with
    /// nothing to warm keep the default no-op.
    async fn prepare(&self) -> Result<(), StartError> {
        Ok(())
    }

    /// Fully establish internal recognition state before returning, so no
    /// buffer can reach a half-initialised engine.
    ///
    /// `locale` is a short language code (e.g. `"en"`); adapters expand it
    /// to whatever form their engine requires.
    async fn start_streaming(&self, locale: &str) -> Result<(), StartError>;

    /// Hand one buffer of 16 kHz mono samples to the engine.
    ///
    /// Never blocks: one short lock to read the active-flag/engine-reference
    /// pair as a unit, then a non-blocking hand-off into the engine's own
    /// worker. Silently drops the buffer when no run is active.
    fn append_buffer(&self, samples: &[f32]);

    /// Quiesce the engine, wait for finalize, and return the authoritative
    /// final text.
    ///
    /// Never fails: if the engine's finalize step errors, the provider
    /// returns its best accumulated text and resets/discards the underlying
    /// engine instance rather than leaving it indeterminate. Safe to call
    /// when `start_streaming` never completed (returns whatever text was
    /// accumulated, usually empty); calling it twice is a no-op.
    async fn stop_streaming(&self) -> String;
}

impl std::fmt::Debug for dyn StreamingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn StreamingProvider")
    }
}

// Compile-time assertion: Arc<dyn StreamingProvider> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Arc<dyn StreamingProvider>) {}
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
