//! Transcription parameter and result types for the plain (whole-buffer)
//! contract.
//!
//! [`TranscribeParams`] carries all settings that control a single Whisper
//! inference run. [`TranscriptionResult`] is returned by
//! [`WhisperEngine::transcribe_full`].
//!
//! [`WhisperEngine::transcribe_full`]: crate::stt::WhisperEngine::transcribe_full

// ---------------------------------------------------------------------------
// SamplingStrategy
// ---------------------------------------------------------------------------

/// Mirrors `whisper_rs::SamplingStrategy` but is owned and `Clone`.
///
/// Greedy single-pass decoding is the default: the streaming adapters
/// re-decode the same window repeatedly, so per-pass latency matters far
/// more than the marginal accuracy of beam search.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStrategy {
    /// Greedy (single-pass) decoding.
    Greedy {
        /// Number of candidate tokens evaluated per step. 1 is fastest.
        best_of: i32,
    },
    /// Beam-search decoding — higher accuracy, 2-4× the latency. Only
    /// sensible on the import (whole-file) path.
    BeamSearch {
        /// Number of beams to maintain in parallel.
        beam_size: i32,
        /// Beam-search patience factor (≥1.0 = standard beam search).
        patience: f32,
    },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

// ---------------------------------------------------------------------------
// TranscribeParams
// ---------------------------------------------------------------------------

/// All parameters for a single Whisper inference pass.
///
/// ```
/// use voxstream::stt::TranscribeParams;
///
/// let params = TranscribeParams {
///     language: "de".into(),
///     ..TranscribeParams::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    /// ISO-639-1 language code (e.g. `"en"`, `"de"`), or `"auto"` to let
    /// the model detect the language.
    pub language: String,

    /// Decoding strategy — see [`SamplingStrategy`].
    pub strategy: SamplingStrategy,

    /// Number of CPU threads handed to the engine. Defaults to
    /// [`optimal_threads()`], capped at 8.
    pub n_threads: i32,

    /// Suppress the engine's progress output to stderr.
    pub suppress_progress: bool,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            language: "en".into(),
            strategy: SamplingStrategy::default(),
            n_threads: optimal_threads(),
            suppress_progress: true,
        }
    }
}

/// Returns the number of CPU threads to use for inference, capped at 8 to
/// avoid diminishing returns.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// TranscriptionResult
// ---------------------------------------------------------------------------

/// The output of a successful whole-buffer transcription.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Full transcript text, trimmed of leading/trailing whitespace.
    pub text: String,

    /// Wall-clock time the inference took, in milliseconds.
    pub duration_ms: u128,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_use_greedy_english() {
        let p = TranscribeParams::default();
        assert_eq!(p.language, "en");
        assert_eq!(p.strategy, SamplingStrategy::Greedy { best_of: 1 });
        assert!(p.suppress_progress);
    }

    #[test]
    fn optimal_threads_is_positive_and_at_most_8() {
        let t = optimal_threads();
        assert!((1..=8).contains(&t));
    }
}
