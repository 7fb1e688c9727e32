//! Per-session transcript accumulation.
//!
//! The accumulator is the single place where confirmed and volatile text
//! are merged into the display/fallback transcript. It is pure state: the
//! provider adapters and the coordinator share one instance per session
//! behind a mutex and apply updates in arrival order.

use crate::stream::TranscriptionUpdate;

// ---------------------------------------------------------------------------
// TranscriptAccumulator
// ---------------------------------------------------------------------------

/// Merges a monotonic confirmed text with a replaceable volatile tail.
#[derive(Debug, Default, Clone)]
pub struct TranscriptAccumulator {
    confirmed: String,
    volatile: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one provider update.
    ///
    /// A confirmed fragment appends to the confirmed text and clears the
    /// volatile tail (the hypothesis it superseded). A volatile fragment
    /// wholesale-replaces the current tail.
    pub fn apply(&mut self, update: &TranscriptionUpdate) {
        if update.is_confirmed {
            push_joined(&mut self.confirmed, &update.text);
            self.volatile.clear();
        } else {
            self.volatile = update.text.clone();
        }
    }

    /// The current display text: confirmed followed by volatile, joined
    /// with a single space when both are non-empty.
    pub fn snapshot(&self) -> String {
        let mut out = self.confirmed.clone();
        push_joined(&mut out, &self.volatile);
        out
    }

    /// Confirmed text only. Never shrinks over the life of a session.
    pub fn confirmed(&self) -> &str {
        &self.confirmed
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.volatile.is_empty()
    }

    /// Reset for a new session.
    pub fn clear(&mut self) {
        self.confirmed.clear();
        self.volatile.clear();
    }
}

fn push_joined(base: &mut String, fragment: &str) {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return;
    }
    if !base.is_empty() {
        base.push(' ');
    }
    base.push_str(fragment);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
