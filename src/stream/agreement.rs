//! Local-agreement confirmation policy for two-pass streaming decode.
//!
//! A token becomes confirmed only once two consecutive decoding passes agree
//! on it at the same position. Confirmed tokens are never retracted, even
//! when a later pass re-hears the audio differently; everything past the
//! confirmed prefix stays volatile until the next agreement or finalize.

// ---------------------------------------------------------------------------
// LocalAgreement
// ---------------------------------------------------------------------------

/// Tracks agreement between consecutive hypothesis passes over the same
/// growing audio window.
#[derive(Debug, Default)]
pub struct LocalAgreement {
    committed: Vec<String>,
    previous: Option<Vec<String>>,
}

impl LocalAgreement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the full token sequence of one decoding pass.
    ///
    /// Returns the tokens that became confirmed by this pass: the longest
    /// common prefix of this hypothesis and the previous one, beyond what
    /// was already confirmed. The first pass never confirms anything.
    pub fn observe(&mut self, hypothesis: &[String]) -> Vec<String> {
        let newly = match &self.previous {
            None => Vec::new(),
            Some(prev) => {
                let agreed = prev
                    .iter()
                    .zip(hypothesis.iter())
                    .take_while(|(a, b)| a == b)
                    .count();
                if agreed > self.committed.len() {
                    hypothesis[self.committed.len()..agreed].to_vec()
                } else {
                    Vec::new()
                }
            }
        };
        self.committed.extend(newly.iter().cloned());
        self.previous = Some(hypothesis.to_vec());
        newly
    }

    /// The volatile remainder of the latest hypothesis: everything beyond
    /// the confirmed prefix.
    pub fn pending(&self) -> Vec<String> {
        match &self.previous {
            Some(prev) if prev.len() > self.committed.len() => {
                prev[self.committed.len()..].to_vec()
            }
            _ => Vec::new(),
        }
    }

    /// Confirm the entire latest hypothesis. Used by the finalize pass,
    /// where the engine's last decode is authoritative. Returns the tokens
    /// promoted from volatile to confirmed.
    pub fn commit_pending(&mut self) -> Vec<String> {
        let newly = self.pending();
        self.committed.extend(newly.iter().cloned());
        newly
    }

    /// All confirmed tokens joined with single spaces.
    pub fn committed_text(&self) -> String {
        self.committed.join(" ")
    }

    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn first_pass_confirms_nothing() {
        let mut la = LocalAgreement::new();
        assert!(la.observe(&toks("hello world")).is_empty());
        assert_eq!(la.pending(), toks("hello world"));
        assert_eq!(la.committed_text(), "");
    }

    #[test]
    fn second_agreeing_pass_confirms_the_shared_prefix() {
        let mut la = LocalAgreement::new();
        la.observe(&toks("hello"));
        let newly = la.observe(&toks("hello world"));
        assert_eq!(newly, toks("hello"));
        assert_eq!(la.committed_text(), "hello");
        assert_eq!(la.pending(), toks("world"));
    }

    #[test]
    fn disagreeing_passes_confirm_nothing_new() {
        let mut la = LocalAgreement::new();
        la.observe(&toks("tell a joke"));
        la.observe(&toks("tell a joke"));
        assert_eq!(la.committed_text(), "tell a joke");

        // Re-hearing diverges inside the confirmed prefix; nothing is
        // retracted and nothing new commits.
        let newly = la.observe(&toks("tell the joke again"));
        assert!(newly.is_empty());
        assert_eq!(la.committed_text(), "tell a joke");
    }

    #[test]
    fn confirmed_prefix_only_grows() {
        let mut la = LocalAgreement::new();
        let passes = [
            "the",
            "the quick",
            "the quick brown",
            "the quick brown fox",
            "the quick brown fox jumps",
        ];
        let mut last_len = 0;
        for pass in passes {
            la.observe(&toks(pass));
            assert!(la.committed_len() >= last_len);
            last_len = la.committed_len();
        }
        assert_eq!(la.committed_text(), "the quick brown fox");
    }

    #[test]
    fn commit_pending_promotes_the_tail() {
        let mut la = LocalAgreement::new();
        la.observe(&toks("hello"));
        la.observe(&toks("hello world again"));
        assert_eq!(la.committed_text(), "hello");

        let newly = la.commit_pending();
        assert_eq!(newly, toks("world again"));
        assert_eq!(la.committed_text(), "hello world again");
        assert!(la.pending().is_empty());
    }

    #[test]
    fn shrinking_hypothesis_leaves_committed_intact() {
        let mut la = LocalAgreement::new();
        la.observe(&toks("one two three"));
        la.observe(&toks("one two three"));
        assert_eq!(la.committed_text(), "one two three");

        la.observe(&toks("one"));
        assert_eq!(la.committed_text(), "one two three");
        assert!(la.pending().is_empty());
    }

    #[test]
    fn empty_hypothesis_is_harmless() {
        let mut la = LocalAgreement::new();
        assert!(la.observe(&[]).is_empty());
        assert!(la.observe(&[]).is_empty());
        assert!(la.pending().is_empty());
        assert_eq!(la.committed_text(), "");
    }
}
