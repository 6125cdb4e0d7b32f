//! 2-tier intent matcher.
//!
//! The matcher resolves free-form user text to a registered intent:
//!
//! | Tier | Technique | Result |
//! |------|-----------|--------|
//! | 1 | Whole-string exact hit via [`aho_corasick`] over normalized samples | score 1.0 |
//! | 2 | Normalized Levenshtein similarity over every (intent, sample) pair | best score |
//!
//! A match is returned only when the best score clears the threshold
//! (inclusive). Ties at the maximum score go to the earliest-registered
//! intent — deterministic by construction, never an artifact of map
//! iteration order.
//!
//! Intents are registered through [`MatcherBuilder`]; the built
//! [`IntentMatcher`] is immutable and cheap to share, so a future cache
//! keyed by normalized input can wrap it without interior coordination.

use aho_corasick::AhoCorasick;

/// Inclusive similarity threshold below which no intent is matched.
pub const DEFAULT_THRESHOLD: f64 = 0.80;

/// The outcome of matching one input against the registered intents.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The input resolved to an intent.
    Matched {
        /// The registered intent name.
        intent: String,
        /// The sample phrase that produced the best score.
        sample: String,
        /// Similarity score in `[0.0, 1.0]`.
        score: f64,
    },
    /// No intent scored at or above the threshold.
    NoMatch,
}

/// One registered (intent, sample) pair, normalized.
struct SampleEntry {
    /// Index of the owning intent in registration order.
    intent_index: usize,
    /// Normalized sample text.
    sample: String,
}

/// Accumulates intents and samples, then compiles an [`IntentMatcher`].
#[derive(Default)]
pub struct MatcherBuilder {
    intents: Vec<String>,
    entries: Vec<SampleEntry>,
}

impl MatcherBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an intent and its sample phrases.
    ///
    /// The intent name itself is always matchable in addition to the
    /// samples. Registration order is the tie-break order.
    pub fn register<S: AsRef<str>>(
        &mut self,
        intent: impl Into<String>,
        samples: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        let intent = intent.into();
        let intent_index = self.intents.len();

        let mut push = |text: &str| {
            let sample = normalize(text);
            if sample.is_empty() {
                return;
            }
            self.entries.push(SampleEntry {
                intent_index,
                sample,
            });
        };

        push(&intent);
        for sample in samples {
            push(sample.as_ref());
        }

        tracing::debug!(intent = %intent, "intent registered for matching");
        self.intents.push(intent);
        self
    }

    /// Compile the matcher with the given inclusive threshold.
    #[must_use]
    pub fn build(self, threshold: f64) -> IntentMatcher {
        let patterns: Vec<&str> = self.entries.iter().map(|e| e.sample.as_str()).collect();
        let automaton = if patterns.is_empty() {
            None
        } else {
            AhoCorasick::new(&patterns).ok()
        };

        IntentMatcher {
            threshold,
            intents: self.intents,
            entries: self.entries,
            automaton,
        }
    }
}

/// Immutable fuzzy matcher over a fixed set of intents.
pub struct IntentMatcher {
    threshold: f64,
    intents: Vec<String>,
    entries: Vec<SampleEntry>,
    /// Compiled automaton over all normalized samples.
    automaton: Option<AhoCorasick>,
}

impl IntentMatcher {
    /// Number of registered intents.
    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }

    /// Match free text against every registered sample.
    ///
    /// Cost is O(intents × samples) in the similarity tier; the exact tier
    /// is a single automaton pass.
    pub fn best_match(&self, text: &str) -> MatchOutcome {
        let needle = normalize(text);
        if needle.is_empty() || self.entries.is_empty() {
            return MatchOutcome::NoMatch;
        }

        // Tier 1: whole-string exact hit.
        if let Some(entry) = self.try_exact(&needle) {
            let intent = self.intents[entry.intent_index].clone();
            tracing::debug!(input = %needle, intent = %intent, "exact sample match");
            return MatchOutcome::Matched {
                intent,
                sample: entry.sample.clone(),
                score: 1.0,
            };
        }

        // Tier 2: best similarity over all samples. Strictly-greater keeps
        // the earliest-registered intent on ties.
        let mut best: Option<(&SampleEntry, f64)> = None;
        for entry in &self.entries {
            let score = similarity(&needle, &entry.sample);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((entry, score));
            }
        }

        match best {
            Some((entry, score)) if score >= self.threshold => {
                let intent = self.intents[entry.intent_index].clone();
                tracing::debug!(
                    input = %needle,
                    intent = %intent,
                    score,
                    "fuzzy sample match"
                );
                MatchOutcome::Matched {
                    intent,
                    sample: entry.sample.clone(),
                    score,
                }
            }
            Some((_, score)) => {
                tracing::debug!(input = %needle, best_score = score, "no intent matched");
                MatchOutcome::NoMatch
            }
            None => MatchOutcome::NoMatch,
        }
    }

    // -- Private helpers ----------------------------------------------------

    /// Find a sample equal to the whole normalized input.
    fn try_exact(&self, needle: &str) -> Option<&SampleEntry> {
        let ac = self.automaton.as_ref()?;
        for mat in ac.find_overlapping_iter(needle) {
            if mat.start() == 0 && mat.end() == needle.len() {
                return Some(&self.entries[mat.pattern().as_usize()]);
            }
        }
        None
    }
}

/// Normalize input for matching: trim, lowercase, collapse whitespace runs.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity in `[0.0, 1.0]`: 1 minus the Levenshtein distance normalized
/// by the longer string's character count.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Levenshtein distance between two strings, by character.
///
/// Two-row dynamic program; O(|a| × |b|) time, O(|b|) space.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, a_ch) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = usize::from(a_ch != b_ch);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
