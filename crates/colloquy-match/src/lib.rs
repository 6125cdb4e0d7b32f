//! Fuzzy intent matching for Colloquy.
//!
//! Free-form user text (typed or transcribed) is resolved to a catalog
//! intent by a 2-tier matcher: an exact phrase tier backed by an
//! aho-corasick automaton, and a normalized Levenshtein similarity tier
//! with an inclusive threshold (0.80 by default). See
//! [`matcher::IntentMatcher`].

pub mod matcher;

pub use matcher::{
    DEFAULT_THRESHOLD, IntentMatcher, MatchOutcome, MatcherBuilder, normalize, similarity,
};
