//! Classification of inversion outcomes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Words ignored when looking for leaked tokens in protected output.
pub const STOP_WORDS: [&str; 7] = ["the", "a", "is", "of", "in", "on", "at"];

/// How many leading tokens of the original count toward a partial match.
const PARTIAL_PREFIX_TOKENS: usize = 3;

/// Which classification policy an attack uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackMode {
    /// Vectors are raw embeddings: grade how much of the text came back.
    Unprotected,
    /// Vectors are ciphertexts: report any non-stop-word token that leaked.
    Protected,
}

/// Outcome of one inversion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The normalized original text appears in the recovered text.
    Recovered,
    /// One of the first three words of the original is a word of the recovered text.
    Partial,
    /// Nothing of the original was found.
    Garbage,
    /// Ciphertext inversion shared no meaningful token with the original.
    Protected,
    /// Ciphertext inversion shared these tokens with the original.
    Leaked {
        /// Leaked tokens, sorted and deduplicated.
        tokens: Vec<String>,
    },
}

impl Verdict {
    /// Whether the verdict exposes any part of the original text.
    pub fn is_breach(&self) -> bool {
        matches!(self, Verdict::Recovered | Verdict::Partial | Verdict::Leaked { .. })
    }
}

/// Lowercase, trim, and strip punctuation from both ends of the whole string.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase().trim_matches(|c: char| c.is_ascii_punctuation()).trim().to_string()
}

/// Lowercase, drop all punctuation, and split on whitespace into a token set.
pub fn token_set(text: &str) -> BTreeSet<String> {
    let cleaned: String =
        text.to_lowercase().chars().filter(|c| !c.is_ascii_punctuation()).collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Classify a reconstruction of a raw embedding.
///
/// Texts that normalize to the same string are always [`Verdict::Recovered`],
/// including two texts that both normalize to nothing. An empty original
/// against non-empty output is [`Verdict::Garbage`]. A partial match needs one
/// of the first three original words as a whole word of the recovered text.
pub fn classify_unprotected(original: &str, recovered: &str) -> Verdict {
    let original = normalize(original);
    let recovered_norm = normalize(recovered);
    if original.is_empty() {
        return if recovered_norm.is_empty() { Verdict::Recovered } else { Verdict::Garbage };
    }
    if recovered_norm.contains(&original) {
        return Verdict::Recovered;
    }

    let recovered_words = token_set(recovered);
    let partial = original
        .split_whitespace()
        .take(PARTIAL_PREFIX_TOKENS)
        .flat_map(token_set)
        .any(|word| recovered_words.contains(&word));
    if partial { Verdict::Partial } else { Verdict::Garbage }
}

/// Classify a reconstruction of a ciphertext vector.
pub fn classify_protected(original: &str, recovered: &str) -> Verdict {
    let recovered = token_set(recovered);
    let tokens: Vec<String> = token_set(original)
        .intersection(&recovered)
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .cloned()
        .collect();
    if tokens.is_empty() { Verdict::Protected } else { Verdict::Leaked { tokens } }
}

/// Classify with the policy for `mode`.
pub fn classify(mode: AttackMode, original: &str, recovered: &str) -> Verdict {
    match mode {
        AttackMode::Unprotected => classify_unprotected(original, recovered),
        AttackMode::Protected => classify_protected(original, recovered),
    }
}
