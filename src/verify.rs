use strsim::normalized_levenshtein;
use xxhash_rust::xxh3::xxh3_64;

/// Verification strategy for edit safety.
///
/// Checked against the exact text of the located span, strictly before any
/// mutation. `Exact` compares character-for-character, including whitespace
/// and line endings. `Hash` compares an xxh3 digest, which keeps request
/// payloads small when the guarded span is large.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Exact text match required
    Exact(String),
    /// xxh3 hash of expected text
    Hash(u64),
}

impl Verification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Verification::Exact(expected) => text == expected,
            Verification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            Verification::Hash(xxh3_64(text.as_bytes()))
        } else {
            Verification::Exact(text.to_string())
        }
    }

    /// Human-readable statement of what was expected.
    pub fn describe(&self) -> String {
        match self {
            Verification::Exact(expected) => expected.clone(),
            Verification::Hash(hash) => format!("<text with xxh3 hash {hash:#018x}>"),
        }
    }
}

/// Details of a failed verification: what was expected, what was actually
/// at the span, and how close the two were.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationFailure {
    pub expected: String,
    pub actual: String,
    /// Normalized Levenshtein similarity in `[0, 1]`, as a hint for callers
    /// diagnosing near-miss expectations. `1.0` never occurs on a failure
    /// for exact verification; hash verification reports `0.0`.
    pub similarity: f64,
}

/// Check the text actually found at a located span against an expectation.
///
/// Returns `Ok` when the verification passes. On mismatch, both sides are
/// surfaced so the caller can show exactly what diverged; the document must
/// be left untouched by the caller.
pub fn verify(actual: &str, verification: &Verification) -> Result<(), VerificationFailure> {
    if verification.matches(actual) {
        return Ok(());
    }

    let similarity = match verification {
        Verification::Exact(expected) => normalized_levenshtein(expected, actual),
        Verification::Hash(_) => 0.0,
    };

    Err(VerificationFailure {
        expected: verification.describe(),
        actual: actual.to_string(),
        similarity,
    })
}
