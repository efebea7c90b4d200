//! Badge name normalization
//!
//! Canonicalizes free-text badge names so that vision-model output and
//! catalog names become comparable: lowercase, expand known abbreviations,
//! strip punctuation, collapse whitespace.

/// Ordered replacement rules. Order matters: earlier rules can rewrite text
/// that later rules consume, so these are applied sequentially.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("oas", "outdoor adventure skills"),
    ("sia", "special interest area"),
    ("&", "and"),
    ("stage 1", "1"),
    ("stage 2", "2"),
    ("stage 3", "3"),
    ("stage 4", "4"),
    ("level 1", "1"),
    ("level 2", "2"),
];

/// Normalize a badge name for matching.
///
/// Pure and deterministic; `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(name: &str) -> String {
    let mut normalized = name.to_lowercase();

    for (old, new) in REPLACEMENTS {
        normalized = normalized.replace(old, new);
    }

    // Keep alphanumerics and whitespace only
    normalized.retain(|c| c.is_alphanumeric() || c.is_whitespace());

    // Collapse runs of whitespace and trim
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}
