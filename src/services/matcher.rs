//! Fuzzy badge name matching
//!
//! Scores a detected name against every catalog entry using a blend of three
//! string-similarity ratios (token-order, token-set, partial), with an
//! abbreviation fast path and optional category boosting. The catalog is
//! small (hundreds of entries), so a full scan per detection is fine.

use std::collections::BTreeSet;

use crate::config::MatcherConfig;
use crate::models::{BadgeMatch, CatalogSnapshot};
use crate::services::abbreviations::AbbreviationIndex;
use crate::services::normalizer::normalize;

/// Typeahead suggestion
#[derive(Debug, Clone, serde::Serialize)]
pub struct Suggestion {
    pub badge_id: String,
    pub name: String,
    pub category: String,
    pub score: f64,
}

/// Matches detected badge names against a catalog snapshot
pub struct BadgeMatcher {
    catalog: CatalogSnapshot,
    /// Normalized catalog names, parallel to `catalog.entries()`
    normalized_names: Vec<String>,
    abbreviations: AbbreviationIndex,
    config: MatcherConfig,
}

impl BadgeMatcher {
    pub fn new(catalog: CatalogSnapshot, config: MatcherConfig) -> Self {
        let normalized_names = catalog
            .entries()
            .iter()
            .map(|e| normalize(&e.name))
            .collect();
        let abbreviations = AbbreviationIndex::build(catalog.entries());

        tracing::debug!(
            badges = catalog.len(),
            abbreviations = abbreviations.len(),
            "Initialized badge matcher"
        );

        Self {
            catalog,
            normalized_names,
            abbreviations,
            config,
        }
    }

    /// Match one detected badge name against the catalog.
    ///
    /// Strategy: exact abbreviation lookup first, then blended fuzzy scoring
    /// over every entry, category boost if a hint is given, threshold check,
    /// and a combined confidence weighted toward textual match quality.
    pub fn match_name(
        &self,
        detected_name: &str,
        vision_confidence: f64,
        category_hint: Option<&str>,
    ) -> BadgeMatch {
        // Abbreviation fast path: exact shorthand hit bypasses fuzzy scoring
        if let Some(badge_id) = self.abbreviations.lookup(detected_name) {
            if let Some(entry) = self.catalog.get(badge_id) {
                tracing::debug!(
                    detected = %detected_name,
                    badge_id = %badge_id,
                    "Abbreviation match"
                );
                return BadgeMatch {
                    badge_id: entry.badge_id.clone(),
                    matched_name: entry.name.clone(),
                    detected_name: detected_name.to_string(),
                    match_score: 100.0,
                    confidence_score: (vision_confidence
                        * self.config.abbreviation_confidence_boost)
                        .min(1.0),
                    matched: true,
                    category: Some(entry.category.clone()),
                };
            }
        }

        let normalized_detected = normalize(detected_name);

        let mut best_index: Option<usize> = None;
        let mut best_score = 0.0_f64;

        for (idx, normalized_name) in self.normalized_names.iter().enumerate() {
            let token_sort = token_sort_ratio(&normalized_detected, normalized_name);
            let token_set = token_set_ratio(&normalized_detected, normalized_name);
            let partial = partial_ratio(&normalized_detected, normalized_name);

            let mut score = token_sort * self.config.token_sort_weight
                + token_set * self.config.token_set_weight
                + partial * self.config.partial_weight;

            if let Some(hint) = category_hint {
                let category = &self.catalog.entries()[idx].category;
                if category.to_lowercase().contains(&hint.to_lowercase()) {
                    score += self.config.category_boost;
                }
            }

            // Strictly-greater keeps the first entry on exact ties
            if score > best_score {
                best_score = score;
                best_index = Some(idx);
            }
        }

        let matched = best_score >= self.config.min_match_score;
        let confidence_score = vision_confidence * self.config.vision_confidence_weight
            + (best_score / 100.0) * self.config.match_score_weight;

        match best_index {
            Some(idx) if matched => {
                let entry = &self.catalog.entries()[idx];
                tracing::debug!(
                    detected = %detected_name,
                    matched_name = %entry.name,
                    score = best_score,
                    "Fuzzy match"
                );
                BadgeMatch {
                    badge_id: entry.badge_id.clone(),
                    matched_name: entry.name.clone(),
                    detected_name: detected_name.to_string(),
                    match_score: best_score,
                    confidence_score,
                    matched: true,
                    category: Some(entry.category.clone()),
                }
            }
            _ => {
                tracing::debug!(
                    detected = %detected_name,
                    best_score,
                    threshold = self.config.min_match_score,
                    "No match above threshold"
                );
                BadgeMatch {
                    badge_id: String::new(),
                    matched_name: String::new(),
                    detected_name: detected_name.to_string(),
                    match_score: best_score,
                    confidence_score,
                    matched: false,
                    category: None,
                }
            }
        }
    }

    /// Match a batch of (name, confidence) pairs independently, preserving order.
    pub fn match_batch(
        &self,
        detections: &[(String, f64)],
        category_hint: Option<&str>,
    ) -> Vec<BadgeMatch> {
        detections
            .iter()
            .map(|(name, confidence)| self.match_name(name, *confidence, category_hint))
            .collect()
    }

    /// Rank catalog entries against a partial input for typeahead.
    pub fn suggestions(&self, partial_name: &str, limit: usize) -> Vec<Suggestion> {
        let normalized_partial = normalize(partial_name);

        let mut ranked: Vec<Suggestion> = self
            .catalog
            .entries()
            .iter()
            .zip(self.normalized_names.iter())
            .map(|(entry, normalized)| Suggestion {
                badge_id: entry.badge_id.clone(),
                name: entry.name.clone(),
                category: entry.category.clone(),
                score: token_sort_ratio(&normalized_partial, normalized),
            })
            .collect();

        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(limit);
        ranked
    }
}

/// Levenshtein-based similarity ratio on a 0-100 scale
fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Ratio after sorting whitespace tokens, so word order doesn't matter
fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Ratio over token sets: duplicate- and order-insensitive.
///
/// Compares the sorted token intersection against each side's full sorted
/// token set and takes the best pairwise ratio, so a detected name that is a
/// word-subset of the catalog name still scores high.
fn token_set_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();

    let intersection: Vec<&str> = set_a.intersection(&set_b).copied().collect();
    let only_a: Vec<&str> = set_a.difference(&set_b).copied().collect();
    let only_b: Vec<&str> = set_b.difference(&set_a).copied().collect();

    let base = intersection.join(" ");
    let combined_a = join_nonempty(&base, &only_a.join(" "));
    let combined_b = join_nonempty(&base, &only_b.join(" "));

    ratio(&base, &combined_a)
        .max(ratio(&base, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

fn join_nonempty(left: &str, right: &str) -> String {
    match (left.is_empty(), right.is_empty()) {
        (true, _) => right.to_string(),
        (_, true) => left.to_string(),
        _ => format!("{} {}", left, right),
    }
}

/// Best ratio of the shorter string against every same-length window of the
/// longer one; saturates when one name is a prefix/substring of the other.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let chars_a: Vec<char> = a.chars().collect();
    let chars_b: Vec<char> = b.chars().collect();

    let (shorter, longer) = if chars_a.len() <= chars_b.len() {
        (&chars_a, &chars_b)
    } else {
        (&chars_b, &chars_a)
    };

    if shorter.is_empty() {
        return if longer.is_empty() { 100.0 } else { 0.0 };
    }
    if shorter.len() == longer.len() {
        return ratio(a, b);
    }

    let short_str: String = shorter.iter().collect();
    let mut best = 0.0_f64;
    for start in 0..=(longer.len() - shorter.len()) {
        let window: String = longer[start..start + shorter.len()].iter().collect();
        best = best.max(ratio(&short_str, &window));
        if best >= 100.0 {
            break;
        }
    }
    best
}
