//! Abbreviation fast path
//!
//! A precomputed exact-match table of known shorthand forms, built once per
//! catalog load. A hit here bypasses fuzzy scoring entirely.
//!
//! Keys are stored lowercased with all whitespace stripped, so "oas bushcraft"
//! and "oasbushcraft" resolve identically. When two catalog entries produce
//! the same key the later entry wins, and the collision is logged at build
//! time so operators can fix the catalog data.

use std::collections::HashMap;

use crate::models::CatalogEntry;

/// Exact-match index of shorthand keys to badge ids
#[derive(Debug, Clone, Default)]
pub struct AbbreviationIndex {
    keys: HashMap<String, String>,
}

impl AbbreviationIndex {
    /// Build the index from catalog entries, in iteration order.
    pub fn build(entries: &[CatalogEntry]) -> Self {
        let mut index = AbbreviationIndex::default();

        for entry in entries {
            let name = entry.name.as_str();

            // OAS badges: register "oas<discipline>" from the second word
            if name.contains("OAS") {
                let parts: Vec<&str> = name.split_whitespace().collect();
                if parts.len() >= 2 {
                    let discipline = parts[1].to_lowercase();
                    index.register(&format!("oas{}", discipline), &entry.badge_id);
                    index.register(&format!("oas {}", discipline), &entry.badge_id);
                }
            }

            // SIA badges: full lowercase name, and the name without "SIA"
            if name.contains("SIA") {
                index.register(&name.to_lowercase(), &entry.badge_id);
                let without_sia = name.replace("SIA", "");
                let without_sia = without_sia.trim().to_lowercase();
                if !without_sia.is_empty() {
                    index.register(&without_sia, &entry.badge_id);
                }
            }

            // Milestone badges: "milestone<n>" and "m<n>"
            if name.contains("Milestone") {
                if name.contains('1') {
                    index.register("milestone1", &entry.badge_id);
                    index.register("m1", &entry.badge_id);
                } else if name.contains('2') {
                    index.register("milestone2", &entry.badge_id);
                    index.register("m2", &entry.badge_id);
                } else if name.contains('3') {
                    index.register("milestone3", &entry.badge_id);
                    index.register("m3", &entry.badge_id);
                }
            }
        }

        tracing::debug!(keys = index.keys.len(), "Built abbreviation index");
        index
    }

    fn register(&mut self, key: &str, badge_id: &str) {
        let stripped = strip_key(key);
        if stripped.is_empty() {
            return;
        }
        if let Some(previous) = self.keys.get(&stripped) {
            if previous != badge_id {
                tracing::warn!(
                    key = %stripped,
                    previous = %previous,
                    replacement = %badge_id,
                    "Abbreviation key collision, later catalog entry wins"
                );
            }
        }
        self.keys.insert(stripped, badge_id.to_string());
    }

    /// Exact lookup of a detected name against registered shorthand keys.
    pub fn lookup(&self, detected_name: &str) -> Option<&str> {
        let key = strip_key(detected_name);
        self.keys.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Lowercase and drop all whitespace
fn strip_key(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}
