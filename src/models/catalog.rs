//! Badge catalog types
//!
//! The catalog is the authoritative list of known badge types. It is loaded
//! once per scan-processing run into a `CatalogSnapshot` owned by the caller,
//! so the matcher never depends on hidden shared state.

use serde::{Deserialize, Serialize};

/// One canonical badge type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable badge identifier (e.g., "oas-bushcraft")
    pub badge_id: String,
    /// Canonical badge name (e.g., "OAS Bushcraft")
    pub name: String,
    /// Badge category (e.g., "Outdoor Adventure Skills")
    pub category: String,
}

/// Immutable catalog snapshot for one matching session
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    entries: Vec<CatalogEntry>,
}

impl CatalogSnapshot {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical badge names, in catalog order (used for vision prompt context)
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Look up an entry by badge id
    pub fn get(&self, badge_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.badge_id == badge_id)
    }
}
