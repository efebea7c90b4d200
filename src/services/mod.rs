//! Core services: name normalization, catalog matching, vision response
//! parsing, scan processing, and inventory reconciliation.

pub mod abbreviations;
pub mod matcher;
pub mod normalizer;
pub mod parser;
pub mod reconciler;
pub mod scan_processor;
pub mod vision;
