//! Domain models for the badge inventory service

pub mod catalog;
pub mod detection;
pub mod inventory;
pub mod scan;

pub use catalog::{CatalogEntry, CatalogSnapshot};
pub use detection::{BadgeMatch, ConfidenceLabel, RawDetection, StoredDetection};
pub use inventory::{AdjustmentRecord, InventoryRecord, QuantityChange};
pub use scan::{Scan, ScanImage, ScanStatus};
