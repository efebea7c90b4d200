//! HTTP API handlers for the badge inventory service

pub mod badges;
pub mod health;
pub mod inventory;
pub mod scans;

pub use badges::badge_routes;
pub use health::health_routes;
pub use inventory::inventory_routes;
pub use scans::scan_routes;
