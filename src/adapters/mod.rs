//! Adapters layer: Concrete implementations of ports.
//!
//! - `model`: JSON classifier artifacts with signed-manifest verification
//! - `sqlite`: SQLite history store
//! - `chart`: SVG trend charts
//! - `sanitize`: identifier and secret filtering for logs

pub mod chart;
pub mod model;
pub mod sanitize;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
