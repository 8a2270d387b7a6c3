//! Data loading, cleaning, and feature synthesis

pub mod csv_loader;
pub mod features;
pub mod tables;

pub use csv_loader::{load_race_records, CleaningReport, REQUIRED_COLUMNS};
pub use features::FeatureSynthesizer;
