//! # ab-ingest
//!
//! Reads the interaction log and the user → country mapping, reports their
//! data quality, and applies the fixed cleaning policy that produces the
//! joined dataset analysed by `ab-inference`.
//!
//! ## Pipeline
//!
//! 1. [`load::load_interactions`] / [`load::load_countries`]: CSV → typed
//!    records plus [`load::TableDiagnostics`].
//! 2. [`clean::clean_and_join`]: drop arm/page mismatches, resolve users seen
//!    under both arms, attach the country.
//! 3. [`synthetic::generate`]: seeded fake data with the same shape, for demos
//!    and tests.

#![warn(missing_docs)]

/// Ingestion error type.
pub mod error;
/// Cleaning policy and country join.
pub mod clean;
/// CSV readers and table diagnostics.
pub mod load;
/// Seeded synthetic interaction logs.
pub mod synthetic;

pub use clean::{CleanedDataset, CleaningReport, DuplicatePolicy, clean_and_join, clean_loaded};
pub use error::IngestError;
pub use load::{
    ConsistencyCell, ConsistencyReport, LoadedTable, TableDiagnostics, load_countries,
    load_interactions, page_group_consistency, read_countries, read_interactions,
};
pub use synthetic::{SyntheticConfig, SyntheticDataset, generate};
