//! # ab-core
//!
//! Shared error type and record types for the abstat workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error type and `Result` alias.
pub mod error;
/// Experiment records: arms, page variants, interaction and country rows.
pub mod types;

pub use error::{Error, Result};
pub use types::{Arm, CountryRecord, InteractionRecord, JoinedRecord, PageVariant};

/// Crate version, recorded in reports and bundles.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
