//! Probability building blocks for abstat.
//!
//! Thin, validated wrappers over `statrs` distributions plus the pieces
//! `statrs` does not ship (the noncentral t used by power analysis).

pub mod chi_squared;
pub mod noncentral_t;
pub mod normal;
pub mod quadrature;
pub mod student_t;
