//! Output generation for one-shot harvests.
//!
//! # Submodules
//!
//! - [`json`]: Writes a [`Batch`](crate::models::Batch) to a JSON file
//! - [`csv`]: Writes the same batch as a flat CSV table

pub mod csv;
pub mod json;
