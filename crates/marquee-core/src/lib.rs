//! Core catalog model for marquee.
//!
//! This crate defines the three catalog tables (`movies`, `ratings`,
//! `movies_enriched`), their row types, the SQLite schema, and the fixed
//! set of catalog queries that run against it.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod queries;
pub mod schema;

pub use error::{Error, Result};
pub use queries::CatalogQuery;
pub use schema::{CatalogTable, Database};
