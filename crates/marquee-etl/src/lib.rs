//! ETL pipeline stages for marquee.
//!
//! Loads the MovieLens CSV files into the catalog, enriches movies with
//! OMDb metadata, and exports the best-rated titles, as treadle `Stage`
//! implementations.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod load;
pub mod pipeline;
pub mod work_item;

pub use config::Config;
pub use enrich::stage::{EnrichMode, EnrichStage, EnrichSummary, Enricher};
pub use error::{EtlError, EtlResult};
pub use export::{export_top_rated, ExportStage};
pub use load::{load_catalog, read_movielens, LoadStage, LoadSummary};
pub use pipeline::{build_pipeline, run_pipeline};
pub use work_item::EtlRun;
