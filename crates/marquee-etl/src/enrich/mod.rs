//! OMDb enrichment: HTTP client, response cache and the enrich stage.

pub mod cache;
pub mod omdb;
pub mod resilience;
pub mod stage;
