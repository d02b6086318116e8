//! Error types for the ETL pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, enriching or exporting the catalog.
#[derive(Debug, Error)]
pub enum EtlError {
    /// One of the MovieLens input files is missing.
    #[error("movies.csv or ratings.csv not found in {}", dir.display())]
    MissingInput { dir: PathBuf },

    /// A MovieLens CSV file could not be read or parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An external source answered with an unexpected HTTP status.
    #[error("HTTP {status} from {source_name}: {message}")]
    Http {
        source_name: String,
        status: u16,
        message: String,
    },

    /// The external source returned a rate-limit response.
    #[error("rate limited by {source_name}")]
    RateLimited { source_name: String },

    /// A response from an external source could not be parsed.
    #[error("parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// An error propagated from the catalog database.
    #[error("database error: {0}")]
    Database(#[from] marquee_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The workflow engine itself failed (state store, wiring).
    #[error("pipeline error: {0}")]
    Pipeline(#[from] treadle::TreadleError),

    /// A pipeline stage failed; later stages did not run.
    #[error("stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    /// The pipeline stopped with stages still pending.
    #[error("pipeline stopped before completing: {pending} not run")]
    Incomplete { pending: String },
}

impl EtlError {
    /// Returns `true` when the error is transient and the operation may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500,
            Self::RateLimited { .. } => true,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Convenience alias for ETL results.
pub type EtlResult<T> = std::result::Result<T, EtlError>;
