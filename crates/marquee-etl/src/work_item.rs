use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use treadle::WorkItem;
use uuid::Uuid;

/// One ETL run flowing through the load -> enrich -> export stages.
///
/// Every run gets its own id so the pipeline state store never treats a
/// new run as already complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlRun {
    id: String,
    /// The MovieLens directory being loaded.
    pub data_dir: PathBuf,
}

impl EtlRun {
    #[must_use]
    pub fn new(id: impl Into<String>, data_dir: PathBuf) -> Self {
        Self {
            id: id.into(),
            data_dir,
        }
    }

    /// A run with a freshly generated id.
    #[must_use]
    pub fn fresh(data_dir: PathBuf) -> Self {
        Self::new(format!("etl-{}", Uuid::new_v4()), data_dir)
    }
}

impl WorkItem for EtlRun {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for EtlRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.data_dir.display())
    }
}
