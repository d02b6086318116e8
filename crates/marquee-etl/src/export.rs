//! The Export stage: write the top-rated enriched movies to CSV.

use std::path::{Path, PathBuf};

use marquee_core::schema::Database;
use treadle::{Stage, StageContext, StageOutcome};

use crate::error::EtlResult;

pub const TOP10_CSV: &str = "top10_enriched.csv";

const HEADER: [&str; 10] = [
    "movieId",
    "title",
    "year",
    "genres",
    "director",
    "plot",
    "box_office",
    "imdb_rating",
    "imdb_id",
    "other_fields",
];

/// Write the top-rated query result to `<output_dir>/top10_enriched.csv`.
///
/// The header row is always written, even when nothing is enriched.
pub fn export_top_rated(db: &Database, output_dir: &Path) -> EtlResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(TOP10_CSV);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    writer.write_record(HEADER)?;
    for movie in db.top_rated()? {
        writer.serialize(&movie)?;
    }
    writer.flush()?;

    Ok(path)
}

/// The Export stage. Failures are logged and never fail the run.
#[derive(Debug)]
pub struct ExportStage {
    db_path: PathBuf,
    output_dir: PathBuf,
}

impl ExportStage {
    #[must_use]
    pub fn new(db_path: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            db_path,
            output_dir,
        }
    }

    fn run(&self) -> EtlResult<PathBuf> {
        let db = Database::open(&self.db_path)?;
        export_top_rated(&db, &self.output_dir)
    }
}

#[async_trait::async_trait]
impl Stage for ExportStage {
    fn name(&self) -> &str {
        "export"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match self.run() {
            Ok(path) => log::info!("Exported {}", path.display()),
            Err(e) => log::warn!("Could not export {}: {}", self.output_dir.display(), e),
        }
        Ok(StageOutcome::Complete)
    }
}
