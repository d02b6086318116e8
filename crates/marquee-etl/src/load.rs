//! The Load stage: read the MovieLens CSV files into `movies` and `ratings`.

use std::path::{Path, PathBuf};

use marquee_core::model::{Movie, Rating};
use marquee_core::schema::Database;
use serde::Deserialize;
use treadle::{Stage, StageContext, StageOutcome};

use crate::error::{EtlError, EtlResult};

pub const MOVIES_CSV: &str = "movies.csv";
pub const RATINGS_CSV: &str = "ratings.csv";

/// One line of `movies.csv`.
#[derive(Debug, Deserialize)]
struct MovieRecord {
    #[serde(rename = "movieId")]
    movie_id: i64,
    title: String,
    genres: Option<String>,
}

/// One line of `ratings.csv`.
#[derive(Debug, Deserialize)]
struct RatingRecord {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "movieId")]
    movie_id: i64,
    rating: f64,
    timestamp: i64,
}

/// The parsed contents of a MovieLens data directory.
#[derive(Debug, Default)]
pub struct MovieLensData {
    pub movies: Vec<Movie>,
    pub ratings: Vec<Rating>,
}

/// Row counts from loading a [`MovieLensData`] into the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub movies: usize,
    pub ratings_read: usize,
    pub ratings_inserted: usize,
}

impl LoadSummary {
    /// Ratings dropped because their (`userId`, `movieId`) pair was already loaded.
    pub fn duplicate_ratings(&self) -> usize {
        self.ratings_read - self.ratings_inserted
    }
}

/// Extract the release year from a MovieLens title such as `Toy Story (1995)`.
///
/// The four characters before a trailing `)` are parsed as the year; any
/// other shape yields `None`.
pub fn parse_title_year(title: &str) -> Option<i64> {
    let trimmed = title.trim();
    if !trimmed.ends_with(')') {
        return None;
    }
    let chars: Vec<char> = trimmed.chars().collect();
    let end = chars.len() - 1;
    let start = end.saturating_sub(4);
    let year: String = chars[start..end].iter().collect();
    year.trim().parse().ok()
}

/// Read `movies.csv` and `ratings.csv` from a MovieLens directory.
///
/// Both files must exist; nothing is read otherwise.
pub fn read_movielens(dir: &Path) -> EtlResult<MovieLensData> {
    let movies_path = dir.join(MOVIES_CSV);
    let ratings_path = dir.join(RATINGS_CSV);
    if !movies_path.is_file() || !ratings_path.is_file() {
        return Err(EtlError::MissingInput {
            dir: dir.to_path_buf(),
        });
    }

    Ok(MovieLensData {
        movies: read_movies(&movies_path)?,
        ratings: read_ratings(&ratings_path)?,
    })
}

fn read_movies(path: &Path) -> EtlResult<Vec<Movie>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut movies = Vec::new();
    for record in reader.deserialize() {
        let record: MovieRecord = record?;
        movies.push(Movie {
            movie_id: record.movie_id,
            year: parse_title_year(&record.title),
            title: Some(record.title),
            genres: record.genres,
        });
    }
    log::debug!("Read {} movies from {}", movies.len(), path.display());
    Ok(movies)
}

fn read_ratings(path: &Path) -> EtlResult<Vec<Rating>> {
    let mut reader = csv::Reader::from_path(path)?;
    let ratings = reader
        .deserialize::<RatingRecord>()
        .map(|record| {
            record.map(|r| Rating::new(r.user_id, r.movie_id, r.rating, r.timestamp))
        })
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("Read {} ratings from {}", ratings.len(), path.display());
    Ok(ratings)
}

/// Write parsed MovieLens data into the catalog.
///
/// Movies replace existing rows with the same id; ratings whose
/// (`userId`, `movieId`) pair is already present are ignored.
pub fn load_catalog(db: &Database, data: &MovieLensData) -> EtlResult<LoadSummary> {
    let movies = db.upsert_movies(&data.movies)?;
    log::info!("Upserted {} movies into movies table", movies);

    let ratings_inserted = db.insert_ratings(&data.ratings)?;
    log::info!(
        "Inserted {} ratings into ratings table (duplicates ignored)",
        ratings_inserted
    );

    Ok(LoadSummary {
        movies,
        ratings_read: data.ratings.len(),
        ratings_inserted,
    })
}

/// The Load stage: re-initialize the catalog schema and load the CSV files.
#[derive(Debug)]
pub struct LoadStage {
    data_dir: PathBuf,
    db_path: PathBuf,
}

impl LoadStage {
    #[must_use]
    pub fn new(data_dir: PathBuf, db_path: PathBuf) -> Self {
        Self { data_dir, db_path }
    }

    /// Read the inputs, then reset the schema and load them.
    ///
    /// The catalog is left untouched when the inputs cannot be read.
    pub fn run(&self) -> EtlResult<LoadSummary> {
        let data = read_movielens(&self.data_dir)?;

        let db = Database::open(&self.db_path)?;
        db.apply_schema()?;
        load_catalog(&db, &data)
    }
}

#[async_trait::async_trait]
impl Stage for LoadStage {
    fn name(&self) -> &str {
        "load"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        log::info!("Loading MovieLens data from {}", self.data_dir.display());

        match self.run() {
            Ok(summary) => {
                log::info!(
                    "Load complete: {} movies, {} ratings ({} duplicates)",
                    summary.movies,
                    summary.ratings_inserted,
                    summary.duplicate_ratings()
                );
                Ok(StageOutcome::Complete)
            }
            Err(e) => {
                log::error!("Error reading CSVs: {e}");
                Err(treadle::TreadleError::StageExecution(format!(
                    "Load failed: {e}"
                )))
            }
        }
    }
}
