use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{EnrichedMovie, Movie, Rating};

use super::tables::{schema_sql, CatalogTable, TABLES};

pub(crate) const ENRICHED_COLUMNS: &str = "movieId, title, year, genres, director, plot, \
     box_office, imdb_rating, imdb_id, other_fields";

/// A connection to the catalog database.
///
/// Opening a database never touches the schema; call
/// [`Database::apply_schema`] to (re)create the tables.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database file at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Opening catalog database at {}", path.display());
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Drop and recreate every catalog table.
    ///
    /// Destructive: all existing rows are lost. Applying it twice leaves the
    /// same three empty tables.
    pub fn apply_schema(&self) -> Result<()> {
        log::info!("Applying catalog schema ({} tables)", TABLES.len());
        self.conn.execute_batch(schema_sql())?;
        Ok(())
    }

    /// Whether a table with this name exists.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Number of rows in a catalog table.
    pub fn count_rows(&self, table: CatalogTable) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        to_count(count)
    }
}

pub(crate) fn to_count(count: i64) -> Result<u64> {
    u64::try_from(count).map_err(|_| Error::InvalidData(format!("negative row count {count}")))
}

// Movie CRUD
impl Database {
    /// Insert a single movie. Fails if the `movieId` already exists.
    pub fn insert_movie(&self, movie: &Movie) -> Result<()> {
        self.conn.execute(
            "INSERT INTO movies (movieId, title, year, genres) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![movie.movie_id, movie.title, movie.year, movie.genres],
        )?;
        Ok(())
    }

    /// Insert or replace movies in a single transaction.
    pub fn upsert_movies(&self, movies: &[Movie]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO movies (movieId, title, year, genres)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for movie in movies {
                stmt.execute(rusqlite::params![
                    movie.movie_id,
                    movie.title,
                    movie.year,
                    movie.genres
                ])?;
            }
        }
        tx.commit()?;
        Ok(movies.len())
    }

    /// List all movies ordered by `movieId`.
    pub fn list_movies(&self) -> Result<Vec<Movie>> {
        let mut stmt = self
            .conn
            .prepare("SELECT movieId, title, year, genres FROM movies ORDER BY movieId")?;

        let movies = stmt
            .query_map([], |row| {
                Ok(Movie {
                    movie_id: row.get(0)?,
                    title: row.get(1)?,
                    year: row.get(2)?,
                    genres: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(movies)
    }
}

// Rating CRUD
impl Database {
    /// Insert a single rating. Fails if the (`userId`, `movieId`) pair exists.
    pub fn insert_rating(&self, rating: &Rating) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ratings (userId, movieId, rating, timestamp) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                rating.user_id,
                rating.movie_id,
                rating.rating,
                rating.timestamp
            ],
        )?;
        Ok(())
    }

    /// Insert ratings in a single transaction, skipping any whose
    /// (`userId`, `movieId`) pair is already stored.
    ///
    /// Returns the number of rows actually inserted.
    pub fn insert_ratings(&self, ratings: &[Rating]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO ratings (userId, movieId, rating, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for rating in ratings {
                inserted += stmt.execute(rusqlite::params![
                    rating.user_id,
                    rating.movie_id,
                    rating.rating,
                    rating.timestamp
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }
}

// Enriched movie CRUD
impl Database {
    /// Insert an enriched movie. Fails if the `movieId` already exists.
    pub fn insert_enriched(&self, movie: &EnrichedMovie) -> Result<()> {
        self.write_enriched("INSERT", movie)
    }

    /// Insert or replace an enriched movie.
    pub fn upsert_enriched(&self, movie: &EnrichedMovie) -> Result<()> {
        self.write_enriched("INSERT OR REPLACE", movie)
    }

    fn write_enriched(&self, verb: &str, movie: &EnrichedMovie) -> Result<()> {
        self.conn.execute(
            &format!(
                "{verb} INTO movies_enriched ({ENRICHED_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            rusqlite::params![
                movie.movie_id,
                movie.title,
                movie.year,
                movie.genres,
                movie.director,
                movie.plot,
                movie.box_office,
                movie.imdb_rating,
                movie.imdb_id,
                movie.other_fields,
            ],
        )?;
        Ok(())
    }

    /// Look up one enriched movie by id.
    pub fn get_enriched(&self, movie_id: i64) -> Result<Option<EnrichedMovie>> {
        let movie = self
            .conn
            .query_row(
                &format!("SELECT {ENRICHED_COLUMNS} FROM movies_enriched WHERE movieId = ?1"),
                [movie_id],
                row_to_enriched,
            )
            .optional()?;
        Ok(movie)
    }
}

pub(crate) fn row_to_enriched(row: &rusqlite::Row) -> rusqlite::Result<EnrichedMovie> {
    Ok(EnrichedMovie {
        movie_id: row.get(0)?,
        title: row.get(1)?,
        year: row.get(2)?,
        genres: row.get(3)?,
        director: row.get(4)?,
        plot: row.get(5)?,
        box_office: row.get(6)?,
        imdb_rating: row.get(7)?,
        imdb_id: row.get(8)?,
        other_fields: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.apply_schema().unwrap();
        db
    }

    #[test]
    fn test_open_does_not_create_tables() {
        let db = Database::open_in_memory().unwrap();
        for table in CatalogTable::ALL {
            assert!(!db.table_exists(table.name()).unwrap());
        }
    }

    #[test]
    fn test_apply_schema_creates_all_tables() {
        let db = catalog();
        for table in CatalogTable::ALL {
            assert!(db.table_exists(table.name()).unwrap());
            assert_eq!(db.count_rows(table).unwrap(), 0);
        }
    }

    #[test]
    fn test_apply_schema_twice_leaves_empty_tables() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("movies.db")).unwrap();
        db.apply_schema().unwrap();

        db.insert_movie(&Movie::new(1, "Toy Story (1995)")).unwrap();
        db.insert_rating(&Rating::new(1, 1, 4.0, 964_982_703)).unwrap();
        db.insert_enriched(&EnrichedMovie::new(1, "Toy Story (1995)"))
            .unwrap();

        db.apply_schema().unwrap();

        for table in CatalogTable::ALL {
            assert_eq!(db.count_rows(table).unwrap(), 0, "{table} not emptied");
        }
        let tables: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_duplicate_movie_id_rejected() {
        let db = catalog();
        db.insert_movie(&Movie::new(1, "Toy Story (1995)")).unwrap();
        let result = db.insert_movie(&Movie::new(1, "Jumanji (1995)"));
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn test_duplicate_rating_pair_rejected() {
        let db = catalog();
        db.insert_rating(&Rating::new(1, 1, 4.0, 100)).unwrap();
        // Same (userId, movieId) with a different timestamp is still a duplicate.
        let result = db.insert_rating(&Rating::new(1, 1, 3.5, 200));
        assert!(matches!(result, Err(Error::Database(_))));
        // Same movie, different user is fine.
        db.insert_rating(&Rating::new(2, 1, 3.5, 200)).unwrap();
    }

    #[test]
    fn test_duplicate_enriched_movie_id_rejected() {
        let db = catalog();
        db.insert_enriched(&EnrichedMovie::new(1, "A")).unwrap();
        let result = db.insert_enriched(&EnrichedMovie::new(1, "B"));
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn test_non_key_columns_are_nullable() {
        let db = catalog();
        db.insert_movie(&Movie {
            movie_id: 5,
            title: None,
            year: None,
            genres: None,
        })
        .unwrap();
        db.insert_rating(&Rating {
            user_id: 1,
            movie_id: 5,
            rating: None,
            timestamp: None,
        })
        .unwrap();
        db.insert_enriched(&EnrichedMovie {
            movie_id: 5,
            ..EnrichedMovie::default()
        })
        .unwrap();

        let movies = db.list_movies().unwrap();
        assert_eq!(movies[0].title, None);
    }

    #[test]
    fn test_rating_without_movie_is_accepted() {
        let db = catalog();
        db.insert_rating(&Rating::new(1, 999, 5.0, 0)).unwrap();
        assert_eq!(db.count_rows(CatalogTable::Movies).unwrap(), 0);
        assert_eq!(db.count_rows(CatalogTable::Ratings).unwrap(), 1);
    }

    #[test]
    fn test_upsert_movies_replaces_existing() {
        let db = catalog();
        db.upsert_movies(&[Movie::new(1, "Old"), Movie::new(2, "Other")])
            .unwrap();
        db.upsert_movies(&[Movie::new(1, "New").with_year(1995)])
            .unwrap();

        let movies = db.list_movies().unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].title.as_deref(), Some("New"));
        assert_eq!(movies[0].year, Some(1995));
    }

    #[test]
    fn test_insert_ratings_ignores_duplicates() {
        let db = catalog();
        let inserted = db
            .insert_ratings(&[
                Rating::new(1, 1, 4.0, 100),
                Rating::new(1, 2, 3.0, 100),
                Rating::new(1, 1, 1.0, 300),
            ])
            .unwrap();
        assert_eq!(inserted, 2);

        let rating: f64 = db
            .conn()
            .query_row(
                "SELECT rating FROM ratings WHERE userId = 1 AND movieId = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!((rating - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_upsert_enriched_round_trip() {
        let db = catalog();
        let mut movie = EnrichedMovie::new(1, "Toy Story (1995)")
            .with_year(1995)
            .with_imdb_rating(8.3);
        movie.director = Some("John Lasseter".to_string());
        movie.imdb_id = Some("tt0114709".to_string());
        db.upsert_enriched(&movie).unwrap();

        movie.plot = Some("A cowboy doll...".to_string());
        db.upsert_enriched(&movie).unwrap();

        assert_eq!(db.get_enriched(1).unwrap(), Some(movie));
        assert_eq!(db.get_enriched(2).unwrap(), None);
    }
}
