//! The fixed catalog queries.
//!
//! Five static, parameterless SELECT statements make up the whole query
//! surface of the catalog. Each is available as SQL text through
//! [`CatalogQuery::sql`] and as a typed method on [`Database`].
//!
//! Rating orderings use `NULLS LAST`, so movies without an IMDb rating
//! follow every rated movie. Ties fall back to `movieId`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::EnrichedMovie;
use crate::schema::db::{row_to_enriched, to_count};
use crate::schema::Database;

/// Maximum number of rows returned by [`CatalogQuery::TopRated`].
pub const TOP_RATED_LIMIT: usize = 10;

/// First release year included by [`CatalogQuery::SinceYear2000`].
pub const SINCE_YEAR: i64 = 2000;

const TABLES_SQL: &str = "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name";

const TOP_RATED_SQL: &str = "SELECT movieId, title, year, genres, director, plot, box_office, \
     imdb_rating, imdb_id, other_fields \
     FROM movies_enriched \
     ORDER BY imdb_rating DESC NULLS LAST, movieId \
     LIMIT 10";

const ENRICHED_COUNT_SQL: &str = "SELECT COUNT(*) FROM movies_enriched";

const MISSING_RATING_SQL: &str = "SELECT movieId, title, year, genres, director, plot, \
     box_office, imdb_rating, imdb_id, other_fields \
     FROM movies_enriched \
     WHERE imdb_rating IS NULL \
     ORDER BY movieId";

const SINCE_2000_SQL: &str = "SELECT movieId, title, year, genres, director, plot, box_office, \
     imdb_rating, imdb_id, other_fields \
     FROM movies_enriched \
     WHERE year >= 2000 \
     ORDER BY imdb_rating DESC NULLS LAST, movieId";

/// One of the catalog's fixed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogQuery {
    /// Names of all tables in the catalog.
    Tables,
    /// The ten best-rated enriched movies.
    TopRated,
    /// Number of enriched movies.
    EnrichedCount,
    /// Enriched movies without an IMDb rating.
    MissingRating,
    /// Enriched movies released in 2000 or later, best-rated first.
    SinceYear2000,
}

impl CatalogQuery {
    pub const ALL: [Self; 5] = [
        Self::Tables,
        Self::TopRated,
        Self::EnrichedCount,
        Self::MissingRating,
        Self::SinceYear2000,
    ];

    /// The command-line name of the query.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::TopRated => "top-rated",
            Self::EnrichedCount => "count",
            Self::MissingRating => "missing-rating",
            Self::SinceYear2000 => "since-2000",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Tables => "list the tables in the catalog",
            Self::TopRated => "top 10 enriched movies by IMDb rating",
            Self::EnrichedCount => "number of enriched movies",
            Self::MissingRating => "enriched movies without an IMDb rating",
            Self::SinceYear2000 => "enriched movies from 2000 on, by IMDb rating",
        }
    }

    /// The exact SQL text of the query.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Tables => TABLES_SQL,
            Self::TopRated => TOP_RATED_SQL,
            Self::EnrichedCount => ENRICHED_COUNT_SQL,
            Self::MissingRating => MISSING_RATING_SQL,
            Self::SinceYear2000 => SINCE_2000_SQL,
        }
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CatalogQuery {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|q| q.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|q| q.name()).collect();
                Error::InvalidData(format!(
                    "unknown query '{s}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}

/// The result of running a [`CatalogQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Tables(Vec<String>),
    Count(u64),
    Movies(Vec<EnrichedMovie>),
}

impl Database {
    /// Run any catalog query.
    pub fn run_query(&self, query: CatalogQuery) -> Result<QueryOutput> {
        log::debug!("Running catalog query {query}");
        Ok(match query {
            CatalogQuery::Tables => QueryOutput::Tables(self.list_tables()?),
            CatalogQuery::TopRated => QueryOutput::Movies(self.top_rated()?),
            CatalogQuery::EnrichedCount => QueryOutput::Count(self.count_enriched()?),
            CatalogQuery::MissingRating => QueryOutput::Movies(self.missing_imdb_rating()?),
            CatalogQuery::SinceYear2000 => QueryOutput::Movies(self.released_since_2000()?),
        })
    }

    /// Names of all tables in the catalog, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(TABLES_SQL)?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// At most ten enriched movies, best IMDb rating first.
    pub fn top_rated(&self) -> Result<Vec<EnrichedMovie>> {
        self.enriched_rows(TOP_RATED_SQL)
    }

    pub fn count_enriched(&self) -> Result<u64> {
        let count: i64 = self
            .conn()
            .query_row(ENRICHED_COUNT_SQL, [], |row| row.get(0))?;
        to_count(count)
    }

    /// Enriched movies whose `imdb_rating` is NULL.
    pub fn missing_imdb_rating(&self) -> Result<Vec<EnrichedMovie>> {
        self.enriched_rows(MISSING_RATING_SQL)
    }

    /// Enriched movies with `year >= 2000`, best IMDb rating first.
    pub fn released_since_2000(&self) -> Result<Vec<EnrichedMovie>> {
        self.enriched_rows(SINCE_2000_SQL)
    }

    fn enriched_rows(&self, sql: &str) -> Result<Vec<EnrichedMovie>> {
        let mut stmt = self.conn().prepare(sql)?;
        let movies = stmt
            .query_map([], row_to_enriched)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(movies)
    }
}
