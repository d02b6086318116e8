use std::fmt;
use std::sync::OnceLock;

/// A catalog table definition.
#[derive(Debug)]
pub struct TableDef {
    pub table: CatalogTable,
    pub create_sql: &'static str,
}

/// The tables that make up the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogTable {
    Movies,
    Ratings,
    MoviesEnriched,
}

impl CatalogTable {
    pub const ALL: [Self; 3] = [Self::Movies, Self::Ratings, Self::MoviesEnriched];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::Ratings => "ratings",
            Self::MoviesEnriched => "movies_enriched",
        }
    }
}

impl fmt::Display for CatalogTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Only primary keys are declared. Every other column is nullable and
// ratings.movieId is deliberately not a foreign key.

const MOVIES: &str = r#"
CREATE TABLE movies (
    movieId INTEGER PRIMARY KEY,
    title TEXT,
    year INTEGER,
    genres TEXT
);
"#;

const RATINGS: &str = r#"
CREATE TABLE ratings (
    userId INTEGER,
    movieId INTEGER,
    rating REAL,
    timestamp INTEGER,
    PRIMARY KEY (userId, movieId)
);
"#;

const MOVIES_ENRICHED: &str = r#"
CREATE TABLE movies_enriched (
    movieId INTEGER PRIMARY KEY,
    title TEXT,
    year INTEGER,
    genres TEXT,
    director TEXT,
    plot TEXT,
    box_office TEXT,
    imdb_rating REAL,
    imdb_id TEXT,
    other_fields TEXT
);
"#;

pub const TABLES: &[TableDef] = &[
    TableDef {
        table: CatalogTable::Movies,
        create_sql: MOVIES,
    },
    TableDef {
        table: CatalogTable::Ratings,
        create_sql: RATINGS,
    },
    TableDef {
        table: CatalogTable::MoviesEnriched,
        create_sql: MOVIES_ENRICHED,
    },
];

/// The full schema script: every table is dropped, then recreated.
///
/// Running it wipes all catalog rows.
pub fn schema_sql() -> &'static str {
    static SCRIPT: OnceLock<String> = OnceLock::new();
    SCRIPT.get_or_init(|| {
        TABLES
            .iter()
            .map(|def| {
                format!(
                    "DROP TABLE IF EXISTS {};\n{}",
                    def.table.name(),
                    def.create_sql.trim_start()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}
