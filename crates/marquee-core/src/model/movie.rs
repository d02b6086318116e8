use serde::{Deserialize, Serialize};

/// Marker MovieLens uses for a movie without any genre.
pub const NO_GENRES: &str = "(no genres listed)";

/// A row of the `movies` table.
///
/// Only `movie_id` is guaranteed; every other column is nullable in the
/// schema and modelled as an `Option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub title: Option<String>,
    pub year: Option<i64>,
    /// Pipe-delimited genre list, e.g. `Adventure|Comedy`.
    pub genres: Option<String>,
}

impl Movie {
    #[must_use]
    pub fn new(movie_id: i64, title: impl Into<String>) -> Self {
        Self {
            movie_id,
            title: Some(title.into()),
            year: None,
            genres: None,
        }
    }

    #[must_use]
    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    #[must_use]
    pub fn with_genres(mut self, genres: impl Into<String>) -> Self {
        self.genres = Some(genres.into());
        self
    }

    /// The individual genres of this movie.
    #[must_use]
    pub fn genre_list(&self) -> Vec<&str> {
        split_genres(self.genres.as_deref())
    }
}

/// Split a pipe-delimited genre column into its entries.
///
/// `NULL`, the empty string and [`NO_GENRES`] all yield an empty list.
#[must_use]
pub fn split_genres(genres: Option<&str>) -> Vec<&str> {
    match genres.map(str::trim) {
        None | Some("" | NO_GENRES) => Vec::new(),
        Some(list) => list
            .split('|')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .collect(),
    }
}
