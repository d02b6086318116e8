use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::movie::split_genres;

/// A row of the `movies_enriched` table: the base movie columns plus
/// metadata fetched from OMDb.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnrichedMovie {
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub title: Option<String>,
    pub year: Option<i64>,
    pub genres: Option<String>,
    pub director: Option<String>,
    pub plot: Option<String>,
    /// Box office gross as OMDb reports it (e.g. `$223,808,164`).
    pub box_office: Option<String>,
    pub imdb_rating: Option<f64>,
    pub imdb_id: Option<String>,
    /// JSON object with the OMDb fields that have no dedicated column.
    pub other_fields: Option<String>,
}

impl EnrichedMovie {
    #[must_use]
    pub fn new(movie_id: i64, title: impl Into<String>) -> Self {
        Self {
            movie_id,
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    #[must_use]
    pub fn with_imdb_rating(mut self, rating: f64) -> Self {
        self.imdb_rating = Some(rating);
        self
    }

    #[must_use]
    pub fn genre_list(&self) -> Vec<&str> {
        split_genres(self.genres.as_deref())
    }

    /// Parse `other_fields` back into JSON.
    ///
    /// Returns `Value::Null` when the column is empty.
    pub fn other_fields_json(&self) -> Result<serde_json::Value> {
        match self.other_fields.as_deref() {
            None | Some("") => Ok(serde_json::Value::Null),
            Some(raw) => Ok(serde_json::from_str(raw)?),
        }
    }
}
