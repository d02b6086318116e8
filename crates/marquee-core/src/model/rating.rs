use serde::{Deserialize, Serialize};

/// A row of the `ratings` table, keyed by (`userId`, `movieId`).
///
/// `movie_id` is not a declared foreign key; a rating may reference a
/// movie that is absent from `movies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub rating: Option<f64>,
    /// Seconds since the Unix epoch, as MovieLens records it.
    pub timestamp: Option<i64>,
}

impl Rating {
    #[must_use]
    pub fn new(user_id: i64, movie_id: i64, rating: f64, timestamp: i64) -> Self {
        Self {
            user_id,
            movie_id,
            rating: Some(rating),
            timestamp: Some(timestamp),
        }
    }
}
