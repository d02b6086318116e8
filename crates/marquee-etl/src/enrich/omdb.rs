//! OMDb client and response mapping.
//!
//! OMDb is queried by title and (optionally) year. The raw JSON body is
//! kept as-is so it can be cached verbatim; [`to_enriched`] maps it onto a
//! `movies_enriched` row, folding every field without a dedicated column
//! into `other_fields`.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use marquee_core::model::{EnrichedMovie, Movie};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};

use crate::enrich::resilience::RateLimiter;
use crate::error::{EtlError, EtlResult};

const OMDB_API_BASE: &str = "http://www.omdbapi.com/";
const SOURCE_NAME: &str = "OMDb";

/// Requests per second sent to OMDb.
const OMDB_REQUESTS_PER_SECOND: u32 = 10;

/// Response keys stored in dedicated columns (or taken from MovieLens
/// instead) and therefore left out of `other_fields`.
const DEDICATED_FIELDS: &[&str] = &[
    "Title",
    "Year",
    "Director",
    "Plot",
    "BoxOffice",
    "imdbRating",
    "imdbID",
    "Genre",
];

/// A source of movie metadata, keyed by title and year.
///
/// Returns the raw response; `Value::Null` means nothing is known.
#[async_trait::async_trait]
pub trait MovieLookup: Send + Sync + fmt::Debug {
    async fn lookup(&self, title: &str, year: Option<i64>) -> EtlResult<Value>;
}

/// OMDb API client.
///
/// Wraps an HTTP client, an API key, and a rate limiter. Transient
/// failures are retried with exponential backoff.
#[derive(Debug, Clone)]
pub struct OmdbClient {
    http: Client,
    api_key: String,
    base_url: String,
    rate_limiter: RateLimiter,
    max_retries: usize,
}

impl OmdbClient {
    /// Create a new OMDb client.
    pub fn new(api_key: String, max_retries: usize) -> EtlResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("marquee/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: OMDB_API_BASE.to_string(),
            rate_limiter: RateLimiter::new(OMDB_REQUESTS_PER_SECOND),
            max_retries,
        })
    }

    /// Point the client at a different endpoint (an OMDb-compatible mirror).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn query_params(&self, title: &str, year: Option<i64>) -> Vec<(&'static str, String)> {
        let mut params = vec![("t", title.to_string())];
        if let Some(year) = year {
            params.push(("y", year.to_string()));
        }
        params.push(("apikey", self.api_key.clone()));
        params
    }

    async fn fetch(&self, title: &str, year: Option<i64>) -> EtlResult<Value> {
        self.rate_limiter.acquire().await;

        let response = self
            .http
            .get(&self.base_url)
            .query(&self.query_params(title, year))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(EtlError::RateLimited {
                    source_name: SOURCE_NAME.to_string(),
                });
            }
            status => {
                return Err(EtlError::Http {
                    source_name: SOURCE_NAME.to_string(),
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("unexpected status").to_string(),
                });
            }
        }

        response.json().await.map_err(|e| EtlError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl MovieLookup for OmdbClient {
    async fn lookup(&self, title: &str, year: Option<i64>) -> EtlResult<Value> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_times(self.max_retries);

        (|| self.fetch(title, year))
            .retry(backoff)
            .when(EtlError::is_transient)
            .notify(|e, delay| {
                log::warn!("OMDb request for {title} failed ({e}); retrying in {delay:?}");
            })
            .await
    }
}

/// Lookup backed by a fixed set of responses, for offline runs.
///
/// Keys follow [`cache_key`](crate::enrich::cache::cache_key).
#[derive(Debug, Default)]
pub struct MockLookup {
    responses: HashMap<String, Value>,
}

impl MockLookup {
    pub fn new(responses: HashMap<String, Value>) -> Self {
        Self { responses }
    }
}

#[async_trait::async_trait]
impl MovieLookup for MockLookup {
    async fn lookup(&self, title: &str, year: Option<i64>) -> EtlResult<Value> {
        let key = crate::enrich::cache::cache_key(Some(title), year);
        Ok(self.responses.get(&key).cloned().unwrap_or(Value::Null))
    }
}

/// Map an OMDb response onto a `movies_enriched` row for `movie`.
///
/// Returns `None` when the response carries nothing usable: it is not a
/// non-empty object, or OMDb answered `"Response": "False"`.
pub fn to_enriched(movie: &Movie, response: &Value) -> EtlResult<Option<EnrichedMovie>> {
    let Some(fields) = response.as_object() else {
        return Ok(None);
    };
    if fields.is_empty() || fields.get("Response").and_then(Value::as_str) == Some("False") {
        return Ok(None);
    }

    let other: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| !DEDICATED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Some(EnrichedMovie {
        movie_id: movie.movie_id,
        title: movie.title.clone(),
        year: movie.year,
        genres: movie.genres.clone(),
        director: text_field(fields, "Director"),
        plot: text_field(fields, "Plot"),
        box_office: text_field(fields, "BoxOffice"),
        imdb_rating: parse_rating(fields.get("imdbRating")),
        imdb_id: text_field(fields, "imdbID"),
        other_fields: Some(serde_json::to_string(&Value::Object(other))?),
    }))
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// `imdbRating` arrives as a string; `"N/A"`, blanks and junk become NULL.
fn parse_rating(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s != "N/A" => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn toy_story() -> Movie {
        Movie::new(1, "Toy Story (1995)")
            .with_year(1995)
            .with_genres("Adventure|Animation")
    }

    fn toy_story_response() -> Value {
        json!({
            "Title": "Toy Story",
            "Year": "1995",
            "Rated": "G",
            "Genre": "Animation, Adventure, Comedy",
            "Director": "John Lasseter",
            "Plot": "A cowboy doll is profoundly threatened...",
            "BoxOffice": "$223,225,679",
            "imdbRating": "8.3",
            "imdbID": "tt0114709",
            "Response": "True"
        })
    }

    #[test]
    fn test_to_enriched_maps_dedicated_columns() {
        let enriched = to_enriched(&toy_story(), &toy_story_response())
            .unwrap()
            .unwrap();

        assert_eq!(enriched.movie_id, 1);
        assert_eq!(enriched.title.as_deref(), Some("Toy Story (1995)"));
        assert_eq!(enriched.genres.as_deref(), Some("Adventure|Animation"));
        assert_eq!(enriched.director.as_deref(), Some("John Lasseter"));
        assert_eq!(enriched.box_office.as_deref(), Some("$223,225,679"));
        assert_eq!(enriched.imdb_rating, Some(8.3));
        assert_eq!(enriched.imdb_id.as_deref(), Some("tt0114709"));
    }

    #[test]
    fn test_to_enriched_keeps_remaining_fields() {
        let enriched = to_enriched(&toy_story(), &toy_story_response())
            .unwrap()
            .unwrap();

        let other = enriched.other_fields_json().unwrap();
        assert_eq!(other, json!({"Rated": "G", "Response": "True"}));
    }

    #[test]
    fn test_other_fields_follow_response_order() {
        let response: Value = serde_json::from_str(
            r#"{"Title":"Toy Story","Runtime":"81 min","Director":"John Lasseter","Awards":"Won 1 Oscar","Rated":"G","Response":"True"}"#,
        )
        .unwrap();
        let enriched = to_enriched(&toy_story(), &response).unwrap().unwrap();

        assert_eq!(
            enriched.other_fields.as_deref(),
            Some(r#"{"Runtime":"81 min","Awards":"Won 1 Oscar","Rated":"G","Response":"True"}"#)
        );
    }

    #[test]
    fn test_to_enriched_rejects_unusable_responses() {
        let movie = toy_story();
        assert!(to_enriched(&movie, &Value::Null).unwrap().is_none());
        assert!(to_enriched(&movie, &json!({})).unwrap().is_none());
        assert!(to_enriched(&movie, &json!("oops")).unwrap().is_none());
        assert!(to_enriched(
            &movie,
            &json!({"Response": "False", "Error": "Movie not found!"})
        )
        .unwrap()
        .is_none());
    }

    #[test]
    fn test_to_enriched_without_response_key() {
        let enriched = to_enriched(&toy_story(), &json!({"Director": "Someone"}))
            .unwrap()
            .unwrap();
        assert_eq!(enriched.director.as_deref(), Some("Someone"));
        assert_eq!(enriched.imdb_rating, None);
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating(Some(&json!("7.4"))), Some(7.4));
        assert_eq!(parse_rating(Some(&json!(6.5))), Some(6.5));
        assert_eq!(parse_rating(Some(&json!("N/A"))), None);
        assert_eq!(parse_rating(Some(&json!(""))), None);
        assert_eq!(parse_rating(Some(&json!("unrated"))), None);
        assert_eq!(parse_rating(Some(&Value::Null)), None);
        assert_eq!(parse_rating(None), None);
    }

    #[test]
    fn test_query_params_include_year_only_when_known() {
        let client = OmdbClient::new("secret".to_string(), 0).unwrap();
        let with_year = client.query_params("Heat", Some(1995));
        assert_eq!(
            with_year,
            vec![
                ("t", "Heat".to_string()),
                ("y", "1995".to_string()),
                ("apikey", "secret".to_string()),
            ]
        );

        let without_year = client.query_params("Heat", None);
        assert_eq!(without_year.len(), 2);
        assert!(without_year.iter().all(|(name, _)| *name != "y"));
    }

    #[tokio::test]
    async fn test_mock_lookup_unknown_is_null() {
        let mut responses = HashMap::new();
        responses.insert("Heat (1995)|1995".to_string(), json!({"Director": "Michael Mann"}));
        let lookup = MockLookup::new(responses);

        let hit = lookup.lookup("Heat (1995)", Some(1995)).await.unwrap();
        assert_eq!(hit["Director"], "Michael Mann");
        let miss = lookup.lookup("Heat (1995)", None).await.unwrap();
        assert!(miss.is_null());
    }
}
