//! The Enrich stage.
//!
//! Walks every movie in the catalog, resolves its OMDb metadata through the
//! response cache (falling back to a [`MovieLookup`] on a miss) and writes
//! usable responses to `movies_enriched`.

use std::path::PathBuf;

use marquee_core::model::EnrichedMovie;
use marquee_core::schema::Database;
use serde_json::Value;
use treadle::{Stage, StageContext, StageOutcome};

use crate::config::Config;
use crate::enrich::cache::{cache_key, OmdbCache};
use crate::enrich::omdb::{to_enriched, MockLookup, MovieLookup, OmdbClient};
use crate::error::EtlResult;

/// Where enrichment data comes from for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichMode {
    /// Query the OMDb API with this key on cache misses.
    Live { api_key: String },
    /// Serve only what the cache file already holds; no network.
    Mock,
    /// Do not enrich.
    Skip,
}

impl EnrichMode {
    /// Decide the mode from command-line flags.
    ///
    /// An explicit `cli_key` always counts; the configured key is only
    /// used when `use_omdb` is set. Mock mode takes precedence over both.
    pub fn resolve(
        cli_key: Option<String>,
        configured_key: Option<String>,
        use_omdb: bool,
        mock: bool,
    ) -> Self {
        let api_key = cli_key.or(if use_omdb { configured_key } else { None });

        if use_omdb && api_key.is_none() {
            log::warn!(
                "--use-omdb requested but OMDB_API_KEY not found in .env or --omdb-key not provided"
            );
        }

        if mock {
            Self::Mock
        } else if let Some(api_key) = api_key {
            Self::Live { api_key }
        } else {
            Self::Skip
        }
    }
}

/// Counters reported at the end of an enrichment pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrichSummary {
    pub processed: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// Enriches the catalog's movies from a [`MovieLookup`] through the cache.
#[derive(Debug)]
pub struct Enricher {
    lookup: Box<dyn MovieLookup>,
    cache_path: PathBuf,
    db_path: PathBuf,
}

impl Enricher {
    pub fn new(lookup: Box<dyn MovieLookup>, cache_path: PathBuf, db_path: PathBuf) -> Self {
        Self {
            lookup,
            cache_path,
            db_path,
        }
    }

    /// Build the enricher for `mode`, or `None` in [`EnrichMode::Skip`].
    pub fn for_mode(mode: &EnrichMode, config: &Config) -> EtlResult<Option<Self>> {
        let lookup: Box<dyn MovieLookup> = match mode {
            EnrichMode::Skip => return Ok(None),
            EnrichMode::Mock => {
                let mock = OmdbCache::load(&config.cache_path);
                log::info!(
                    "Running in mock-omdb mode; loaded mock cache ({} entries)",
                    mock.len()
                );
                Box::new(MockLookup::new(mock.snapshot()))
            }
            EnrichMode::Live { api_key } => {
                Box::new(OmdbClient::new(api_key.clone(), config.omdb_max_retries)?)
            }
        };

        Ok(Some(Self::new(
            lookup,
            config.cache_path.clone(),
            config.database_path.clone(),
        )))
    }

    /// Enrich every movie in the catalog.
    ///
    /// The cache is saved after every miss so an interrupted run keeps
    /// what it fetched.
    pub async fn run(&self) -> EtlResult<EnrichSummary> {
        let mut cache = OmdbCache::load(&self.cache_path);
        let movies = {
            let db = Database::open(&self.db_path)?;
            db.list_movies()?
        };
        let mut summary = EnrichSummary::default();

        for movie in &movies {
            let title = movie.title.as_deref();
            let key = cache_key(title, movie.year);

            let response = if let Some(cached) = cache.get(&key) {
                summary.cache_hits += 1;
                cached.clone()
            } else {
                let fetched = match self
                    .lookup
                    .lookup(title.unwrap_or("None"), movie.year)
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        log::warn!(
                            "OMDb request failed for {} ({}): {}",
                            title.unwrap_or("None"),
                            movie.year.map_or_else(|| "None".to_string(), |y| y.to_string()),
                            e
                        );
                        Value::Null
                    }
                };
                cache.insert(key, fetched.clone());
                summary.cache_misses += 1;
                cache.save()?;
                fetched
            };

            if let Some(enriched) = to_enriched(movie, &response)? {
                self.store(&enriched)?;
                summary.processed += 1;
            }
        }

        cache.save()?;
        log::info!(
            "Enrichment done. Processed:{} cache_hits:{} cache_misses:{}",
            summary.processed,
            summary.cache_hits,
            summary.cache_misses
        );
        Ok(summary)
    }

    /// Write one enriched row. The connection lives only for this call, so
    /// none is open while a lookup is awaited.
    fn store(&self, enriched: &EnrichedMovie) -> EtlResult<()> {
        let db = Database::open(&self.db_path)?;
        db.upsert_enriched(enriched)?;
        Ok(())
    }
}

/// The Enrich stage: a no-op when enrichment is disabled.
#[derive(Debug)]
pub struct EnrichStage {
    enricher: Option<Enricher>,
}

impl EnrichStage {
    pub fn new(config: &Config, mode: &EnrichMode) -> EtlResult<Self> {
        Ok(Self {
            enricher: Enricher::for_mode(mode, config)?,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enricher.is_some()
    }
}

#[async_trait::async_trait]
impl Stage for EnrichStage {
    fn name(&self) -> &str {
        "enrich"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        let Some(enricher) = &self.enricher else {
            log::info!("Skipping enrichment (no OMDb key and not mock mode)");
            return Ok(StageOutcome::Complete);
        };

        enricher.run().await.map_err(|e| {
            treadle::TreadleError::StageExecution(format!("Enrichment failed: {e}"))
        })?;
        Ok(StageOutcome::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::model::Movie;
    use marquee_core::CatalogTable;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::error::EtlError;

    /// Answers every lookup with a fixed director and counts the calls.
    #[derive(Debug, Default)]
    struct CountingLookup {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl MovieLookup for CountingLookup {
        async fn lookup(&self, title: &str, _year: Option<i64>) -> EtlResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if title.starts_with("Unknown") {
                return Ok(json!({"Response": "False", "Error": "Movie not found!"}));
            }
            Ok(json!({"Director": "Somebody", "imdbRating": "7.5", "Response": "True"}))
        }
    }

    #[derive(Debug)]
    struct FailingLookup;

    #[async_trait::async_trait]
    impl MovieLookup for FailingLookup {
        async fn lookup(&self, _title: &str, _year: Option<i64>) -> EtlResult<Value> {
            Err(EtlError::Http {
                source_name: "OMDb".to_string(),
                status: 500,
                message: "Internal Server Error".to_string(),
            })
        }
    }

    /// Re-creates the catalog file during its first lookup, the way a
    /// concurrent `marquee init` would.
    #[derive(Debug)]
    struct ReinitializingLookup {
        db_path: PathBuf,
        done: AtomicBool,
    }

    #[async_trait::async_trait]
    impl MovieLookup for ReinitializingLookup {
        async fn lookup(&self, _title: &str, _year: Option<i64>) -> EtlResult<Value> {
            if !self.done.swap(true, Ordering::SeqCst) {
                std::fs::remove_file(&self.db_path).unwrap();
                Database::open(&self.db_path).unwrap().apply_schema().unwrap();
            }
            Ok(json!({"Director": "Somebody", "imdbRating": "7.5", "Response": "True"}))
        }
    }

    fn seeded_catalog(dir: &TempDir) -> PathBuf {
        let db_path = dir.path().join("movies.db");
        let db = Database::open(&db_path).unwrap();
        db.apply_schema().unwrap();
        db.upsert_movies(&[
            Movie::new(1, "Toy Story (1995)").with_year(1995),
            Movie::new(2, "Unknown Film (2003)").with_year(2003),
        ])
        .unwrap();
        db_path
    }

    #[test]
    fn test_resolve_mode() {
        let key = || Some("k".to_string());
        assert_eq!(EnrichMode::resolve(None, key(), false, false), EnrichMode::Skip);
        assert_eq!(
            EnrichMode::resolve(None, key(), true, false),
            EnrichMode::Live {
                api_key: "k".to_string()
            }
        );
        assert_eq!(
            EnrichMode::resolve(Some("cli".to_string()), None, false, false),
            EnrichMode::Live {
                api_key: "cli".to_string()
            }
        );
        assert_eq!(EnrichMode::resolve(None, None, true, false), EnrichMode::Skip);
        assert_eq!(
            EnrichMode::resolve(Some("cli".to_string()), key(), true, true),
            EnrichMode::Mock
        );
    }

    #[tokio::test]
    async fn test_enricher_populates_and_caches() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = seeded_catalog(&temp_dir);
        let cache_path = temp_dir.path().join("omdb_cache.json");
        let calls = Arc::new(AtomicUsize::new(0));

        let enricher = Enricher::new(
            Box::new(CountingLookup {
                calls: Arc::clone(&calls),
            }),
            cache_path.clone(),
            db_path.clone(),
        );

        let first = enricher.run().await.unwrap();
        assert_eq!(
            first,
            EnrichSummary {
                processed: 1,
                cache_hits: 0,
                cache_misses: 2,
            }
        );

        let db = Database::open(&db_path).unwrap();
        let toy_story = db.get_enriched(1).unwrap().unwrap();
        assert_eq!(toy_story.director.as_deref(), Some("Somebody"));
        assert_eq!(toy_story.imdb_rating, Some(7.5));
        assert!(db.get_enriched(2).unwrap().is_none());

        // The second pass is served entirely from the cache.
        let second = enricher.run().await.unwrap();
        assert_eq!(second.cache_hits, 2);
        assert_eq!(second.cache_misses, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(db.count_rows(CatalogTable::MoviesEnriched).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rows_land_in_the_catalog_present_at_write_time() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = seeded_catalog(&temp_dir);
        let cache_path = temp_dir.path().join("omdb_cache.json");

        let enricher = Enricher::new(
            Box::new(ReinitializingLookup {
                db_path: db_path.clone(),
                done: AtomicBool::new(false),
            }),
            cache_path,
            db_path.clone(),
        );
        let summary = enricher.run().await.unwrap();
        assert_eq!(summary.processed, 2);

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.count_rows(CatalogTable::Movies).unwrap(), 0);
        assert_eq!(db.count_rows(CatalogTable::MoviesEnriched).unwrap(), 2);
        assert_eq!(
            db.get_enriched(1).unwrap().unwrap().director.as_deref(),
            Some("Somebody")
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_is_cached_as_null() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = seeded_catalog(&temp_dir);
        let cache_path = temp_dir.path().join("omdb_cache.json");

        let enricher = Enricher::new(Box::new(FailingLookup), cache_path.clone(), db_path);
        let summary = enricher.run().await.unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.cache_misses, 2);

        let cache = OmdbCache::load(&cache_path);
        assert_eq!(cache.get("Toy Story (1995)|1995"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_mock_mode_uses_cache_only() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = seeded_catalog(&temp_dir);
        let cache_path = temp_dir.path().join("omdb_cache.json");

        let mut cache = OmdbCache::load(&cache_path);
        cache.insert(
            "Toy Story (1995)|1995".to_string(),
            json!({"Director": "John Lasseter", "imdbRating": "8.3", "Response": "True"}),
        );
        cache.save().unwrap();

        let config = Config {
            database_path: db_path.clone(),
            cache_path: cache_path.clone(),
            ..Config::default()
        };
        let stage = EnrichStage::new(&config, &EnrichMode::Mock).unwrap();
        assert!(stage.is_enabled());

        let summary = stage.enricher.as_ref().unwrap().run().await.unwrap();
        assert_eq!(
            summary,
            EnrichSummary {
                processed: 1,
                cache_hits: 1,
                cache_misses: 1,
            }
        );

        let db = Database::open(&db_path).unwrap();
        assert_eq!(db.top_rated().unwrap()[0].imdb_rating, Some(8.3));
        assert_eq!(
            OmdbCache::load(&cache_path).get("Unknown Film (2003)|2003"),
            Some(&Value::Null)
        );
    }

    #[test]
    fn test_skip_mode_has_no_enricher() {
        let stage = EnrichStage::new(&Config::default(), &EnrichMode::Skip).unwrap();
        assert!(!stage.is_enabled());
    }
}
