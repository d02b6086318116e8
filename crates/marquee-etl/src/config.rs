use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable the OMDb key is read from when it is not configured.
pub const OMDB_KEY_ENV: &str = "OMDB_API_KEY";

/// Configuration for marquee.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (MARQUEE_* prefix)
/// 3. Config file (~/.config/marquee/config.toml)
/// 4. Built-in defaults (lowest priority)
///
/// Relative paths are resolved against the working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// OMDb API key (required for live enrichment).
    ///
    /// Can be set via:
    /// - CLI: --omdb-key KEY
    /// - ENV: MARQUEE_OMDB_API_KEY, or OMDB_API_KEY (also read from .env)
    /// - Config: omdb_api_key = "..."
    pub omdb_api_key: Option<String>,

    /// Path to the SQLite catalog.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: MARQUEE_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: movies.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Directory holding movies.csv and ratings.csv.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// JSON file caching OMDb responses between runs.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Directory the top-10 export is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File every run appends its log lines to.
    #[serde(default = "default_run_log_path")]
    pub run_log_path: PathBuf,

    /// Retries for a failed OMDb request before it is recorded as a miss.
    #[serde(default = "default_omdb_max_retries")]
    pub omdb_max_retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            omdb_api_key: None,
            database_path: default_db_path(),
            data_dir: default_data_dir(),
            cache_path: default_cache_path(),
            output_dir: default_output_dir(),
            run_log_path: default_run_log_path(),
            omdb_max_retries: default_omdb_max_retries(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/marquee/config.toml
    /// Reads environment variables with MARQUEE_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("marquee");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    /// The configured OMDb key, falling back to `OMDB_API_KEY`.
    pub fn omdb_key(&self) -> Option<String> {
        self.omdb_api_key
            .clone()
            .or_else(|| std::env::var(OMDB_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Where the pipeline's treadle state store lives, next to the catalog.
    pub fn pipeline_state_path(&self) -> PathBuf {
        self.database_path.with_file_name("pipeline.db")
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("movies.db")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("ml-latest-small")
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("omdb_cache.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("sample_output")
}

fn default_run_log_path() -> PathBuf {
    PathBuf::from("run_log.txt")
}

const fn default_omdb_max_retries() -> usize {
    2
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/marquee/config.toml
/// - macOS: ~/Library/Application Support/marquee/config.toml
/// - Windows: %APPDATA%\marquee\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marquee")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Marquee Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (MARQUEE_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# OMDb API key for enrichment
#
# Request a key at: https://www.omdbapi.com/apikey.aspx
#
# Can also be set via:
# - Environment: MARQUEE_OMDB_API_KEY=your-key or OMDB_API_KEY=your-key
# - A .env file in the working directory containing OMDB_API_KEY
#omdb_api_key = "your-omdb-api-key-here"

# Path to the SQLite catalog
#database_path = "movies.db"

# Directory containing the MovieLens movies.csv and ratings.csv
#data_dir = "ml-latest-small"

# OMDb response cache (also the source of data in --mock-omdb mode)
#cache_path = "omdb_cache.json"

# Where top10_enriched.csv is written
#output_dir = "sample_output"

# Run log appended to by every run
#run_log_path = "run_log.txt"

# Retries for transient OMDb failures
#omdb_max_retries = 2
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database_path, PathBuf::from("movies.db"));
        assert_eq!(config.data_dir, PathBuf::from("ml-latest-small"));
        assert_eq!(config.cache_path, PathBuf::from("omdb_cache.json"));
        assert_eq!(config.omdb_max_retries, 2);
        assert!(config.omdb_api_key.is_none());
    }

    #[test]
    fn test_config_load() {
        // Should not fail even if config file doesn't exist
        let result = Config::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_with_custom_db_path() {
        let custom_path = PathBuf::from("/tmp/test.db");
        let config = Config::load_with_db_path(custom_path.clone());
        assert!(config.is_ok());
        assert_eq!(config.unwrap().database_path, custom_path);
    }

    #[test]
    fn test_configured_key_wins_over_env() {
        let config = Config {
            omdb_api_key: Some("from-config".to_string()),
            ..Config::default()
        };
        assert_eq!(config.omdb_key().as_deref(), Some("from-config"));
    }

    #[test]
    fn test_blank_key_is_ignored() {
        let config = Config {
            omdb_api_key: Some("  ".to_string()),
            ..Config::default()
        };
        // A blank configured key falls through the filter entirely.
        assert_ne!(config.omdb_key().as_deref(), Some("  "));
    }

    #[test]
    fn test_pipeline_state_path_sits_next_to_db() {
        let config = Config::load_with_db_path(PathBuf::from("/data/movies.db")).unwrap();
        assert_eq!(
            config.pipeline_state_path(),
            PathBuf::from("/data/pipeline.db")
        );
    }

    #[test]
    fn test_example_config_only_documents_defaults() {
        // Every setting in the example is commented out.
        assert!(example_config()
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#')));
    }
}
