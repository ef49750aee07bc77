//! Run configuration.
//!
//! A run file is an optional TOML document supplying defaults for every
//! request of a run and the HTTP client settings:
//!
//! ```toml
//! base_url = "https://live.liverc.com/"
//! max_pages = 5
//! max_tracks = 50
//! timeout_secs = 15
//! user_agent = "rc_scrape/0.1"
//! delay_ms = 250
//! output_dir = "/tmp/rc"
//! mirror_dir = "scrape_results"
//! ```
//!
//! Values given in the request payload win over the run file, and CLI
//! flags win over both.

use std::path::{Path, PathBuf};

use rc_scrape_scraper::ClientConfig;
use rc_scrape_store::JsonFileWriter;
use serde::Deserialize;

/// Errors raised while reading a request or a run file. Always fatal: the
/// handler answers with an error response before fetching anything.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required request field is absent.
    #[error("Missing required param: {0}")]
    MissingParam(&'static str),

    /// A request field has an unusable value.
    #[error("Invalid param {name}: {message}")]
    InvalidParam {
        /// Field name.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The run file is not valid TOML or has unknown keys.
    #[error("Invalid run file: {0}")]
    Toml(#[from] toml::de::Error),

    /// The run file could not be read.
    #[error("Failed to read run file: {0}")]
    Io(#[from] std::io::Error),
}

/// Defaults and client settings for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub base_url: Option<String>,
    pub max_pages: Option<u32>,
    /// Negative means unlimited.
    pub max_tracks: Option<i64>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub delay_ms: Option<u64>,
    /// Primary directory for result files (default: system temp dir).
    pub output_dir: Option<PathBuf>,
    /// Mirror directory for result files (default: `./scrape_results`).
    pub mirror_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Parses a run file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on malformed TOML or unknown keys.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads and parses the run file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Toml`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded run file {}", path.display());
        Ok(config)
    }

    /// Layers `overrides` on top of `self`; every value set in `overrides`
    /// wins.
    #[must_use]
    pub fn merged_with(self, overrides: Self) -> Self {
        Self {
            base_url: overrides.base_url.or(self.base_url),
            max_pages: overrides.max_pages.or(self.max_pages),
            max_tracks: overrides.max_tracks.or(self.max_tracks),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            user_agent: overrides.user_agent.or(self.user_agent),
            delay_ms: overrides.delay_ms.or(self.delay_ms),
            output_dir: overrides.output_dir.or(self.output_dir),
            mirror_dir: overrides.mirror_dir.or(self.mirror_dir),
        }
    }

    /// HTTP client settings for this run.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::new();
        if let Some(secs) = self.timeout_secs {
            client = client.with_timeout_secs(secs);
        }
        if let Some(ms) = self.delay_ms {
            client = client.with_delay_ms(ms);
        }
        if let Some(agent) = &self.user_agent {
            client = client.with_user_agent(agent);
        }
        client
    }

    /// Result file writer for this run.
    #[must_use]
    pub fn writer(&self) -> JsonFileWriter {
        let mut writer = JsonFileWriter::new();
        if let Some(dir) = &self.output_dir {
            writer = writer.with_primary_dir(dir.clone());
        }
        if let Some(dir) = &self.mirror_dir {
            writer = writer.with_mirror_dir(Some(dir.clone()));
        }
        writer
    }
}
