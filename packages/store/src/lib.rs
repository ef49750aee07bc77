#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistence for scrape results.
//!
//! Two seams are provided:
//!
//! - [`ResultWriter`] writes a run's JSON document to disk. The default
//!   [`JsonFileWriter`] writes to the system temp directory and mirrors a
//!   copy under `./scrape_results` for local inspection.
//! - [`ResultStore`] saves a run to a database. [`NoopStore`] is the only
//!   implementation and reports that nothing was saved.

pub mod paths;

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Errors that can occur while persisting results.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Writing a file or creating its directory failed.
    #[error("I/O error writing {path}: {source}")]
    Io {
        /// File or directory being written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes a run's JSON document under a file name.
pub trait ResultWriter: Send + Sync {
    /// Writes `value` as `filename` and returns the primary path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the primary file cannot be written.
    fn write_json(&self, value: &Value, filename: &str) -> Result<PathBuf, StoreError>;
}

/// Saves a run's JSON document to a database.
pub trait ResultStore: Send + Sync {
    /// Returns whether the document was saved.
    fn save(&self, value: &Value) -> bool;
}

/// [`ResultStore`] that saves nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

impl ResultStore for NoopStore {
    fn save(&self, _value: &Value) -> bool {
        log::debug!("No database configured; result not saved");
        false
    }
}

/// [`ResultWriter`] writing pretty-printed JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileWriter {
    primary_dir: PathBuf,
    mirror_dir: Option<PathBuf>,
}

impl Default for JsonFileWriter {
    fn default() -> Self {
        Self {
            primary_dir: paths::primary_dir(),
            mirror_dir: Some(paths::mirror_dir()),
        }
    }
}

impl JsonFileWriter {
    /// Writer with the temp directory as primary and `./scrape_results` as
    /// mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the primary directory.
    #[must_use]
    pub fn with_primary_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.primary_dir = dir.into();
        self
    }

    /// Replaces the mirror directory. `None` disables mirroring.
    #[must_use]
    pub fn with_mirror_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.mirror_dir = dir;
        self
    }

    fn write_to(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let path = dir.join(filename);
        let tmp_path = dir.join(format!("{filename}.tmp"));
        std::fs::write(&tmp_path, contents)
            .and_then(|()| std::fs::rename(&tmp_path, &path))
            .map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;

        Ok(path)
    }
}

impl ResultWriter for JsonFileWriter {
    fn write_json(&self, value: &Value, filename: &str) -> Result<PathBuf, StoreError> {
        let contents = serde_json::to_string_pretty(value)?;

        let path = Self::write_to(&self.primary_dir, filename, &contents)?;
        log::info!("Wrote JSON to {}", path.display());

        if let Some(mirror) = &self.mirror_dir {
            match Self::write_to(mirror, filename, &contents) {
                Ok(copy) => log::info!("Wrote local JSON copy to {}", copy.display()),
                Err(e) => log::warn!("Failed to write local JSON copy: {e}"),
            }
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rc_scrape_store_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_primary_and_mirror_copies() {
        let root = scratch_dir("both");
        let writer = JsonFileWriter::new()
            .with_primary_dir(root.join("tmp"))
            .with_mirror_dir(Some(root.join("mirror")));

        let value = json!({ "items_count": 1, "items": [{ "name": "Örebro RC" }] });
        let path = writer.write_json(&value, "tracks_1_10.json").unwrap();

        assert_eq!(path, root.join("tmp").join("tracks_1_10.json"));
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, value);
        assert!(root.join("mirror").join("tracks_1_10.json").exists());
        assert!(!root.join("tmp").join("tracks_1_10.json.tmp").exists());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn mirror_failure_does_not_fail_the_write() {
        let root = scratch_dir("mirror_fail");
        std::fs::create_dir_all(&root).unwrap();
        // A regular file where the mirror directory should be.
        let blocker = root.join("blocked");
        std::fs::write(&blocker, "x").unwrap();

        let writer = JsonFileWriter::new()
            .with_primary_dir(root.join("tmp"))
            .with_mirror_dir(Some(blocker));

        assert!(writer.write_json(&json!([]), "events_2_20.json").is_ok());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn primary_failure_is_an_error() {
        let root = scratch_dir("primary_fail");
        std::fs::create_dir_all(&root).unwrap();
        let blocker = root.join("blocked");
        std::fs::write(&blocker, "x").unwrap();

        let writer = JsonFileWriter::new()
            .with_primary_dir(blocker)
            .with_mirror_dir(None);

        let err = writer.write_json(&json!({}), "x.json").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn noop_store_saves_nothing() {
        assert!(!NoopStore.save(&json!({ "items": [] })));
    }
}
