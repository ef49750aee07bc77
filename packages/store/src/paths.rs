#![allow(clippy::module_name_repetitions)]
//! Default locations for result files.

use std::path::PathBuf;

/// Name of the local mirror directory, relative to the working directory.
pub const MIRROR_DIR_NAME: &str = "scrape_results";

/// Returns the primary output directory: the system temp directory.
#[must_use]
pub fn primary_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Returns the mirror directory, `./scrape_results`.
///
/// Falls back to a relative path if the working directory is unavailable.
#[must_use]
pub fn mirror_dir() -> PathBuf {
    std::env::current_dir()
        .map(|cwd| cwd.join(MIRROR_DIR_NAME))
        .unwrap_or_else(|_| PathBuf::from(MIRROR_DIR_NAME))
}

/// Returns the file name for one run: `<kind>_<target_id>_<scraped_at>.json`.
///
/// Path separators in `target_id` are replaced so the name stays a single
/// path component.
#[must_use]
pub fn result_file_name(kind: &str, target_id: &str, scraped_at: i64) -> String {
    let target_id: String = target_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{kind}_{target_id}_{scraped_at}.json")
}
