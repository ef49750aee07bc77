//! Request payload parsing.
//!
//! The payload is loosely typed JSON:
//!
//! ```json
//! { "target_id": 1, "base_url": "https://live.liverc.com/", "max_pages": 20,
//!   "max_tracks": "50", "kind": "tracks", "events_since": "2024-01-01" }
//! ```

use std::str::FromStr;

use rc_scrape_models::ScrapeKind;
use rc_scrape_scraper::ItemLimit;
use rc_scrape_sites::tracks::{DEFAULT_BASE_URL, DEFAULT_MAX_PAGES};
use serde_json::{Map, Value, json};

use crate::config::{ConfigError, RunConfig};

/// A validated scrape request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub target_id: String,
    pub kind: ScrapeKind,
    pub base_url: String,
    pub max_pages: u32,
    pub max_tracks: ItemLimit,
    pub events_since: Option<String>,
}

fn non_empty_str<'v>(obj: &'v Map<String, Value>, key: &str) -> Option<&'v str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn target_id(obj: &Map<String, Value>) -> Result<String, ConfigError> {
    let value = ["target_id", "track_id"]
        .iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
        .ok_or(ConfigError::MissingParam("target_id"))?;

    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_owned()),
        Value::String(_) => Err(ConfigError::MissingParam("target_id")),
        other => Err(ConfigError::InvalidParam {
            name: "target_id",
            message: format!("expected a number or string, got {other}"),
        }),
    }
}

/// Reads an integer that may be sent as a JSON number or a digit string.
fn integer(obj: &Map<String, Value>, name: &'static str) -> Result<Option<i64>, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidParam { name, message };
    match obj.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(format!("{n} is not an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| invalid(format!("'{s}': {e}"))),
        Some(other) => Err(invalid(format!("expected a number, got {other}"))),
    }
}

impl ScrapeRequest {
    /// Parses a request payload, filling absent fields from `defaults` and
    /// then from built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingParam`] if `target_id` is absent and
    /// [`ConfigError::InvalidParam`] if a field has an unusable value.
    pub fn parse(payload: &Value, defaults: &RunConfig) -> Result<Self, ConfigError> {
        let Some(obj) = payload.as_object() else {
            return Err(ConfigError::InvalidParam {
                name: "event",
                message: "expected a JSON object".to_owned(),
            });
        };

        let target_id = target_id(obj)?;

        let kind = match non_empty_str(obj, "kind") {
            Some(raw) => ScrapeKind::from_str(raw).map_err(|_| ConfigError::InvalidParam {
                name: "kind",
                message: format!("unknown kind '{raw}' (expected tracks, setups or events)"),
            })?,
            None => ScrapeKind::default(),
        };

        let base_url = non_empty_str(obj, "base_url")
            .or_else(|| non_empty_str(obj, "url"))
            .map(ToOwned::to_owned)
            .or_else(|| defaults.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());

        let max_pages = match integer(obj, "max_pages")? {
            Some(n) => u32::try_from(n).map_err(|_| ConfigError::InvalidParam {
                name: "max_pages",
                message: format!("{n} is out of range"),
            })?,
            None => defaults.max_pages.unwrap_or(DEFAULT_MAX_PAGES),
        };

        let max_tracks =
            ItemLimit::from_signed(integer(obj, "max_tracks")?.or(defaults.max_tracks));

        let events_since = non_empty_str(obj, "events_since").map(ToOwned::to_owned);

        Ok(Self {
            target_id,
            kind,
            base_url,
            max_pages,
            max_tracks,
            events_since,
        })
    }

    /// The request as a payload accepted by [`Self::parse`].
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let max_tracks = self
            .max_tracks
            .get()
            .and_then(|n| i64::try_from(n).ok())
            .unwrap_or(-1);
        json!({
            "target_id": self.target_id,
            "kind": self.kind.to_string(),
            "base_url": self.base_url,
            "max_pages": self.max_pages,
            "max_tracks": max_tracks,
            "events_since": self.events_since,
        })
    }
}
