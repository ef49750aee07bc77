//! Subcommand implementations.

use rc_scrape_cli_utils::{MultiProgress, PageKind, PageProgress};
use rc_scrape_handler::{RunConfig, Sinks, handle};
use rc_scrape_scraper::{HttpFetcher, ItemLimit};
use rc_scrape_sites::events::{
    EventsConfig, scrape_event_entries, scrape_events_or_ajax, scrape_events_via_ajax,
    scrape_events_with_browser,
};
use rc_scrape_sites::setups::{SetupsConfig, scrape_setups};
use rc_scrape_sites::track_details::scrape_track_details;
use rc_scrape_sites::tracks::{TrackListConfig, scrape_tracks, scrape_tracks_with_details};
use rc_scrape_store::NoopStore;
use serde::Serialize;
use serde_json::{Map, Value};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn print_json<T: Serialize + ?Sized>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Builds a handler payload from `run` flags. Absent flags are left out so
/// the run file can supply them.
pub fn run_payload(
    target_id: &str,
    kind: &str,
    base_url: Option<&str>,
    max_pages: Option<u32>,
    max_tracks: Option<i64>,
    events_since: Option<&str>,
) -> Value {
    let mut payload = Map::new();
    payload.insert("target_id".to_owned(), target_id.into());
    payload.insert("kind".to_owned(), kind.into());
    if let Some(url) = base_url {
        payload.insert("base_url".to_owned(), url.into());
    }
    if let Some(n) = max_pages {
        payload.insert("max_pages".to_owned(), n.into());
    }
    if let Some(n) = max_tracks {
        // Zero means "no limit" on the command line.
        let n = if n <= 0 { -1 } else { n };
        payload.insert("max_tracks".to_owned(), n.into());
    }
    if let Some(since) = events_since {
        payload.insert("events_since".to_owned(), since.into());
    }
    Value::Object(payload)
}

/// Runs the handler and prints its response.
pub async fn run(
    fetcher: &HttpFetcher,
    payload: &Value,
    config: &RunConfig,
    multi: &MultiProgress,
) -> CommandResult {
    let progress = PageProgress::pages_bar(multi, PageKind::Any);
    let writer = config.writer();
    let sinks = Sinks {
        writer: &writer,
        store: &NoopStore,
        progress: progress.as_ref(),
    };

    let response = handle(fetcher, payload, config, &sinks).await;
    print_json(&response)?;

    if response.is_ok() {
        Ok(())
    } else {
        Err("scrape failed".into())
    }
}

pub async fn tracks(
    fetcher: &HttpFetcher,
    base_url: &str,
    max_pages: Option<u32>,
    max_tracks: Option<i64>,
    details: bool,
    multi: &MultiProgress,
) -> CommandResult {
    let mut config = TrackListConfig::new(base_url);
    if let Some(n) = max_pages {
        config.max_pages = n;
    }
    config.max_tracks = ItemLimit::from_signed(max_tracks);

    if details {
        let progress = PageProgress::pages_bar(multi, PageKind::TrackSites);
        let tracks = scrape_tracks_with_details(fetcher, &config, progress.as_ref()).await?;
        print_json(&tracks)
    } else {
        let rows = scrape_tracks(fetcher, &config).await?;
        print_json(&rows)
    }
}

pub async fn track(fetcher: &HttpFetcher, url: &str) -> CommandResult {
    let details = scrape_track_details(fetcher, url, "track").await;
    print_json(&details)
}

pub async fn setups(
    fetcher: &HttpFetcher,
    url: &str,
    max_vehicles: usize,
    multi: &MultiProgress,
) -> CommandResult {
    let config = SetupsConfig {
        max_vehicles_per_brand: max_vehicles,
        ..SetupsConfig::new(url)
    };
    let progress = PageProgress::pages_bar(multi, PageKind::VehiclePages);
    let brands = scrape_setups(fetcher, &config, progress.as_ref()).await?;
    print_json(&brands)
}

/// How the events listing is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventsMode {
    /// `table#events`, falling back to the script endpoint when it has no rows.
    Table,
    /// The script endpoint only.
    Ajax,
    /// Browser rendering.
    Browser,
}

pub async fn events(
    fetcher: &HttpFetcher,
    url: &str,
    since: Option<&str>,
    max_pages: u32,
    mode: EventsMode,
) -> CommandResult {
    let config = EventsConfig {
        since,
        max_pages,
        ..EventsConfig::new(url)
    };

    let events = match mode {
        EventsMode::Browser => scrape_events_with_browser(url)?,
        EventsMode::Ajax => {
            scrape_events_via_ajax(fetcher, url, None, max_pages, config.label).await
        }
        EventsMode::Table => scrape_events_or_ajax(fetcher, &config).await?,
    };
    print_json(&events)
}

pub async fn entries(fetcher: &HttpFetcher, title: &str, url: &str) -> CommandResult {
    let entries = scrape_event_entries(fetcher, title, url, "entries").await?;
    print_json(&entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_payload_omits_absent_flags() {
        let payload = run_payload("1", "tracks", None, None, None, None);
        assert_eq!(payload, serde_json::json!({ "target_id": "1", "kind": "tracks" }));
    }

    #[test]
    fn zero_max_tracks_means_no_limit() {
        let payload = run_payload("1", "tracks", None, Some(3), Some(0), Some("2024-01-01"));
        assert_eq!(payload["max_tracks"], -1);
        assert_eq!(payload["max_pages"], 3);
        assert_eq!(payload["events_since"], "2024-01-01");
    }
}
