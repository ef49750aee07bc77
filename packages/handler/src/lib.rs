#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point for a scrape run.
//!
//! [`handle`] takes a loosely typed request payload, runs the requested
//! scraper, writes the result envelope as JSON, offers it to the database
//! store and answers with a [`HandlerResponse`]. It never returns an error:
//! bad requests and failed first pages become `{"status": "error"}`
//! responses.

pub mod config;
pub mod request;

use rc_scrape_models::{HandlerResponse, ScrapeEnvelope, ScrapeKind};
use rc_scrape_scraper::{PageFetcher, ScrapeError};
use rc_scrape_sites::events::{EventsConfig, scrape_events_or_ajax};
use rc_scrape_sites::progress::ProgressCallback;
use rc_scrape_sites::setups::{SetupsConfig, scrape_setups};
use rc_scrape_sites::tracks::{TrackListConfig, scrape_tracks_with_details};
use rc_scrape_store::paths::result_file_name;
use rc_scrape_store::{ResultStore, ResultWriter};
use serde::Serialize;
use serde_json::Value;

pub use config::{ConfigError, RunConfig};
pub use request::ScrapeRequest;

/// Where a run's results go and how its progress is shown.
pub struct Sinks<'a> {
    pub writer: &'a dyn ResultWriter,
    pub store: &'a dyn ResultStore,
    pub progress: &'a dyn ProgressCallback,
}

/// A finished scrape, serialized.
struct Outcome {
    envelope: Value,
    items_count: usize,
}

fn outcome<T: Serialize>(
    req: &ScrapeRequest,
    scraped_at: i64,
    items: Vec<T>,
) -> Result<Outcome, ScrapeError> {
    let envelope = ScrapeEnvelope::new(&req.target_id, req.kind, &req.base_url, scraped_at, items);
    Ok(Outcome {
        items_count: envelope.items_count,
        envelope: serde_json::to_value(&envelope)?,
    })
}

async fn run_scrape<F: PageFetcher + ?Sized>(
    fetcher: &F,
    req: &ScrapeRequest,
    scraped_at: i64,
    progress: &dyn ProgressCallback,
) -> Result<Outcome, ScrapeError> {
    match req.kind {
        ScrapeKind::Tracks => {
            let config = TrackListConfig {
                max_pages: req.max_pages,
                max_tracks: req.max_tracks,
                ..TrackListConfig::new(&req.base_url)
            };
            let tracks = scrape_tracks_with_details(fetcher, &config, progress).await?;
            outcome(req, scraped_at, tracks)
        }
        ScrapeKind::Setups => {
            let config = SetupsConfig::new(&req.base_url);
            let brands = scrape_setups(fetcher, &config, progress).await?;
            outcome(req, scraped_at, brands)
        }
        ScrapeKind::Events => {
            let config = EventsConfig {
                since: req.events_since.as_deref(),
                max_pages: req.max_pages,
                ..EventsConfig::new(&req.base_url)
            };
            let events = scrape_events_or_ajax(fetcher, &config).await?;
            outcome(req, scraped_at, events)
        }
    }
}

/// Runs the scrape described by `payload` and persists its result.
///
/// `defaults` fills request fields the payload leaves out.
pub async fn handle<F: PageFetcher + ?Sized>(
    fetcher: &F,
    payload: &Value,
    defaults: &RunConfig,
    sinks: &Sinks<'_>,
) -> HandlerResponse {
    log::info!("handler invoked with event: {payload}");

    let req = match ScrapeRequest::parse(payload, defaults) {
        Ok(req) => req,
        Err(e) => {
            log::error!("{e}");
            return HandlerResponse::error(e.to_string());
        }
    };

    let scraped_at = chrono::Utc::now().timestamp();

    let outcome = match run_scrape(fetcher, &req, scraped_at, sinks.progress).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("{} scrape of {} failed: {e}", req.kind, req.base_url);
            return HandlerResponse::error(format!("{} scrape failed: {e}", req.kind));
        }
    };
    log::info!(
        "Found {} {} at {} (max_tracks={:?})",
        outcome.items_count,
        req.kind,
        req.base_url,
        req.max_tracks.get(),
    );

    let filename = result_file_name(req.kind.as_ref(), &req.target_id, scraped_at);
    let file = match sinks.writer.write_json(&outcome.envelope, &filename) {
        Ok(path) => path.display().to_string(),
        Err(e) => {
            log::error!("Failed to write {filename}: {e}");
            String::new()
        }
    };

    let db_saved = sinks.store.save(&outcome.envelope);

    HandlerResponse::Ok {
        target_id: req.target_id,
        file,
        items_count: outcome.items_count,
        db_saved,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use rc_scrape_scraper::StaticFetcher;
    use rc_scrape_sites::progress::NullProgress;
    use rc_scrape_store::{NoopStore, StoreError};
    use serde_json::json;

    use super::*;

    /// Keeps written documents in memory.
    #[derive(Default)]
    struct MemoryWriter {
        written: Mutex<Vec<(String, Value)>>,
        fail: bool,
    }

    impl ResultWriter for MemoryWriter {
        fn write_json(&self, value: &Value, filename: &str) -> Result<PathBuf, StoreError> {
            if self.fail {
                return Err(StoreError::Io {
                    path: filename.to_owned(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.written
                .lock()
                .unwrap()
                .push((filename.to_owned(), value.clone()));
            Ok(PathBuf::from("/tmp").join(filename))
        }
    }

    const LANDING: &str = "https://live.liverc.com/";

    fn landing_fetcher() -> StaticFetcher {
        StaticFetcher::new()
            .with_html(
                LANDING,
                r#"<table class="track_list"><tbody>
                   <tr class="clickable-row" data-href="https://alpha.liverc.com/">
                     <td><a href="https://alpha.liverc.com/"><strong>Alpha Raceway</strong></a></td></tr>
                   <tr class="clickable-row" data-href="https://beta.liverc.com/">
                     <td><a href="https://beta.liverc.com/"><strong>Beta Speedway</strong></a></td></tr>
                   </tbody></table>"#,
            )
            .with_html(
                "https://alpha.liverc.com",
                "<h1>Alpha Raceway</h1><p>Phone: (555) 123-4567</p>",
            )
    }

    async fn run(fetcher: &StaticFetcher, payload: Value, writer: &MemoryWriter) -> HandlerResponse {
        let sinks = Sinks {
            writer,
            store: &NoopStore,
            progress: &NullProgress,
        };
        handle(fetcher, &payload, &RunConfig::default(), &sinks).await
    }

    #[tokio::test]
    async fn tracks_run_writes_envelope() {
        let writer = MemoryWriter::default();
        let response = run(
            &landing_fetcher(),
            json!({ "target_id": 1, "base_url": LANDING }),
            &writer,
        )
        .await;

        let HandlerResponse::Ok {
            target_id,
            file,
            items_count,
            db_saved,
        } = response
        else {
            panic!("expected ok response, got {response:?}");
        };
        assert_eq!(target_id, "1");
        assert_eq!(items_count, 2);
        assert!(!db_saved);

        let written = writer.written.lock().unwrap();
        let (filename, envelope) = &written[0];
        assert!(filename.starts_with("tracks_1_"));
        assert!(
            std::path::Path::new(filename)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        );
        assert_eq!(file, format!("/tmp/{filename}"));
        assert_eq!(envelope["kind"], "tracks");
        assert_eq!(envelope["items_count"], 2);
        assert_eq!(envelope["items"][0]["name"], "Alpha Raceway");
        assert_eq!(
            envelope["items"][1]["video_feed"],
            "https://beta.liverc.com/live/video/"
        );
    }

    #[tokio::test]
    async fn missing_target_id_is_an_error_response() {
        let writer = MemoryWriter::default();
        let fetcher = StaticFetcher::new();
        let response = run(&fetcher, json!({ "base_url": LANDING }), &writer).await;

        assert_eq!(
            response,
            HandlerResponse::error("Missing required param: target_id")
        );
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn unreachable_landing_page_is_an_error_response() {
        let writer = MemoryWriter::default();
        let response = run(&StaticFetcher::new(), json!({ "target_id": 1 }), &writer).await;

        let HandlerResponse::Error { message } = response else {
            panic!("expected error response");
        };
        assert!(message.starts_with("tracks scrape failed"), "{message}");
        assert!(writer.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_reports_empty_file() {
        let writer = MemoryWriter {
            fail: true,
            ..MemoryWriter::default()
        };
        let response = run(
            &landing_fetcher(),
            json!({ "target_id": "x", "max_tracks": "1" }),
            &writer,
        )
        .await;

        assert_eq!(
            response,
            HandlerResponse::Ok {
                target_id: "x".to_owned(),
                file: String::new(),
                items_count: 1,
                db_saved: false,
            }
        );
    }

    #[tokio::test]
    async fn events_fall_back_to_script_endpoint() {
        let events_url = "https://alpha.liverc.com/events/";
        let fetcher = StaticFetcher::new()
            .with_html(
                events_url,
                r#"<script>$('#t').DataTable({ ajax: '/events/data' });</script>"#,
            )
            .with_json(
                "https://alpha.liverc.com/events/data?page=1",
                r#"[{"title": "Round 1", "link": "/results/?p=view_event&id=1"}]"#,
            );
        let writer = MemoryWriter::default();
        let response = run(
            &fetcher,
            json!({ "target_id": 2, "kind": "events", "url": events_url, "max_pages": 2 }),
            &writer,
        )
        .await;

        assert!(response.is_ok(), "{response:?}");
        let written = writer.written.lock().unwrap();
        assert_eq!(written[0].1["items"][0]["title"], "Round 1");
        assert_eq!(written[0].1["kind"], "events");
    }

    #[tokio::test]
    async fn events_since_holds_when_every_row_is_older() {
        let events_url = "https://alpha.liverc.com/events/";
        let fetcher = StaticFetcher::new()
            .with_html(
                events_url,
                r#"<table id="events"><tbody>
                     <tr><td><a href="/e/9">Summer Series</a></td><td>2023-06-01</td></tr>
                   </tbody></table>
                   <script>$('#events').DataTable({ ajax: '/events/data' });</script>"#,
            )
            .with_json(
                "https://alpha.liverc.com/events/data?page=1",
                r#"[{"title": "Old Race", "link": "/e/1"}]"#,
            );
        let writer = MemoryWriter::default();
        let response = run(
            &fetcher,
            json!({
                "target_id": 3,
                "kind": "events",
                "url": events_url,
                "events_since": "2024-01-01",
            }),
            &writer,
        )
        .await;

        let HandlerResponse::Ok { items_count, .. } = response else {
            panic!("expected ok response, got {response:?}");
        };
        assert_eq!(items_count, 0);
        assert_eq!(writer.written.lock().unwrap()[0].1["items"], json!([]));
    }
}
