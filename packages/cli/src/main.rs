#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line runner for the rc_scrape scrapers.
//!
//! `rc_scrape run` goes through the same entry point a hosted invocation
//! uses (request parsing, JSON result file, response envelope). The other
//! subcommands call one scraper directly and print its records as JSON.
//!
//! Logging goes through `indicatif-log-bridge` (via
//! [`rc_scrape_cli_utils::init_logger`]) so log lines and progress bars
//! share the terminal. Set `RUST_LOG=info` for progress messages.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rc_scrape_handler::RunConfig;
use rc_scrape_scraper::HttpFetcher;

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Scrape RC racing tracks, setup sheets and events.
#[derive(Parser)]
#[command(name = "rc_scrape")]
#[command(about = "Scrape RC racing tracks, setup sheets and events")]
struct Cli {
    /// TOML run file with defaults and client settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    client: ClientArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// HTTP and output settings; each overrides the run file.
#[derive(Args)]
struct ClientArgs {
    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// `User-Agent` header value.
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Delay before each request, in milliseconds.
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// Primary directory for result files.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Mirror directory for result files.
    #[arg(long, global = true)]
    mirror_dir: Option<PathBuf>,
}

impl ClientArgs {
    fn into_run_config(self) -> RunConfig {
        RunConfig {
            timeout_secs: self.timeout_secs,
            user_agent: self.user_agent,
            delay_ms: self.delay_ms,
            output_dir: self.output_dir,
            mirror_dir: self.mirror_dir,
            ..RunConfig::default()
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run a full scrape and write its result file, like a hosted invocation.
    Run {
        /// Identifier recorded in the result file name.
        #[arg(long, default_value = "1")]
        target_id: String,

        /// What to scrape: tracks, setups or events.
        #[arg(long, default_value = "tracks")]
        kind: String,

        /// Page to start from.
        #[arg(long)]
        base_url: Option<String>,

        /// Page ceiling for paginated listings.
        #[arg(long)]
        max_pages: Option<u32>,

        /// Cap on tracks; zero or negative means no limit.
        #[arg(long, allow_negative_numbers = true)]
        max_tracks: Option<i64>,

        /// Only keep events on or after this `YYYY-MM-DD` date.
        #[arg(long)]
        events_since: Option<String>,
    },

    /// List tracks from the LiveRC landing page.
    Tracks {
        /// Landing page URL.
        #[arg(long, default_value = rc_scrape_sites::tracks::DEFAULT_BASE_URL)]
        base_url: String,

        /// Page ceiling.
        #[arg(long)]
        max_pages: Option<u32>,

        /// Cap on tracks; negative means no limit.
        #[arg(long, allow_negative_numbers = true)]
        max_tracks: Option<i64>,

        /// Also visit every track site for contact details.
        #[arg(long)]
        details: bool,
    },

    /// Read contact details from one track site.
    Track {
        /// Track site URL.
        url: String,
    },

    /// Read brands, vehicles and setups from a setup index page.
    Setups {
        /// Setup index URL.
        url: String,

        /// Vehicle pages visited per brand.
        #[arg(long, default_value_t = rc_scrape_sites::setups::DEFAULT_MAX_VEHICLES_PER_BRAND)]
        max_vehicles: usize,
    },

    /// List events from a track's events page.
    Events {
        /// Events page URL.
        url: String,

        /// Only keep events on or after this `YYYY-MM-DD` date.
        #[arg(long)]
        since: Option<String>,

        /// Highest listing page followed.
        #[arg(long, default_value_t = rc_scrape_sites::events::DEFAULT_MAX_PAGES)]
        max_pages: u32,

        /// Read the listing from its script endpoint instead of the table.
        #[arg(long, conflicts_with = "browser")]
        ajax: bool,

        /// Render the page in a browser (not available).
        #[arg(long)]
        browser: bool,
    },

    /// Read the entry list of one event.
    Entries {
        /// Event page URL.
        url: String,

        /// Event title recorded in the result.
        #[arg(long, default_value = "")]
        title: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = rc_scrape_cli_utils::init_logger();
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    let run_config = file_config.merged_with(cli.client.into_run_config());
    let fetcher = HttpFetcher::new(&run_config.client_config())?;

    match cli.command {
        Commands::Run {
            target_id,
            kind,
            base_url,
            max_pages,
            max_tracks,
            events_since,
        } => {
            let payload = commands::run_payload(
                &target_id,
                &kind,
                base_url.as_deref(),
                max_pages,
                max_tracks,
                events_since.as_deref(),
            );
            commands::run(&fetcher, &payload, &run_config, &multi).await?;
        }
        Commands::Tracks {
            base_url,
            max_pages,
            max_tracks,
            details,
        } => {
            let max_pages = max_pages.or(run_config.max_pages);
            let max_tracks = max_tracks.or(run_config.max_tracks);
            commands::tracks(&fetcher, &base_url, max_pages, max_tracks, details, &multi).await?;
        }
        Commands::Track { url } => commands::track(&fetcher, &url).await?,
        Commands::Setups { url, max_vehicles } => {
            commands::setups(&fetcher, &url, max_vehicles, &multi).await?;
        }
        Commands::Events {
            url,
            since,
            max_pages,
            ajax,
            browser,
        } => {
            let mode = if browser {
                commands::EventsMode::Browser
            } else if ajax {
                commands::EventsMode::Ajax
            } else {
                commands::EventsMode::Table
            };
            commands::events(&fetcher, &url, since.as_deref(), max_pages, mode).await?;
        }
        Commands::Entries { url, title } => commands::entries(&fetcher, &title, &url).await?,
    }

    Ok(())
}
