//! Page retrieval.
//!
//! [`PageFetcher`] is the only way extractors touch the network. The HTTP
//! implementation wraps a single shared [`reqwest::Client`]; the in-memory
//! [`StaticFetcher`] serves canned bodies for offline replay and tests.
//!
//! Fetchers return raw bodies rather than parsed documents because
//! [`scraper::Html`] is not `Send`. Callers parse, extract owned data, and
//! drop the document before awaiting the next request.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use scraper::Html;

use crate::FetchError;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 rc_scrape/0.1";

/// HTTP client settings shared by every request of a run.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Additional HTTP headers to include in requests.
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Delay in milliseconds before each request.
    pub delay_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    /// Creates a `ClientConfig` with a 10 second timeout and no delay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            headers: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            delay_ms: None,
        }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the delay before each request.
    #[must_use]
    pub const fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = Some(ms);
        self
    }

    /// Overrides the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        user_agent.clone_into(&mut self.user_agent);
        self
    }

    /// Adds an HTTP header to include in requests.
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_owned(), value.to_owned());
        self
    }
}

/// A successfully retrieved page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL the body was served from (after redirects).
    pub url: String,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Response body.
    pub body: String,
}

impl FetchedPage {
    /// Creates an HTML page.
    #[must_use]
    pub fn html(url: &str, body: &str) -> Self {
        Self {
            url: url.to_owned(),
            content_type: Some("text/html; charset=utf-8".to_owned()),
            body: body.to_owned(),
        }
    }

    /// Creates a JSON page.
    #[must_use]
    pub fn json(url: &str, body: &str) -> Self {
        Self {
            url: url.to_owned(),
            content_type: Some("application/json".to_owned()),
            body: body.to_owned(),
        }
    }

    /// Parses the body as an HTML document.
    #[must_use]
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Whether the server labelled the body as JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }
}

/// Retrieves pages by URL.
///
/// Implementations must not retry; callers decide whether to try an
/// alternate URL.
pub trait PageFetcher: Send + Sync {
    /// Fetches a single page.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on a transport failure or a non-2xx status.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

/// [`PageFetcher`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    delay_ms: Option<u64>,
}

impl HttpFetcher {
    /// Builds the underlying client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if a header is invalid or the client
    /// cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in &config.headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| FetchError::Client(format!("invalid header name '{key}': {e}")))?;
            let val = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| FetchError::Client(format!("invalid header value '{value}': {e}")))?;
            header_map.insert(name, val);
        }

        let client = reqwest::Client::builder()
            .default_headers(header_map)
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            delay_ms: config.delay_ms,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if let Some(ms) = self.delay_ms {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        log::debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_owned(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_owned(),
                source,
            })?;

        Ok(FetchedPage {
            url: final_url,
            content_type,
            body,
        })
    }
}

/// [`PageFetcher`] that serves pages registered up front.
///
/// Unknown URLs answer with a 404 [`FetchError::Status`]. Every requested
/// URL is recorded, in order, for inspection.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: BTreeMap<String, FetchedPage>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an HTML body for `url`.
    #[must_use]
    pub fn with_html(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_owned(), FetchedPage::html(url, body));
        self
    }

    /// Registers a JSON body for `url`.
    #[must_use]
    pub fn with_json(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_owned(), FetchedPage::json(url, body));
        self
    }

    /// URLs requested so far, in request order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(url.to_owned());

        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_owned(),
            status: 404,
        })
    }
}
