//! Minimal HTTP fetch client with a browser identity, timeouts and bounded retries.
//!
//! - One long-lived `reqwest` client configured from an immutable [`HttpClientConfig`]
//! - [`HttpClient::fetch`] retries 429/500/502/503/504 and transient network
//!   failures with exponential backoff and `Retry-After` support
//! - [`HttpClient::fetch_once`] performs exactly one attempt with its own timeout
//!   (used for image downloads)
//! - Failures are classified into [`FetchError`] variants so callers never have
//!   to inspect `reqwest` error internals
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), pagegrab_http::FetchError> {
//! let client = pagegrab_http::HttpClient::new(pagegrab_http::HttpClientConfig::default())?;
//! let page = client.fetch("https://example.com/").await?;
//! println!("{} bytes of {}", page.body.len(), page.url);
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated, `trace` level), retries and final
//! errors. Only host + path are logged, never the query string.

use pagegrab_common::DEFAULT_USER_AGENT;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use std::error::Error as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Upper bound for a server-provided `Retry-After` delay.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);
const SNIPPET_LEN: usize = 500;

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("client build failed: {0}")]
    Build(String),
    #[error("connect timeout: {0}")]
    ConnectTimeout(String),
    #[error("read timeout: {0}")]
    ReadTimeout(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("unexpected fetch error: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Network/timeout failure rather than an HTTP status response.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            FetchError::ConnectTimeout(_)
                | FetchError::ReadTimeout(_)
                | FetchError::ConnectionFailed(_)
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ==============================
// Configuration
// ==============================

/// Bounded retry schedule: `max_attempts` total tries, sleeping
/// `backoff_base * 2^(n-1)` after the n-th failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff_base: Duration::ZERO,
        }
    }

    /// Delay to wait after `failed_attempt` (1-based) before the next try.
    ///
    /// ```
    /// use pagegrab_http::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let p = RetryPolicy::default();
    /// assert_eq!(p.backoff(1), Duration::from_secs(1));
    /// assert_eq!(p.backoff(2), Duration::from_secs(2));
    /// assert_eq!(p.backoff(3), Duration::from_secs(4));
    /// ```
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let exp = failed_attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exp)
    }

    /// Statuses worth another attempt.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
    }
}

/// Immutable identity and timeout settings for [`HttpClient`].
///
/// `read_timeout` bounds each wait for data on the socket, not the whole
/// request.
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

// ==============================
// Response
// ==============================

#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// Final URL after redirects.
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Media type without parameters, lowercased (`text/html; charset=utf-8` -> `text/html`).
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Build the long-lived client. Default headers mimic a desktop browser.
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        let inner = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| FetchError::Build(e.to_string()))?;
        Ok(Self { inner, config })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET `url` under the configured retry policy.
    pub async fn fetch(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::Url(format!("{url}: {e}")))?;
        // No overall deadline: a body that keeps trickling in is not a timeout.
        self.get_with_policy(url, None, None, self.config.retry)
            .await
    }

    /// Single GET attempt with its own total `timeout` and extra headers.
    pub async fn fetch_once(
        &self,
        url: &str,
        timeout: Duration,
        headers: Option<HeaderMap>,
    ) -> Result<HttpResponse, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::Url(format!("{url}: {e}")))?;
        self.get_with_policy(url, Some(timeout), headers, RetryPolicy::none())
            .await
    }

    async fn get_with_policy(
        &self,
        url: Url,
        timeout: Option<Duration>,
        headers: Option<HeaderMap>,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, FetchError> {
        let max_attempts = policy.max_attempts.max(1);
        let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
        let req_id = format!("r{}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed));
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let mut rb = self.inner.get(url.clone());
            if let Some(t) = timeout {
                rb = rb.timeout(t);
            }
            if let Some(h) = &headers {
                rb = rb.headers(h.clone());
            }

            tracing::debug!(
                req_id=%req_id,
                attempt,
                max_attempts,
                host_path=%host_path,
                total_timeout_ms=?timeout.map(|t| t.as_millis() as u64),
                "http.request.start"
            );

            // ----- Send -----
            let t0 = std::time::Instant::now();
            let sent = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let final_url = resp.url().clone();
                    let resp_headers = resp.headers().clone();
                    resp.bytes()
                        .await
                        .map(|b| (status, final_url, resp_headers, b.to_vec()))
                }
                Err(err) => Err(err),
            };

            let (status, final_url, resp_headers, body) = match sent {
                Ok(parts) => parts,
                Err(err) => {
                    let transient = is_transient(&err);
                    let classified = classify(&err);
                    if transient && attempt < max_attempts {
                        let delay = policy.backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_attempts,
                            backoff_ms=delay.as_millis() as u64,
                            error=%classified,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_attempts,
                        transient,
                        error=%classified,
                        "http.network_error"
                    );
                    return Err(classified);
                }
            };
            let dur_ms = t0.elapsed().as_millis() as u64;

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=body.len(),
                content_type=?resp_headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
                "http.response"
            );
            let snippet = snip_body(&body);
            tracing::trace!(
                req_id=%req_id,
                body_snippet=%snippet,
                "http.response.body_snippet"
            );

            // ----- Success path -----
            if status.is_success() {
                return Ok(HttpResponse {
                    url: final_url,
                    status,
                    headers: resp_headers,
                    body,
                });
            }

            // ----- Non-success: maybe retry -----
            if RetryPolicy::is_retryable_status(status) && attempt < max_attempts {
                let delay = retry_after_delay(&resp_headers)
                    .map(|d| d.min(MAX_RETRY_AFTER))
                    .unwrap_or_else(|| policy.backoff(attempt));
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_attempts,
                    backoff_ms=delay.as_millis() as u64,
                    retry_after=?retry_after_delay(&resp_headers),
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            // Final error
            tracing::warn!(
                req_id=%req_id,
                %status,
                attempt,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(FetchError::Status {
                status,
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }
    }
}

// ==============================
// Helpers
// ==============================

/// Timeouts and mid-flight failures are worth retrying; failures to establish
/// a connection at all (DNS, TLS, refused) are not.
fn is_transient(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return true;
    }
    if err.is_connect() || err.is_builder() || err.is_redirect() {
        return false;
    }
    err.is_body() || err.is_request() || err.is_decode()
}

fn classify(err: &reqwest::Error) -> FetchError {
    let message = error_chain(err);
    if err.is_builder() {
        FetchError::Build(message)
    } else if err.is_timeout() && err.is_connect() {
        FetchError::ConnectTimeout(message)
    } else if err.is_timeout() {
        FetchError::ReadTimeout(message)
    } else if err.is_connect() || err.is_request() || err.is_body() {
        FetchError::ConnectionFailed(message)
    } else {
        FetchError::Unknown(message)
    }
}

/// `reqwest` hides the interesting cause (DNS, TLS, refused) in the source chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn retry_after_delay(h: &HeaderMap) -> Option<Duration> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_LEN {
        let mut cut = SNIPPET_LEN;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}
