//! The scrape orchestrator.
//!
//! `NotStarted -> Fetching -> Extracting -> DownloadingImages -> WritingArtifacts -> Done`,
//! or `Failed` from the fetch and write stages. Image failures never fail a scrape;
//! they are reported as [`SkippedImage`] diagnostics instead.

use crate::artifact::{ArtifactWriter, DownloadedImage, FetchedImage, PageArtifacts};
use crate::browser::BrowserFetcher;
use crate::error::{ErrorKind, ScrapeError};
use crate::extract::{extract, extract_rendered, ExtractionResult, ImageReference};
use crate::fetcher::{FetchMethod, HttpFetcher, PageFetcher, RawPage};
use futures::stream::{self, StreamExt};
use pagegrab_config::PagegrabConfig;
use pagegrab_http::{FetchError, HttpClient, HttpClientConfig, RetryPolicy};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStage {
    NotStarted,
    Fetching,
    Extracting,
    DownloadingImages,
    WritingArtifacts,
    Done,
    Failed,
}

impl ScrapeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStage::NotStarted => "not_started",
            ScrapeStage::Fetching => "fetching",
            ScrapeStage::Extracting => "extracting",
            ScrapeStage::DownloadingImages => "downloading_images",
            ScrapeStage::WritingArtifacts => "writing_artifacts",
            ScrapeStage::Done => "done",
            ScrapeStage::Failed => "failed",
        }
    }
}

/// An image that was found but could not be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedImage {
    pub original_url: String,
    pub resolved_url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeResult {
    Success {
        folder_path: PathBuf,
        text_content: String,
        image_count: usize,
        images: Vec<DownloadedImage>,
        method: FetchMethod,
        skipped_images: Vec<SkippedImage>,
    },
    Failure {
        error_kind: ErrorKind,
        message: String,
        /// Underlying error chain, for logs and `--json` output.
        detail: String,
    },
}

impl ScrapeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeResult::Success { .. })
    }

    fn failure(err: &ScrapeError) -> Self {
        ScrapeResult::Failure {
            error_kind: err.kind(),
            message: err.user_message(),
            detail: err.to_string(),
        }
    }
}

/// Runs one scrape end to end. Holds no per-scrape state, so one instance can
/// serve concurrent calls.
pub struct Scraper {
    http: HttpClient,
    primary: Arc<dyn PageFetcher>,
    browser: Option<Arc<dyn PageFetcher>>,
    writer: ArtifactWriter,
    image_timeout: Duration,
    image_concurrency: usize,
    fallback_enabled: bool,
}

impl Scraper {
    /// HTTP-only scraper writing below `output_dir`; no browser strategy.
    pub fn new(http: HttpClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            primary: Arc::new(HttpFetcher::new(http.clone())),
            http,
            browser: None,
            writer: ArtifactWriter::new(output_dir),
            image_timeout: Duration::from_secs(15),
            image_concurrency: 4,
            fallback_enabled: true,
        }
    }

    pub fn from_config(cfg: &PagegrabConfig) -> Result<Self, ScrapeError> {
        let http = HttpClient::new(HttpClientConfig {
            user_agent: cfg.http.user_agent.clone(),
            connect_timeout: cfg.http.connect_timeout(),
            read_timeout: cfg.http.read_timeout(),
            retry: RetryPolicy {
                max_attempts: cfg.http.max_attempts,
                backoff_base: cfg.http.backoff_base(),
            },
        })?;
        let mut scraper = Self::new(http, cfg.output_dir())
            .with_image_policy(cfg.http.image_timeout(), cfg.http.image_concurrency);
        if cfg.browser.enabled {
            scraper = scraper.with_browser(Arc::new(BrowserFetcher::from_config(cfg)));
        }
        Ok(scraper)
    }

    /// Replace the primary (HTTP) strategy.
    pub fn with_primary(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.primary = fetcher;
        self
    }

    /// Strategy used for `FetchMethod::Browser` and for the connectivity fallback.
    pub fn with_browser(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.browser = Some(fetcher);
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn with_image_policy(mut self, timeout: Duration, concurrency: usize) -> Self {
        self.image_timeout = timeout;
        self.image_concurrency = concurrency.max(1);
        self
    }

    pub fn output_dir(&self) -> &std::path::Path {
        self.writer.base_dir()
    }

    /// Scrape `url` with the requested strategy. Never panics and never
    /// returns a bare error: every failure becomes [`ScrapeResult::Failure`].
    pub async fn scrape(&self, url: &str, method: FetchMethod) -> ScrapeResult {
        stage(ScrapeStage::NotStarted, url);
        match self.run(url, method).await {
            Ok(result) => result,
            Err(err) => {
                stage(ScrapeStage::Failed, url);
                tracing::warn!(
                    url,
                    kind = ?err.kind(),
                    error = %err,
                    "scrape.failed"
                );
                ScrapeResult::failure(&err)
            }
        }
    }

    async fn run(&self, input: &str, method: FetchMethod) -> Result<ScrapeResult, ScrapeError> {
        let url = normalize_url(input)?;
        let log_url = url.as_str();

        stage(ScrapeStage::Fetching, log_url);
        let page = self.fetch_page(&url, method).await?;

        stage(ScrapeStage::Extracting, log_url);
        let extraction = self.extract_page(&page);

        stage(ScrapeStage::DownloadingImages, log_url);
        let (images, skipped_images) = self
            .download_images(&extraction.image_references, &page.url)
            .await;

        stage(ScrapeStage::WritingArtifacts, log_url);
        let bundle = self
            .writer
            .write(PageArtifacts {
                requested_url: url.as_str(),
                final_url: page.url.as_str(),
                extraction: &extraction,
                images,
                skipped_images: &skipped_images,
                screenshot_png: page.screenshot_png.as_deref(),
                html: &page.html,
                method: page.method,
                scraped_at: chrono::Local::now(),
            })
            .await?;

        stage(ScrapeStage::Done, log_url);
        Ok(ScrapeResult::Success {
            folder_path: bundle.folder_path,
            text_content: extraction.styled_text,
            image_count: bundle.images.len(),
            images: bundle.images,
            method: page.method,
            skipped_images,
        })
    }

    async fn fetch_page(&self, url: &Url, method: FetchMethod) -> Result<RawPage, ScrapeError> {
        if method == FetchMethod::Browser {
            let browser = self.browser.as_ref().ok_or(ScrapeError::BrowserDisabled)?;
            return fetch_with(browser.as_ref(), url).await;
        }

        let primary_err = match fetch_with(self.primary.as_ref(), url).await {
            Ok(page) => return Ok(page),
            Err(err) => err,
        };
        if !primary_err.kind().is_connectivity() || !self.fallback_enabled {
            return Err(primary_err);
        }
        let browser = match &self.browser {
            Some(b) => b,
            None => return Err(primary_err),
        };

        tracing::warn!(
            url = %url,
            kind = ?primary_err.kind(),
            error = %primary_err,
            "scrape.fallback.browser"
        );
        fetch_with(browser.as_ref(), url)
            .await
            .map_err(|fallback| ScrapeError::Fallback {
                primary: Box::new(primary_err),
                fallback: Box::new(fallback),
            })
    }

    fn extract_page(&self, page: &RawPage) -> ExtractionResult {
        let mut extraction = match page.method {
            FetchMethod::Http => extract(&page.html, page.url.as_str()),
            FetchMethod::Browser => extract_rendered(&page.html, page.url.as_str()),
        };
        if !extraction.has_title() {
            if let Some(title) = &page.title {
                extraction.title = title.trim().to_string();
            }
        }
        tracing::debug!(
            title = %extraction.title,
            text_len = extraction.styled_text.len(),
            images = extraction.image_references.len(),
            "scrape.extracted"
        );
        extraction
    }

    /// One attempt per image, `image_concurrency` at a time, results in
    /// document order.
    async fn download_images(
        &self,
        refs: &[ImageReference],
        page_url: &Url,
    ) -> (Vec<FetchedImage>, Vec<SkippedImage>) {
        let headers = image_headers(page_url);
        let outcomes: Vec<Result<FetchedImage, SkippedImage>> = stream::iter(refs)
            .map(|r| self.download_image(r, headers.clone()))
            .buffered(self.image_concurrency)
            .collect()
            .await;

        let mut images = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(img) => images.push(img),
                Err(s) => {
                    tracing::warn!(
                        url = %s.resolved_url,
                        reason = %s.reason,
                        "scrape.image_skipped"
                    );
                    skipped.push(s);
                }
            }
        }
        (images, skipped)
    }

    async fn download_image(
        &self,
        r: &ImageReference,
        headers: HeaderMap,
    ) -> Result<FetchedImage, SkippedImage> {
        let skip = |reason: String| SkippedImage {
            original_url: r.original_url.clone(),
            resolved_url: r.resolved_url.clone(),
            reason,
        };
        let resp = self
            .http
            .fetch_once(&r.resolved_url, self.image_timeout, Some(headers))
            .await
            .map_err(|e: FetchError| skip(e.to_string()))?;
        if resp.body.is_empty() {
            return Err(skip("empty response body".to_string()));
        }
        Ok(FetchedImage {
            original_url: r.original_url.clone(),
            resolved_url: r.resolved_url.clone(),
            alt_text: r.alt_text.clone(),
            content_type: resp.content_type(),
            bytes: resp.body,
        })
    }
}

/// Run one strategy; the page is tagged with the strategy that produced it.
async fn fetch_with(fetcher: &dyn PageFetcher, url: &Url) -> Result<RawPage, ScrapeError> {
    let method = fetcher.method();
    tracing::debug!(url = %url, %method, "scrape.fetch");
    let mut page = fetcher.fetch(url).await?;
    page.method = method;
    Ok(page)
}

/// Trim, reject blanks, and default to `https://` when no http(s) scheme is given.
pub fn normalize_url(input: &str) -> Result<Url, ScrapeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ScrapeError::InvalidUrl("empty URL".to_string()));
    }
    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    };
    let url = Url::parse(&candidate)
        .map_err(|e| ScrapeError::InvalidUrl(format!("{trimmed}: {e}")))?;
    if !url.has_host() {
        return Err(ScrapeError::InvalidUrl(format!("{trimmed}: missing host")));
    }
    Ok(url)
}

fn image_headers(page_url: &Url) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("image/avif,image/webp,image/apng,image/*,*/*;q=0.8"),
    );
    if let Ok(referer) = HeaderValue::from_str(page_url.as_str()) {
        headers.insert(REFERER, referer);
    }
    headers
}

fn stage(stage: ScrapeStage, url: &str) {
    tracing::info!(stage = stage.as_str(), url, "scrape.stage");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_https_when_scheme_missing() {
        assert_eq!(
            normalize_url("  example.com/page ").unwrap().as_str(),
            "https://example.com/page"
        );
        assert_eq!(
            normalize_url("HTTP://example.com").unwrap().as_str(),
            "http://example.com/"
        );
    }

    #[test]
    fn normalize_rejects_blank_input() {
        for input in ["", "   ", "\n"] {
            let err = normalize_url(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidUrl);
        }
    }

    #[test]
    fn failure_serializes_with_status_tag() {
        let err = ScrapeError::InvalidUrl("empty URL".into());
        let json = serde_json::to_value(ScrapeResult::failure(&err)).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error_kind"], "InvalidUrl");
        assert_eq!(json["message"], ErrorKind::InvalidUrl.user_message());
    }

    #[test]
    fn image_headers_carry_referer() {
        let h = image_headers(&Url::parse("https://site.com/a").unwrap());
        assert_eq!(h.get(REFERER).unwrap(), "https://site.com/a");
        assert!(h.get(ACCEPT).unwrap().to_str().unwrap().contains("image/*"));
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(ScrapeStage::DownloadingImages.as_str(), "downloading_images");
        assert_eq!(
            serde_json::to_value(ScrapeStage::WritingArtifacts).unwrap(),
            "writing_artifacts"
        );
    }
}
