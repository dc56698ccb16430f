use crate::error::ScrapeError;
use async_trait::async_trait;
use pagegrab_http::HttpClient;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Which strategy produced a page; also the `method` tag in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Http,
    Browser,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Http => "http",
            FetchMethod::Browser => "browser",
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(FetchMethod::Http),
            "browser" | "selenium" => Ok(FetchMethod::Browser),
            other => Err(format!("unknown strategy '{other}' (expected http or browser)")),
        }
    }
}

/// What a [`PageFetcher`] hands back to the orchestrator.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Final URL after redirects.
    pub url: Url,
    pub html: String,
    /// Document title as reported by the fetcher, if it knows one.
    pub title: Option<String>,
    pub screenshot_png: Option<Vec<u8>>,
    pub method: FetchMethod,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn method(&self) -> FetchMethod;

    async fn fetch(&self, url: &Url) -> Result<RawPage, ScrapeError>;
}

/// Plain HTTP GET through [`HttpClient`] (retries included).
pub struct HttpFetcher {
    client: HttpClient,
}

impl HttpFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn method(&self) -> FetchMethod {
        FetchMethod::Http
    }

    async fn fetch(&self, url: &Url) -> Result<RawPage, ScrapeError> {
        let resp = self.client.fetch(url.as_str()).await?;
        if let Some(ct) = resp.content_type() {
            if !ct.contains("html") {
                tracing::debug!(content_type = %ct, "fetch.non_html_body");
            }
        }
        Ok(RawPage {
            html: resp.text_lossy(),
            url: resp.url,
            title: None,
            screenshot_png: None,
            method: FetchMethod::Http,
        })
    }
}
