use crate::error::ScrapeError;
use crate::fetcher::{FetchMethod, PageFetcher, RawPage};
use async_trait::async_trait;
use pagegrab_config::PagegrabConfig;
use pagegrab_drivers::pagegrab_browser::driver::BrowserDriver;
use pagegrab_drivers::pagegrab_browser::launch::BrowserOptions;
use pagegrab_drivers::pagegrab_browser::page::RenderedPage;
use std::time::Duration;
use url::Url;

/// Renders the page in a WebDriver-controlled Chrome before extraction.
///
/// One session per fetch; the session is closed whether the capture
/// succeeds or not.
pub struct BrowserFetcher {
    options: BrowserOptions,
    settle_delay: Duration,
}

impl BrowserFetcher {
    pub fn new(options: BrowserOptions, settle_delay: Duration) -> Self {
        Self {
            options,
            settle_delay,
        }
    }

    pub fn from_config(cfg: &PagegrabConfig) -> Self {
        let b = &cfg.browser;
        let options = BrowserOptions {
            webdriver_url: b.webdriver_url.clone(),
            headless: b.headless,
            window_size: (b.window_width, b.window_height),
            user_agent: cfg.http.user_agent.clone(),
            page_load_timeout: b.page_load_timeout(),
        };
        Self::new(options, b.settle_delay())
    }

    async fn capture(&self, driver: &mut BrowserDriver, url: &Url) -> Result<RawPage, ScrapeError> {
        let page = driver.goto(url.as_str()).await?;
        // Give client-side scripts time to populate the DOM.
        tokio::time::sleep(self.settle_delay).await;

        let html = page.content().await?;
        let title = page.title().await.ok().filter(|t| !t.trim().is_empty());
        let final_url = page
            .current_url()
            .await
            .ok()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());
        let screenshot_png = screenshot(&page).await;

        Ok(RawPage {
            url: final_url,
            html,
            title,
            screenshot_png,
            method: FetchMethod::Browser,
        })
    }
}

async fn screenshot(page: &RenderedPage) -> Option<Vec<u8>> {
    match page.full_page_screenshot().await {
        Ok(png) => Some(png),
        Err(err) => {
            tracing::warn!(error = %err, "browser.screenshot_failed");
            None
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn method(&self) -> FetchMethod {
        FetchMethod::Browser
    }

    async fn fetch(&self, url: &Url) -> Result<RawPage, ScrapeError> {
        tracing::info!(
            endpoint = %self.options.webdriver_url,
            headless = self.options.headless,
            "browser.session.start"
        );
        let mut driver = BrowserDriver::connect(self.options.clone()).await?;
        let result = self.capture(&mut driver, url).await;
        if let Err(err) = driver.close().await {
            tracing::warn!(error = %err, "browser.session.close_failed");
        }
        result
    }
}
