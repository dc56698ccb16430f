use crate::pagegrab_browser::{
    launch::{build_capabilities, BrowserOptions, CORE_EVASIONS},
    page::RenderedPage,
};
use crate::{DriverError, Result};
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use tracing::{debug, warn};

/// Thin wrapper around a `fantoccini` WebDriver client.
pub struct BrowserDriver {
    client: Client,
    options: BrowserOptions,
}

impl BrowserDriver {
    /// Create a new session on the WebDriver service named in `options`.
    pub async fn connect(options: BrowserOptions) -> Result<Self> {
        let caps = build_capabilities(&options);

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&options.webdriver_url)
            .await
            .map_err(|e| DriverError::Unavailable {
                endpoint: options.webdriver_url.clone(),
                message: e.to_string(),
            })?;

        let timeouts = TimeoutConfiguration::new(None, Some(options.page_load_timeout), None);
        if let Err(err) = client.update_timeouts(timeouts).await {
            // The session exists at this point; do not leave it running.
            close_quietly(client).await;
            return Err(err.into());
        }

        debug!(
            target: "browser.session",
            endpoint = %options.webdriver_url,
            headless = options.headless,
            "session created"
        );
        Ok(Self { client, options })
    }

    /// Navigate to `url`, wait for `<body>` and return a [`RenderedPage`].
    pub async fn goto(&mut self, url: &str) -> Result<RenderedPage> {
        self.client.goto(url).await?;
        self.client.execute(CORE_EVASIONS, vec![]).await?;
        self.client
            .wait()
            .at_most(self.options.page_load_timeout)
            .for_element(Locator::Css("body"))
            .await?;

        Ok(RenderedPage::new(
            self.client.clone(),
            self.options.window_size.0,
        ))
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

/// Close a session on an error path; the original error is what callers see.
async fn close_quietly(client: Client) {
    if let Err(err) = client.close().await {
        warn!(target: "browser.session", error = %err, "close after failed setup");
    }
}
