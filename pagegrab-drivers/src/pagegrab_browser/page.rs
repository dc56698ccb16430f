use crate::pagegrab_browser::launch::DOCUMENT_HEIGHT_SCRIPT;
use crate::Result;
use fantoccini::Client;
use tracing::debug;

/// Tallest window we resize to for a full-page screenshot.
const MAX_SCREENSHOT_HEIGHT: u32 = 16_384;

/// A loaded page in a live browser session.
pub struct RenderedPage {
    client: Client,
    window_width: u32,
}

impl RenderedPage {
    pub(crate) fn new(client: Client, window_width: u32) -> Self {
        Self {
            client,
            window_width,
        }
    }

    /// Return the full rendered HTML source.
    pub async fn content(&self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    /// Return the document title.
    pub async fn title(&self) -> Result<String> {
        Ok(self.client.title().await?)
    }

    /// Return the current page URL (after redirects).
    pub async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    /// PNG screenshot of the whole document: the window is stretched to the
    /// document height (capped) before capturing.
    pub async fn full_page_screenshot(&self) -> Result<Vec<u8>> {
        let height = self
            .client
            .execute(DOCUMENT_HEIGHT_SCRIPT, vec![])
            .await?
            .as_u64()
            .map(|h| h.clamp(1, u64::from(MAX_SCREENSHOT_HEIGHT)) as u32);

        if let Some(height) = height {
            debug!(target: "browser.screenshot", width = self.window_width, height, "resizing window");
            self.client
                .set_window_size(self.window_width, height)
                .await?;
        }
        Ok(self.client.screenshot().await?)
    }
}
