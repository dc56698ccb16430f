//! Driver layer for browser automation.
//!
//! This crate wraps a WebDriver session (chromedriver by default) so the
//! rendering fetch strategy can load a page, let its scripts run, and read
//! back the rendered DOM, title and a screenshot.
//!
//! - [`pagegrab_browser::driver::BrowserDriver`]: WebDriver client wrapper
//! - [`pagegrab_browser::page::RenderedPage`]: DOM/source/screenshot helpers
//! - [`pagegrab_browser::launch`]: Chrome arguments and capabilities
//! - [`DriverError`]: classified failures (unavailable engine vs. timeout)
pub mod pagegrab_browser;

use fantoccini::error::CmdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// No WebDriver session could be created (driver not running, browser missing).
    #[error("webdriver unavailable at {endpoint}: {message}")]
    Unavailable { endpoint: String, message: String },
    /// Page load or an explicit wait exceeded its deadline.
    #[error("browser timed out: {0}")]
    Timeout(String),
    #[error("browser command failed: {0}")]
    Command(String),
}

impl From<CmdError> for DriverError {
    fn from(err: CmdError) -> Self {
        let message = err.to_string();
        match err {
            CmdError::WaitTimeout => DriverError::Timeout(message),
            _ if message.to_ascii_lowercase().contains("timeout") => {
                DriverError::Timeout(message)
            }
            _ => DriverError::Command(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
