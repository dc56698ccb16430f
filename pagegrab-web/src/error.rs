//! Error taxonomy surfaced to front ends.
//!
//! Library failures are carried as [`ScrapeError`]; front ends only ever see
//! an [`ErrorKind`] plus the user-facing text from [`ErrorKind::user_message`].

use pagegrab_drivers::DriverError;
use pagegrab_http::FetchError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidUrl,
    ConnectTimeout,
    ReadTimeout,
    ConnectionFailed,
    HttpError { status: u16 },
    RenderingEngineUnavailable,
    RenderingTimeout,
    IoError,
    Unknown,
}

impl ErrorKind {
    /// Network/timeout failures that trigger the browser fallback.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectTimeout | ErrorKind::ReadTimeout | ErrorKind::ConnectionFailed
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            ErrorKind::InvalidUrl => "Please enter a valid web page URL.".to_string(),
            ErrorKind::ConnectTimeout => {
                "Connection timed out: the server did not answer in time. Check the address or try again later.".to_string()
            }
            ErrorKind::ReadTimeout => {
                "The server accepted the connection but took too long to send the page.".to_string()
            }
            ErrorKind::ConnectionFailed => {
                "Could not connect to the server. Check the address and your network connection.".to_string()
            }
            ErrorKind::HttpError { status } => match status {
                403 => "Access denied (HTTP 403): the site refused the request.".to_string(),
                404 => "Page not found (HTTP 404).".to_string(),
                429 => "Too many requests (HTTP 429): the site is rate limiting, try again later.".to_string(),
                500..=599 => format!("The server failed to respond (HTTP {status}). Try again later."),
                _ => format!("The server answered with HTTP {status}."),
            },
            ErrorKind::RenderingEngineUnavailable => {
                "The browser engine is unavailable. Make sure Chrome and chromedriver are installed and running.".to_string()
            }
            ErrorKind::RenderingTimeout => {
                "Page loading timed out: the page took too long to render in the browser.".to_string()
            }
            ErrorKind::IoError => {
                "Could not save the results to disk. Check the output folder and its permissions.".to_string()
            }
            ErrorKind::Unknown => "An unexpected error occurred while scraping.".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("browser strategy is disabled")]
    BrowserDisabled,
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("{primary}; browser fallback failed: {fallback}")]
    Fallback {
        primary: Box<ScrapeError>,
        fallback: Box<ScrapeError>,
    },
}

impl ScrapeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScrapeError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            ScrapeError::Fetch(err) => match err {
                FetchError::Url(_) => ErrorKind::InvalidUrl,
                FetchError::ConnectTimeout(_) => ErrorKind::ConnectTimeout,
                FetchError::ReadTimeout(_) => ErrorKind::ReadTimeout,
                FetchError::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
                FetchError::Status { status, .. } => ErrorKind::HttpError {
                    status: status.as_u16(),
                },
                FetchError::Build(_) | FetchError::Unknown(_) => ErrorKind::Unknown,
            },
            ScrapeError::Driver(err) => match err {
                DriverError::Unavailable { .. } => ErrorKind::RenderingEngineUnavailable,
                DriverError::Timeout(_) => ErrorKind::RenderingTimeout,
                DriverError::Command(_) => ErrorKind::Unknown,
            },
            ScrapeError::BrowserDisabled => ErrorKind::RenderingEngineUnavailable,
            ScrapeError::Io { .. } | ScrapeError::Metadata(_) => ErrorKind::IoError,
            // The primary failure is what the user asked for; keep its kind.
            ScrapeError::Fallback { primary, .. } => primary.kind(),
        }
    }

    /// User-facing text; for a failed fallback both failures are named.
    pub fn user_message(&self) -> String {
        match self {
            ScrapeError::Fallback { primary, fallback } => format!(
                "{} The browser fallback also failed: {}",
                primary.user_message(),
                fallback.user_message()
            ),
            other => other.kind().user_message(),
        }
    }
}
