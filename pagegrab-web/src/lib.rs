//! Single-page snapshot pipeline.
//!
//! - URL helpers: [`resolve`] (absolute image URLs) and [`sanitize`] (filesystem-safe names)
//! - [`extract`]: title, styled text and image references from raw HTML
//! - [`fetcher`] / [`browser`]: the two interchangeable [`PageFetcher`] strategies
//! - [`artifact`]: on-disk layout (`content.txt`, `content.md`, `metadata.json`, `images/`)
//! - [`scrape`]: the [`Scraper`] orchestrator, the only entry point front ends need
//!
//! ```no_run
//! # async fn demo() -> Result<(), pagegrab_web::ScrapeError> {
//! use pagegrab_config::PagegrabConfig;
//! use pagegrab_web::{FetchMethod, ScrapeResult, Scraper};
//!
//! let scraper = Scraper::from_config(&PagegrabConfig::default())?;
//! match scraper.scrape("example.com", FetchMethod::Http).await {
//!     ScrapeResult::Success { folder_path, image_count, .. } => {
//!         println!("saved {image_count} images to {}", folder_path.display());
//!     }
//!     ScrapeResult::Failure { message, .. } => eprintln!("{message}"),
//! }
//! # Ok(()) }
//! ```

pub mod artifact;
pub mod browser;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod resolve;
pub mod sanitize;
pub mod scrape;

pub use artifact::{ArtifactBundle, ArtifactWriter, DownloadedImage, FetchedImage, PageArtifacts};
pub use browser::BrowserFetcher;
pub use error::{ErrorKind, ScrapeError};
pub use extract::{ExtractionResult, ImageReference};
pub use fetcher::{FetchMethod, HttpFetcher, PageFetcher, RawPage};
pub use resolve::resolve;
pub use sanitize::sanitize;
pub use scrape::{normalize_url, ScrapeResult, ScrapeStage, Scraper, SkippedImage};
