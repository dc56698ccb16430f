//! On-disk layout of one scrape.
//!
//! ```text
//! <base_dir>/<sanitized_title>_<YYYYMMDD_HHMMSS>/
//!     content.txt
//!     content.md
//!     metadata.json
//!     images/<sanitized_alt><ext>
//!     page_screenshot.png      (browser only)
//! ```

use crate::error::ScrapeError;
use crate::extract::ExtractionResult;
use crate::fetcher::FetchMethod;
use crate::sanitize::sanitize;
use crate::scrape::SkippedImage;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const TEXT_FILE: &str = "content.txt";
pub const MARKDOWN_FILE: &str = "content.md";
pub const METADATA_FILE: &str = "metadata.json";
pub const SCREENSHOT_FILE: &str = "page_screenshot.png";
pub const IMAGES_DIR: &str = "images";

/// A downloaded image still in memory.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub original_url: String,
    pub resolved_url: String,
    pub alt_text: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedImage {
    pub original_url: String,
    pub local_path: PathBuf,
    pub alt_text: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub folder_path: PathBuf,
    pub text_file_path: PathBuf,
    pub markdown_file_path: PathBuf,
    pub metadata_file_path: PathBuf,
    pub screenshot_path: Option<PathBuf>,
    pub images: Vec<DownloadedImage>,
}

/// Everything [`ArtifactWriter::write`] persists for one page.
pub struct PageArtifacts<'a> {
    /// URL as the user asked for it (after normalization).
    pub requested_url: &'a str,
    /// URL the page was actually served from, after redirects.
    pub final_url: &'a str,
    pub extraction: &'a ExtractionResult,
    pub images: Vec<FetchedImage>,
    pub skipped_images: &'a [SkippedImage],
    pub screenshot_png: Option<&'a [u8]>,
    pub html: &'a str,
    pub method: FetchMethod,
    pub scraped_at: DateTime<Local>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    url: &'a str,
    final_url: &'a str,
    title: &'a str,
    scraped_at: String,
    method: FetchMethod,
    images: &'a [DownloadedImage],
    text_file: &'a Path,
    markdown_file: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    screenshot_file: Option<&'a Path>,
    html_checksum: String,
    skipped_images: &'a [SkippedImage],
}

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    base_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `sanitize(title)_YYYYMMDD_HHMMSS`
    pub fn folder_name(title: &str, at: DateTime<Local>) -> String {
        format!("{}_{}", sanitize(title), at.format("%Y%m%d_%H%M%S"))
    }

    /// Persist one page. Nothing is rolled back if a later write fails.
    pub async fn write(&self, page: PageArtifacts<'_>) -> Result<ArtifactBundle, ScrapeError> {
        let folder_path = self
            .create_unique_folder(&Self::folder_name(&page.extraction.title, page.scraped_at))
            .await?;
        let images_dir = folder_path.join(IMAGES_DIR);
        fs::create_dir_all(&images_dir)
            .await
            .map_err(|e| ScrapeError::io(&images_dir, e))?;

        let text_file_path = folder_path.join(TEXT_FILE);
        let markdown_file_path = folder_path.join(MARKDOWN_FILE);
        write_file(&text_file_path, page.extraction.styled_text.as_bytes()).await?;
        write_file(&markdown_file_path, page.extraction.styled_text.as_bytes()).await?;

        let mut taken = HashSet::new();
        let mut images = Vec::with_capacity(page.images.len());
        for img in page.images {
            let file_name = unique_file_name(
                &sanitize(&img.alt_text),
                image_extension(img.content_type.as_deref(), &img.resolved_url),
                &mut taken,
            );
            let local_path = images_dir.join(file_name);
            write_file(&local_path, &img.bytes).await?;
            images.push(DownloadedImage {
                original_url: img.original_url,
                local_path,
                alt_text: img.alt_text,
            });
        }

        let screenshot_path = match page.screenshot_png {
            Some(png) => {
                let path = folder_path.join(SCREENSHOT_FILE);
                write_file(&path, png).await?;
                Some(path)
            }
            None => None,
        };

        let metadata = Metadata {
            url: page.requested_url,
            final_url: page.final_url,
            title: &page.extraction.title,
            scraped_at: page.scraped_at.to_rfc3339(),
            method: page.method,
            images: &images,
            text_file: &text_file_path,
            markdown_file: &markdown_file_path,
            screenshot_file: screenshot_path.as_deref(),
            html_checksum: blake3::hash(page.html.as_bytes()).to_hex().to_string(),
            skipped_images: page.skipped_images,
        };
        let metadata_file_path = folder_path.join(METADATA_FILE);
        let json = serde_json::to_vec_pretty(&metadata)?;
        write_file(&metadata_file_path, &json).await?;

        tracing::info!(
            folder = %folder_path.display(),
            images = images.len(),
            "artifact.written"
        );

        Ok(ArtifactBundle {
            folder_path,
            text_file_path,
            markdown_file_path,
            metadata_file_path,
            screenshot_path,
            images,
        })
    }

    /// Create `base_dir/name`, or `name_<8 hex>` when that folder already exists.
    async fn create_unique_folder(&self, name: &str) -> Result<PathBuf, ScrapeError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| ScrapeError::io(&self.base_dir, e))?;

        let mut candidate = self.base_dir.join(name);
        loop {
            match fs::create_dir(&candidate).await {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let suffix = uuid::Uuid::new_v4().simple().to_string();
                    let renamed = format!("{name}_{}", &suffix[..8]);
                    tracing::debug!(folder = %renamed, "artifact.folder_collision");
                    candidate = self.base_dir.join(renamed);
                }
                Err(e) => return Err(ScrapeError::io(&candidate, e)),
            }
        }
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ScrapeError> {
    fs::write(path, bytes)
        .await
        .map_err(|e| ScrapeError::io(path, e))
}

/// `stem + ext`, or `stem_2 + ext`, `stem_3 + ext`, ... if already taken.
fn unique_file_name(stem: &str, ext: &str, taken: &mut HashSet<String>) -> String {
    let mut name = format!("{stem}{ext}");
    let mut n = 2;
    while !taken.insert(name.to_ascii_lowercase()) {
        name = format!("{stem}_{n}{ext}");
        n += 1;
    }
    name
}

/// File extension (with dot) from the content type, else the URL path, else `.jpg`.
pub fn image_extension(content_type: Option<&str>, url: &str) -> &'static str {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if ct.contains("jpeg") || ct.contains("jpg") {
            return ".jpg";
        }
        if ct.contains("png") {
            return ".png";
        }
        if ct.contains("gif") {
            return ".gif";
        }
        if ct.contains("webp") {
            return ".webp";
        }
    }
    url_extension(url).unwrap_or(".jpg")
}

fn url_extension(url: &str) -> Option<&'static str> {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or("").to_string());
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(".jpg"),
        "png" => Some(".png"),
        "gif" => Some(".gif"),
        "webp" => Some(".webp"),
        "svg" => Some(".svg"),
        "bmp" => Some(".bmp"),
        "ico" => Some(".ico"),
        "avif" => Some(".avif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn image(alt: &str, url: &str, ct: Option<&str>) -> FetchedImage {
        FetchedImage {
            original_url: url.to_string(),
            resolved_url: url.to_string(),
            alt_text: alt.to_string(),
            content_type: ct.map(str::to_string),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn folder_name_is_sanitized_and_timestamped() {
        assert_eq!(
            ArtifactWriter::folder_name("My Page: v2", fixed_time()),
            "My_Page__v2_20240309_140507"
        );
    }

    #[test]
    fn extension_prefers_content_type_then_url() {
        assert_eq!(image_extension(Some("image/jpeg"), "https://x/a.png"), ".jpg");
        assert_eq!(image_extension(Some("image/webp"), "https://x/a"), ".webp");
        assert_eq!(image_extension(Some("application/octet-stream"), "https://x/a.GIF?v=2"), ".gif");
        assert_eq!(image_extension(None, "https://x/a"), ".jpg");
        assert_eq!(image_extension(None, "https://x/dir.v2/a"), ".jpg");
    }

    #[test]
    fn colliding_image_names_get_numbered() {
        let mut taken = HashSet::new();
        assert_eq!(unique_file_name("logo", ".png", &mut taken), "logo.png");
        assert_eq!(unique_file_name("logo", ".png", &mut taken), "logo_2.png");
        assert_eq!(unique_file_name("logo", ".png", &mut taken), "logo_3.png");
        assert_eq!(unique_file_name("logo", ".jpg", &mut taken), "logo.jpg");
    }

    #[tokio::test]
    async fn writes_full_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        let html = "<h1>Hello</h1><div class=\"content\">some long enough body text</div>";
        let extraction = extract(html, "https://site.com");
        let images = vec![
            image("Logo", "https://site.com/logo.png", Some("image/png")),
            image("Logo", "https://site.com/logo2.png", Some("image/png")),
        ];

        let bundle = writer
            .write(PageArtifacts {
                requested_url: "https://site.com",
                final_url: "https://www.site.com/",
                extraction: &extraction,
                images,
                skipped_images: &[],
                screenshot_png: Some(&[1u8, 2, 3][..]),
                html,
                method: FetchMethod::Browser,
                scraped_at: fixed_time(),
            })
            .await
            .unwrap();

        assert!(bundle.folder_path.ends_with("Hello_20240309_140507"));
        let text = std::fs::read_to_string(&bundle.text_file_path).unwrap();
        let md = std::fs::read_to_string(&bundle.markdown_file_path).unwrap();
        assert_eq!(text, md);
        assert!(text.starts_with("# Hello"));

        let names: Vec<_> = bundle
            .images
            .iter()
            .map(|i| i.local_path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Logo.png", "Logo_2.png"]);
        assert!(bundle.screenshot_path.as_ref().unwrap().exists());

        let meta: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&bundle.metadata_file_path).unwrap()).unwrap();
        assert_eq!(meta["url"], "https://site.com");
        assert_eq!(meta["final_url"], "https://www.site.com/");
        assert_eq!(meta["title"], "Hello");
        assert_eq!(meta["method"], "browser");
        let as_str = |p: &Path| p.to_str().unwrap().to_string();
        assert_eq!(meta["text_file"], as_str(&bundle.text_file_path));
        assert_eq!(meta["markdown_file"], as_str(&bundle.markdown_file_path));
        assert_eq!(
            meta["screenshot_file"],
            as_str(bundle.screenshot_path.as_deref().unwrap())
        );
        assert_eq!(
            meta["images"][0]["local_path"],
            as_str(&bundle.images[0].local_path)
        );
        assert!(bundle.text_file_path.starts_with(&bundle.folder_path));
        assert_eq!(meta["images"].as_array().unwrap().len(), 2);
        assert_eq!(meta["html_checksum"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn existing_folder_gets_random_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        let extraction = extract("<h1>Same</h1>", "https://site.com");
        let page = || PageArtifacts {
            requested_url: "https://site.com",
            final_url: "https://site.com/",
            extraction: &extraction,
            images: Vec::new(),
            skipped_images: &[],
            screenshot_png: None,
            html: "<h1>Same</h1>",
            method: FetchMethod::Http,
            scraped_at: fixed_time(),
        };

        let first = writer.write(page()).await.unwrap();
        let second = writer.write(page()).await.unwrap();
        assert_ne!(first.folder_path, second.folder_path);
        let second_name = second.folder_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(second_name.starts_with("Same_20240309_140507_"));
        assert_eq!(second_name.len(), "Same_20240309_140507_".len() + 8);
        assert!(second.screenshot_path.is_none());
    }
}
