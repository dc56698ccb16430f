//! HTML -> title, styled text and image references.
//!
//! Pure and deterministic: the same HTML and source URL always produce the
//! same [`ExtractionResult`].

use crate::resolve::resolve;
use scraper::{ElementRef, Html};
use serde::Serialize;

/// Section heading emitted before each table's key/value lines.
pub const TABLE_HEADING: &str = "## Details";
/// Title used when the page has no heading and no `<title>`.
pub const UNTITLED: &str = "webpage_scrape";

const CONTENT_CLASS_MARKERS: [&str; 3] = ["content", "body", "main"];
/// Body blocks must be strictly longer than this to be kept.
const MIN_BLOCK_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    /// `src` exactly as written in the document.
    pub original_url: String,
    /// `original_url` resolved against the page URL.
    pub resolved_url: String,
    pub alt_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub title: String,
    pub styled_text: String,
    pub image_references: Vec<ImageReference>,
}

impl ExtractionResult {
    /// Whether the title came from the page rather than the placeholder.
    pub fn has_title(&self) -> bool {
        self.title != UNTITLED
    }
}

/// Extract from HTML fetched over plain HTTP.
pub fn extract(html: &str, source_url: &str) -> ExtractionResult {
    extract_inner(html, source_url, false)
}

/// Extract from browser-rendered HTML; the text starts with a source line.
pub fn extract_rendered(html: &str, source_url: &str) -> ExtractionResult {
    extract_inner(html, source_url, true)
}

fn extract_inner(html: &str, source_url: &str, with_source_line: bool) -> ExtractionResult {
    let doc = Html::parse_document(html);
    let elements: Vec<ElementRef<'_>> = doc
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect();

    let heading = ["h1", "h2", "h3"]
        .iter()
        .find_map(|tag| first_text(&elements, tag));
    let title = heading
        .clone()
        .or_else(|| first_text(&elements, "title"))
        .unwrap_or_else(|| UNTITLED.to_string());

    let mut lines: Vec<String> = Vec::new();

    if with_source_line {
        lines.push(format!("**Source URL**: {source_url}"));
        lines.push(String::new());
    }

    if let Some(h) = &heading {
        lines.push(format!("# {h}"));
    }

    for table in elements.iter().filter(|e| is_tag(e, "table")) {
        lines.push(TABLE_HEADING.to_string());
        for row in descendants_named(table, &["tr"]) {
            let cells = descendants_named(&row, &["td", "th"]);
            if cells.len() >= 2 {
                lines.push(format!(
                    "**{}**: {}",
                    trimmed_text(&cells[0]),
                    trimmed_text(&cells[1])
                ));
            }
        }
        lines.push(String::new());
    }

    for block in elements
        .iter()
        .filter(|e| is_tag(e, "div") || is_tag(e, "p"))
        .filter(|e| has_content_class(e))
    {
        let text = trimmed_text(block);
        if text.chars().count() <= MIN_BLOCK_CHARS {
            continue;
        }
        lines.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        );
        lines.push(String::new());
    }

    let image_references = elements
        .iter()
        .filter(|e| is_tag(e, "img"))
        .enumerate()
        .filter_map(|(idx, img)| image_reference(img, idx + 1, source_url))
        .collect();

    ExtractionResult {
        title,
        styled_text: lines.join("\n"),
        image_references,
    }
}

fn image_reference(img: &ElementRef<'_>, position: usize, source_url: &str) -> Option<ImageReference> {
    let src = img.value().attr("src").map(str::trim).filter(|s| !s.is_empty())?;
    let alt_text = img
        .value()
        .attr("alt")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("image_{position}"));
    Some(ImageReference {
        original_url: src.to_string(),
        resolved_url: resolve(src, source_url),
        alt_text,
    })
}

fn is_tag(el: &ElementRef<'_>, name: &str) -> bool {
    el.value().name().eq_ignore_ascii_case(name)
}

fn has_content_class(el: &ElementRef<'_>) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|class| CONTENT_CLASS_MARKERS.iter().any(|m| class.contains(m)))
}

fn descendants_named<'a>(el: &ElementRef<'a>, names: &[&str]) -> Vec<ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|e| names.iter().any(|n| is_tag(e, n)))
        .collect()
}

fn trimmed_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first `tag` element with non-empty text.
fn first_text(elements: &[ElementRef<'_>], tag: &str) -> Option<String> {
    elements
        .iter()
        .filter(|e| is_tag(e, tag))
        .map(trimmed_text)
        .find(|t| !t.is_empty())
}
