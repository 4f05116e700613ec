
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

static CATEGORY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.category").expect("valid selector"));
static CHANNEL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.channel").expect("valid selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1.header-title").expect("valid selector"));
static IFRAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe[src]").expect("valid selector"));
static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Containers tried in order before falling back to `<body>`
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    "#content",
    ".main-content",
    ".content",
];

/// Page metadata as found in the markup; `None` when the element is missing or blank
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub title: Option<String>,
}

/// Everything the pipeline needs from one parse of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// Readable text, one block element per line
    pub text: String,
    pub metadata: PageMetadata,
    pub video_url: Option<String>,
}

/// Parse a page once and pull out its text, metadata and embedded video
#[inline]
pub fn parse_page(html: &str, video_markers: &[String]) -> ParsedPage {
    let document = Html::parse_document(html);

    let text = extract_main_text(&document);
    let metadata = extract_metadata(&document);
    let video_url = extract_video_url(&document, video_markers);

    debug!(
        "Parsed page: {} chars of text, category {:?}, video {}",
        text.len(),
        metadata.category,
        video_url.is_some()
    );

    ParsedPage {
        text,
        metadata,
        video_url,
    }
}

/// Readable text of the main content container with boilerplate removed
#[inline]
pub fn extract_main_text(document: &Html) -> String {
    let mut content = String::new();
    extract_text_recursive(find_main_content(document), &mut content);
    clean_text(&content)
}

#[inline]
pub fn extract_metadata(document: &Html) -> PageMetadata {
    PageMetadata {
        category: first_text(document, &CATEGORY_SELECTOR),
        sub_category: first_text(document, &CHANNEL_SELECTOR),
        title: first_text(document, &TITLE_SELECTOR),
    }
}

/// Source of the first iframe pointing at a known video host
#[inline]
pub fn extract_video_url(document: &Html, markers: &[String]) -> Option<String> {
    document
        .select(&IFRAME_SELECTOR)
        .filter_map(|iframe| iframe.value().attr("src"))
        .find(|src| markers.iter().any(|marker| src.contains(marker.as_str())))
        .map(str::to_string)
}

/// Trimmed text of the first element matching `selector`, if it is not blank
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    let element = document.select(selector).next()?;
    let text = element.text().collect::<String>();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn find_main_content(document: &Html) -> ElementRef<'_> {
    for selector_str in MAIN_CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                debug!("Found main content using selector: {}", selector_str);
                return element;
            }
        }
    }

    document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element())
}

fn extract_text_recursive(element: ElementRef, content: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            match child_element.value().name() {
                // Boilerplate
                "script" | "style" | "noscript" | "nav" | "header" | "footer" | "aside"
                | "form" | "iframe" | "button" | "svg" | "template" => {}

                "br" => content.push('\n'),

                "p" | "div" | "section" | "article" | "main" | "blockquote" | "li" | "ul"
                | "ol" | "pre" | "table" | "tr" | "figure" | "figcaption" | "h1" | "h2" | "h3"
                | "h4" | "h5" | "h6" => {
                    content.push('\n');
                    extract_text_recursive(child_element, content);
                    content.push('\n');
                }

                "td" | "th" => {
                    extract_text_recursive(child_element, content);
                    content.push(' ');
                }

                _ => extract_text_recursive(child_element, content),
            }
        } else if let Some(text_node) = child.value().as_text() {
            content.push_str(text_node);
        }
    }
}

/// Collapse runs of whitespace within lines and drop blank lines
fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
