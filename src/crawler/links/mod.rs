
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static GROUP_SECTION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.group-section").expect("valid selector"));
static SITEMAP_LISTING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.sitemap-listing").expect("valid selector"));
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Candidate links of a page, resolved against `base_url`, in document order.
///
/// Pages with sitemap group sections contribute only the links of each section's first
/// sitemap listing. Other pages contribute every link whose URL contains `site_domain`.
/// Fragments are stripped so `page#step2` and `page` name the same URL. URLs already in
/// `visited` are dropped; duplicates are kept.
#[inline]
pub fn extract_links(
    base_url: &Url,
    html: &str,
    site_domain: &str,
    visited: &HashSet<String>,
) -> Vec<String> {
    let document = Html::parse_document(html);
    let sections: Vec<ElementRef<'_>> = document.select(&GROUP_SECTION_SELECTOR).collect();

    let links: Vec<String> = if sections.is_empty() {
        resolve_all(document.select(&LINK_SELECTOR), base_url)
            .filter(|url| url.contains(site_domain))
            .filter(|url| !visited.contains(url))
            .collect()
    } else {
        sections
            .iter()
            .filter_map(|section| section.select(&SITEMAP_LISTING_SELECTOR).next())
            .flat_map(|listing| resolve_all(listing.select(&LINK_SELECTOR), base_url))
            .filter(|url| !visited.contains(url))
            .collect()
    };

    debug!(
        "Extracted {} links from {} ({} group sections)",
        links.len(),
        base_url,
        sections.len()
    );
    links
}

fn resolve_all<'a>(
    anchors: impl Iterator<Item = ElementRef<'a>> + 'a,
    base_url: &'a Url,
) -> impl Iterator<Item = String> + 'a {
    anchors
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(move |href| resolve_href(base_url, href))
}

fn resolve_href(base_url: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("javascript:")
        || href.starts_with("tel:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(mut url) => {
            url.set_fragment(None);
            Some(url.into())
        }
        Err(e) => {
            debug!(
                "Failed to resolve URL '{}' relative to '{}': {}",
                href, base_url, e
            );
            None
        }
    }
}
