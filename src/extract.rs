use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A link from a listing page to one entity's detail page
#[derive(Debug, Clone, PartialEq)]
pub struct DetailLink {
    pub href: Url,
    pub label: String,
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first element matching `css`
pub fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next().map(element_text)
}

/// Trimmed attribute value of the first element matching `css`
pub fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
}

/// First anchor under `scope` whose href contains `needle`
pub fn first_href_containing(document: &Html, scope: &str, needle: &str) -> Option<String> {
    first_attr(document, &format!(r#"{} a[href*="{}"]"#, scope, needle), "href")
}

/// Anchors matching `css`, resolved against `base`, in document order.
///
/// Anchors without a usable href are skipped.
pub fn links_matching(document: &Html, css: &str, base: &Url) -> Vec<DetailLink> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            match base.join(href) {
                Ok(url) => Some(DetailLink {
                    href: url,
                    label: element_text(anchor),
                }),
                Err(e) => {
                    log::warn!("Skipping unusable link '{}': {}", href, e);
                    None
                }
            }
        })
        .collect()
}

/// Anchors whose href matches `pattern`, like mechanize's `links_with(href:)`.
pub fn links_with_href(document: &Html, pattern: &regex::Regex, base: &Url) -> Vec<DetailLink> {
    links_matching(document, "a[href]", base)
        .into_iter()
        .filter(|link| pattern.is_match(link.href.as_str()))
        .collect()
}

/// Target of the first anchor whose text is exactly `label`
pub fn link_with_text(document: &Html, label: &str, base: &Url) -> Option<Url> {
    let selector = Selector::parse("a[href]").ok()?;
    document
        .select(&selector)
        .find(|anchor| element_text(*anchor) == label)
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| base.join(href.trim()).ok())
}
