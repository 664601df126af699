//! HTML link and text extraction.
//!
//! Thin wrappers over `scraper`: parse a page's bytes leniently, run a CSS
//! selector, and collect either link attributes or text content. Empty
//! input is normal during a crawl (failed fetches yield empty pages) and
//! produces an empty result rather than an error.

use scraper::{Html, Selector};
use thiserror::Error;

/// Errors raised by the extraction helpers.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The CSS selector string did not parse.
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector {
        /// The offending selector string.
        selector: String,
        /// Parser diagnostic.
        message: String,
    },
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|error| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        message: error.to_string(),
    })
}

/// Extracts link targets from the elements matching `selector`.
///
/// For each match the `href` attribute is preferred, falling back to `src`.
/// Empty values and values not containing `contains` are dropped (an empty
/// `contains` matches everything). An empty page yields an empty list.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidSelector`] when the selector fails to
/// parse.
pub fn links(page: &[u8], selector: &str, contains: &str) -> Result<Vec<String>, ExtractError> {
    if page.is_empty() {
        return Ok(Vec::new());
    }
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(&String::from_utf8_lossy(page));
    Ok(document
        .select(&selector)
        .filter_map(|element| {
            let value = element.value();
            value.attr("href").or_else(|| value.attr("src"))
        })
        .filter(|href| !href.is_empty() && href.contains(contains))
        .map(str::to_string)
        .collect())
}

/// Extracts the text content of the elements matching `selector`.
///
/// An empty page or an empty selector yields an empty list.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidSelector`] when the selector fails to
/// parse.
pub fn text(page: &[u8], selector: &str) -> Result<Vec<String>, ExtractError> {
    if page.is_empty() || selector.is_empty() {
        return Ok(Vec::new());
    }
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(&String::from_utf8_lossy(page));
    Ok(document
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_links_prefers_href_and_falls_back_to_src() {
        let page = br#"<html><body>
            <a href="/g/one">first</a>
            <a src="/g/two">second</a>
        </body></html>"#;
        let found = links(page, "a", "").unwrap();
        assert_eq!(found, vec!["/g/one".to_string(), "/g/two".to_string()]);
    }

    #[test]
    fn test_links_applies_contains_filter() {
        let page = br#"<html><body>
            <a href="prefix-x-suffix">keep</a>
            <a src="y">drop</a>
        </body></html>"#;
        let found = links(page, "a", "x").unwrap();
        assert_eq!(found, vec!["prefix-x-suffix".to_string()]);
    }

    #[test]
    fn test_links_drops_elements_without_href_or_src() {
        let page = br#"<html><body><a name="anchor">no link</a></body></html>"#;
        assert!(links(page, "a", "").unwrap().is_empty());
    }

    #[test]
    fn test_links_empty_page_yields_empty() {
        assert!(links(b"", "a", "").unwrap().is_empty());
    }

    #[test]
    fn test_links_invalid_selector_is_an_error() {
        assert!(links(b"<html></html>", "a[", "").is_err());
    }

    #[test]
    fn test_links_scoped_selector() {
        let page = br#"<html><body>
            <div class="gallery"><a href="/g/in">in</a></div>
            <a href="/g/out">out</a>
        </body></html>"#;
        let found = links(page, "div.gallery a", "").unwrap();
        assert_eq!(found, vec!["/g/in".to_string()]);
    }

    #[test]
    fn test_text_collects_nested_content() {
        let page = br#"<html><head><title>My Site</title></head>
            <body><p class="desc">spring <b>set</b></p></body></html>"#;
        assert_eq!(text(page, "title").unwrap(), vec!["My Site".to_string()]);
        assert_eq!(text(page, "p.desc").unwrap(), vec!["spring set".to_string()]);
    }

    #[test]
    fn test_text_empty_page_or_selector_yields_empty() {
        assert!(text(b"", "title").unwrap().is_empty());
        assert!(text(b"<html></html>", "").unwrap().is_empty());
    }
}
