//! Pure URL/path string helpers shared by the resolver and crawler.
//!
//! These reproduce the toolkit's string-level URL handling: relative URLs
//! resolve by plain concatenation against the main-page root, and names are
//! derived by stripping scheme/host noise rather than by full URL parsing.

use tracing::warn;

/// Substrings removed when deriving a local name from a URL.
const NAME_NOISE: [&str; 6] = ["http://", "https://", "www.", ".com", ".de", ".html"];

/// Cuts the query string, if any, at the last `?`.
#[must_use]
pub fn strip_query(url: &str) -> &str {
    match url.rfind('?') {
        Some(index) => &url[..index],
        None => url,
    }
}

/// Derives a directory-safe name from a URL.
///
/// Strips the query string, then removes scheme, `www.` and common TLD /
/// extension noise.
#[must_use]
pub fn strip_url(url: &str) -> String {
    let mut name = strip_query(url).to_string();
    for noise in NAME_NOISE {
        name = name.replace(noise, "");
    }
    name
}

/// Resolves a possibly-relative URL against the main-page root.
///
/// URLs that do not start with an absolute scheme are resolved by plain
/// concatenation `root + url` when the root is itself absolute. With no
/// usable root the URL passes through unchanged, with a warning.
#[must_use]
pub fn resolve_url(url: &str, root: &str) -> String {
    if url.starts_with("http") {
        return url.to_string();
    }
    if root.starts_with("http") {
        return format!("{root}{url}");
    }
    warn!(url, "url does not start with http and no absolute root is configured");
    url.to_string()
}

/// Builds the request path for a crawl from its identity parts.
///
/// `/{sub_side}` and `/{name}` are appended when non-empty; a ready-made
/// query string follows unless the name segment already ends in `html`.
#[must_use]
pub fn build_http_path(mainpage: &str, sub_side: &str, name: &str, query: &str) -> String {
    let mut path = String::new();
    if !sub_side.is_empty() {
        path.push('/');
        path.push_str(sub_side);
    }
    if !name.is_empty() {
        path.push('/');
        path.push_str(name);
        if !name.ends_with("html") {
            path.push('/');
            path.push_str(query);
        }
    }
    resolve_url(&path, mainpage)
}

/// Selects a `/`-separated segment of the query-stripped URL.
///
/// Negative indices count from the end, like the original's slicing. An
/// out-of-range index logs a warning and yields an empty segment so the
/// caller's skip-and-continue policy holds.
#[must_use]
pub fn url_part(url: &str, part: isize) -> String {
    let stripped = strip_query(url);
    let segments: Vec<&str> = stripped.split('/').collect();
    let len = isize::try_from(segments.len()).unwrap_or(isize::MAX);
    let index = if part < 0 { len + part } else { part };
    let segment = usize::try_from(index)
        .ok()
        .and_then(|index| segments.get(index));
    match segment {
        Some(segment) => (*segment).to_string(),
        None => {
            warn!(url, part, "url has no segment at requested index");
            String::new()
        }
    }
}

/// Derives a local file name from a URL segment.
///
/// A non-empty `ext` replaces the segment's extension. An empty result
/// falls back to `index.html`.
#[must_use]
pub fn url_to_filename(url: &str, part: isize, ext: &str) -> String {
    let mut filename = url_part(url, part);
    if !ext.is_empty() {
        let stem = match filename.rfind('.') {
            Some(index) => &filename[..index],
            None => filename.as_str(),
        };
        filename = format!("{stem}{ext}");
    }
    if filename.is_empty() {
        filename = "index.html".to_string();
    }
    filename
}

/// Turns a hyphenated name into a display name.
///
/// `some-band-name` becomes `Some Band Name`.
#[must_use]
pub fn pretty_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_query_cuts_at_last_question_mark() {
        assert_eq!(strip_query("https://a.com/x?b=1?c=2"), "https://a.com/x?b=1");
        assert_eq!(strip_query("https://a.com/x"), "https://a.com/x");
    }

    #[test]
    fn test_strip_url_removes_scheme_and_noise() {
        assert_eq!(strip_url("https://www.example.com/galleries"), "example/galleries");
        assert_eq!(strip_url("http://pics.de/index.html?page=2"), "pics/index");
    }

    #[test]
    fn test_resolve_url_concatenates_relative_against_absolute_root() {
        assert_eq!(
            resolve_url("/g/123", "https://example.com"),
            "https://example.com/g/123"
        );
    }

    #[test]
    fn test_resolve_url_passes_absolute_urls_through() {
        assert_eq!(
            resolve_url("https://cdn.example.com/a.jpg", "https://example.com"),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn test_resolve_url_without_absolute_root_passes_through_unchanged() {
        assert_eq!(resolve_url("/g/123", ""), "/g/123");
        assert_eq!(resolve_url("/g/123", "example.com"), "/g/123");
    }

    #[test]
    fn test_build_http_path_assembles_parts() {
        assert_eq!(
            build_http_path("https://example.com", "galleries", "nature", "sort=new"),
            "https://example.com/galleries/nature/sort=new"
        );
    }

    #[test]
    fn test_build_http_path_skips_query_for_html_names() {
        assert_eq!(
            build_http_path("https://example.com", "", "overview.html", "sort=new"),
            "https://example.com/overview.html"
        );
    }

    #[test]
    fn test_build_http_path_empty_name_yields_root() {
        assert_eq!(build_http_path("https://example.com", "", "", ""), "https://example.com");
    }

    #[test]
    fn test_url_part_negative_index_counts_from_end() {
        assert_eq!(url_part("https://a.com/g/title/img.jpg", -1), "img.jpg");
        assert_eq!(url_part("https://a.com/g/title/img.jpg", -2), "title");
    }

    #[test]
    fn test_url_part_strips_query_before_splitting() {
        assert_eq!(url_part("https://a.com/g/img.jpg?size=big", -1), "img.jpg");
    }

    #[test]
    fn test_url_part_out_of_range_yields_empty() {
        assert_eq!(url_part("a/b", 10), "");
        assert_eq!(url_part("a/b", -10), "");
    }

    #[test]
    fn test_url_to_filename_replaces_extension() {
        assert_eq!(
            url_to_filename("https://a.com/g/photo.webp", -1, ".jpg"),
            "photo.jpg"
        );
    }

    #[test]
    fn test_url_to_filename_empty_segment_falls_back() {
        assert_eq!(url_to_filename("https://a.com/g/", -1, ""), "index.html");
    }

    #[test]
    fn test_pretty_name_capitalizes_hyphenated_parts() {
        assert_eq!(pretty_name("some-band-name"), "Some Band Name");
        assert_eq!(pretty_name("solo"), "Solo");
    }
}
