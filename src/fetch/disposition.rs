//! Content-Disposition filename extraction.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)filename\*?=([^;]+)").expect("content-disposition filename regex is valid")
});

/// Extracts a filename from a `Content-Disposition` header value.
///
/// Matches `filename=` and `filename*=` case-insensitively, trims and
/// unquotes the value. RFC 5987 payloads (`charset''percent-encoded`) are
/// percent-decoded. Returns `None` when the header carries no usable name,
/// so callers fall back to their own filename.
#[must_use]
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let captured = FILENAME_PATTERN.captures(header)?.get(1)?.as_str();
    let name = captured.trim().trim_matches('"');

    // RFC 5987: UTF-8''some%20name.jpg
    if let Some((_, encoded)) = name.split_once("''") {
        if let Ok(decoded) = urlencoding::decode(encoded) {
            let decoded = decoded.trim();
            if !decoded.is_empty() {
                return Some(decoded.to_string());
            }
        }
    }

    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_filename() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="foo.png""#),
            Some("foo.png".to_string())
        );
    }

    #[test]
    fn test_unquoted_filename() {
        assert_eq!(
            filename_from_disposition("attachment; filename=foo.png"),
            Some("foo.png".to_string())
        );
    }

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(
            filename_from_disposition(r#"attachment; FILENAME="Foo.JPG""#),
            Some("Foo.JPG".to_string())
        );
    }

    #[test]
    fn test_rfc5987_encoded_filename_is_decoded() {
        assert_eq!(
            filename_from_disposition("attachment; filename*=UTF-8''some%20name.jpg"),
            Some("some name.jpg".to_string())
        );
    }

    #[test]
    fn test_missing_filename_yields_none() {
        assert_eq!(filename_from_disposition("attachment"), None);
    }

    #[test]
    fn test_trailing_parameters_are_cut() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="a.gif"; size=12"#),
            Some("a.gif".to_string())
        );
    }
}
