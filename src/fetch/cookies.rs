//! Cookie passthrough for crawl invocations.
//!
//! Callers hand cookies over either as an already-built name/value map or as
//! a raw `Cookie:` header string copied out of browser dev tools. Both forms
//! collapse into the same map attached to every request.

use std::collections::HashMap;

/// Cookies supplied by the caller, in either accepted form.
#[derive(Debug, Clone)]
pub enum CookieInput {
    /// Name/value pairs.
    Map(HashMap<String, String>),
    /// A raw cookie header string, e.g. `session=abc; theme=dark`.
    Header(String),
}

impl CookieInput {
    /// Collapses the input into a name/value map.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        match self {
            Self::Map(map) => map,
            Self::Header(raw) => cookie_header_to_map(&raw),
        }
    }
}

impl From<HashMap<String, String>> for CookieInput {
    fn from(map: HashMap<String, String>) -> Self {
        Self::Map(map)
    }
}

impl From<&str> for CookieInput {
    fn from(raw: &str) -> Self {
        Self::Header(raw.to_string())
    }
}

/// Parses a raw cookie header string into a name/value map.
///
/// Pairs are `;`-separated; values keep embedded `=` characters and lose
/// surrounding quotes. Malformed fragments without `=` are dropped.
#[must_use]
pub fn cookie_header_to_map(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_to_map_basic_pairs() {
        let map = cookie_header_to_map("session=abc123; theme=dark");
        assert_eq!(map.get("session").map(String::as_str), Some("abc123"));
        assert_eq!(map.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn test_cookie_header_to_map_keeps_embedded_equals() {
        let map = cookie_header_to_map("token=a=b=c");
        assert_eq!(map.get("token").map(String::as_str), Some("a=b=c"));
    }

    #[test]
    fn test_cookie_header_to_map_strips_quotes() {
        let map = cookie_header_to_map(r#"name="quoted value""#);
        assert_eq!(map.get("name").map(String::as_str), Some("quoted value"));
    }

    #[test]
    fn test_cookie_header_to_map_drops_malformed_fragments() {
        let map = cookie_header_to_map("valid=1; malformed; =orphan");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("valid").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_cookie_input_header_form_collapses() {
        let input = CookieInput::from("a=1; b=2");
        let map = input.into_map();
        assert_eq!(map.len(), 2);
    }
}
