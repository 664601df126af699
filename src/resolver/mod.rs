//! Page resolvers for crawl invocations.
//!
//! A crawl fetches pages through a [`PageResolver`], which abstracts "get
//! this page's bytes" behind two implementations:
//!
//! - [`HttpResolver`] - hits the network, caching every page it fetches
//!   under the crawl's HTML directory
//! - [`ReplayResolver`] - serves previously-cached HTML from disk and never
//!   performs network I/O
//!
//! The replay variant exists so a finished crawl can be re-analyzed offline
//! (e.g. re-extracting metadata with new selectors) without re-hitting the
//! site. Callers depend only on the trait, which also keeps the crawler
//! testable against canned byte payloads.
//!
//! # Object Safety
//!
//! The trait uses `async_trait` to support dynamic dispatch via
//! `Box<dyn PageResolver>`. Rust 2024 native async traits are not
//! object-safe, so `async_trait` is required here.

mod http;
pub mod paths;
mod replay;

pub use http::HttpResolver;
pub use replay::ReplayResolver;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::fetch::{FetchError, NameSource};

/// Derived identity and destination layout of one crawl invocation.
///
/// Constructed once per crawl from `(mainpage, content name, sub-section,
/// query)`. Downloaded content lands under `dest_content`, cached page HTML
/// under `dest_html`, and the audit logs at `dest_root`.
#[derive(Debug, Clone)]
pub struct ResolverPaths {
    /// Canonical request path of the primary overview page.
    pub http_path: String,
    /// Sanitized main-page name, used as the top-level directory.
    pub dirname_mainpage: String,
    /// Content name with `/` replaced, optionally prettified.
    pub dirname_name: String,
    /// Base directory of the crawl (defaults to the working directory).
    pub dest_root: PathBuf,
    /// Destination directory for downloaded content.
    pub dest_content: PathBuf,
    /// Destination directory for cached page HTML.
    pub dest_html: PathBuf,
}

impl ResolverPaths {
    /// Derives the crawl layout under the current working directory.
    #[must_use]
    pub fn new(mainpage: &str, name: &str, sub_side: &str, query: &str, pretty: bool) -> Self {
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_root(&root, mainpage, name, sub_side, query, pretty)
    }

    /// Derives the crawl layout under an explicit base directory.
    #[must_use]
    pub fn with_root(
        root: &Path,
        mainpage: &str,
        name: &str,
        sub_side: &str,
        query: &str,
        pretty: bool,
    ) -> Self {
        let http_path = paths::build_http_path(mainpage, sub_side, name, query);
        let dirname_mainpage = paths::strip_url(mainpage);
        let mut dirname_name = name.replace('/', "-");
        if pretty {
            dirname_name = paths::pretty_name(&dirname_name);
        }
        let dest_content = root.join(&dirname_mainpage).join(&dirname_name);
        let dest_html = root.join(&dirname_mainpage).join("html").join(&dirname_name);
        Self {
            http_path,
            dirname_mainpage,
            dirname_name,
            dest_root: root.to_path_buf(),
            dest_content,
            dest_html,
        }
    }
}

/// Fetches a crawl's pages and files, live or from cache.
#[async_trait]
pub trait PageResolver: Send {
    /// The crawl's derived identity and destination layout.
    fn paths(&self) -> &ResolverPaths;

    /// Timestamp of the most recently fetched/read page, for audit rows.
    fn last_date(&self) -> DateTime<Local>;

    /// Returns the bytes of the primary overview page.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on fatal transport or cache-write failures;
    /// a missing page yields empty bytes instead.
    async fn main_page(&mut self) -> Result<Vec<u8>, FetchError>;

    /// Returns a page's bytes, cached at `dest/filename`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on fatal transport or cache-write failures;
    /// a missing page yields empty bytes instead.
    async fn file(
        &mut self,
        url: &str,
        dest: &Path,
        filename: &str,
    ) -> Result<Vec<u8>, FetchError>;

    /// Returns one byte blob per URL of a logical unit.
    ///
    /// A single-page unit caches as `{logical_name}.html`; a unit spanning
    /// several pages suffixes a 2-digit page counter: `{logical_name}_pNN.html`.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`file`](Self::file).
    async fn html_files(
        &mut self,
        urls: &[String],
        logical_name: &str,
    ) -> Result<Vec<Vec<u8>>, FetchError> {
        let dest = self.paths().dest_html.clone();
        if let [url] = urls {
            let page = self.file(url, &dest, &format!("{logical_name}.html")).await?;
            return Ok(vec![page]);
        }
        let mut pages = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            let filename = format!("{}_p{:02}.html", logical_name, index + 1);
            pages.push(self.file(url, &dest, &filename).await?);
        }
        Ok(pages)
    }

    /// Downloads a final content file to `dest_dir/filename`.
    ///
    /// The live variant performs the fetch with the given referer; the
    /// replay variant is a no-op returning `None`. A non-200 response also
    /// yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on fatal transport failures or when the
    /// write fails.
    async fn download(
        &mut self,
        url: &str,
        dest_dir: &Path,
        filename: &str,
        name_source: NameSource,
        referer: Option<&str>,
    ) -> Result<Option<PathBuf>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_layout_from_mainpage_and_name() {
        let paths = ResolverPaths::with_root(
            Path::new("/data"),
            "https://www.example.com",
            "nature",
            "",
            "",
            false,
        );
        assert_eq!(paths.dirname_mainpage, "example");
        assert_eq!(paths.dirname_name, "nature");
        assert_eq!(paths.http_path, "https://www.example.com/nature/");
        assert_eq!(paths.dest_content, Path::new("/data/example/nature"));
        assert_eq!(paths.dest_html, Path::new("/data/example/html/nature"));
    }

    #[test]
    fn test_paths_sanitize_slashes_in_name() {
        let paths = ResolverPaths::with_root(
            Path::new("/data"),
            "https://example.com",
            "sets/2024",
            "",
            "",
            false,
        );
        assert_eq!(paths.dirname_name, "sets-2024");
    }

    #[test]
    fn test_paths_pretty_name() {
        let paths = ResolverPaths::with_root(
            Path::new("/data"),
            "https://example.com",
            "red-panda",
            "",
            "",
            true,
        );
        assert_eq!(paths.dirname_name, "Red Panda");
    }
}
