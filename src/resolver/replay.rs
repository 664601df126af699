//! Cached-HTML replay resolver.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::fetch::{FetchError, NameSource};

use super::{PageResolver, ResolverPaths};

/// Resolver that serves a previous crawl's cached HTML from disk.
///
/// Never performs network I/O; `last_date` reflects the modification time
/// of the file most recently read, so audit rows date back to the original
/// fetch.
pub struct ReplayResolver {
    paths: ResolverPaths,
    last_date: DateTime<Local>,
}

impl ReplayResolver {
    /// Creates a replay resolver over the crawl layout's HTML cache.
    #[must_use]
    pub fn new(paths: ResolverPaths) -> Self {
        Self {
            paths,
            last_date: Local::now(),
        }
    }

    fn read_cached(&mut self, path: &Path) -> Option<Vec<u8>> {
        if !path.is_file() {
            return None;
        }
        match std::fs::read(path) {
            Ok(bytes) => {
                if let Ok(metadata) = path.metadata()
                    && let Ok(modified) = metadata.modified()
                {
                    self.last_date = DateTime::from(modified);
                }
                Some(bytes)
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to read cached page");
                None
            }
        }
    }
}

#[async_trait]
impl PageResolver for ReplayResolver {
    fn paths(&self) -> &ResolverPaths {
        &self.paths
    }

    fn last_date(&self) -> DateTime<Local> {
        self.last_date
    }

    async fn main_page(&mut self) -> Result<Vec<u8>, FetchError> {
        let name = self.paths.dirname_name.clone();
        let single = self.paths.dest_html.join(format!("{name}.html"));
        if let Some(bytes) = self.read_cached(&single) {
            return Ok(bytes);
        }
        let paged = self.paths.dest_html.join(format!("{name}_p01.html"));
        if let Some(bytes) = self.read_cached(&paged) {
            return Ok(bytes);
        }
        warn!(path = %paged.display(), "cached main page not found");
        Ok(Vec::new())
    }

    async fn file(
        &mut self,
        _url: &str,
        dest: &Path,
        filename: &str,
    ) -> Result<Vec<u8>, FetchError> {
        let exact = dest.join(filename);
        if let Some(bytes) = self.read_cached(&exact) {
            return Ok(bytes);
        }
        warn!(path = %exact.display(), "cached page not found, trying hyphenated variant");
        let variant = dest.join(filename.replace(' ', "-").to_lowercase());
        if let Some(bytes) = self.read_cached(&variant) {
            return Ok(bytes);
        }
        warn!(path = %variant.display(), "cached page not found");
        Ok(Vec::new())
    }

    async fn download(
        &mut self,
        url: &str,
        _dest_dir: &Path,
        _filename: &str,
        _name_source: NameSource,
        _referer: Option<&str>,
    ) -> Result<Option<PathBuf>, FetchError> {
        // Replay mode re-analyzes cached pages only.
        debug!(url, "replay resolver skips downloads");
        Ok(None)
    }
}
