//! Live network resolver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::StatusCode;
use tracing::warn;

use crate::fetch::{CookieInput, FetchClient, FetchError, NameSource};

use super::{PageResolver, ResolverPaths};

/// Resolver that fetches pages over HTTP, caching each one on disk.
///
/// Owns the crawl's cookie/header state. Both destination directories are
/// created eagerly at construction; re-creating them is idempotent.
pub struct HttpResolver {
    paths: ResolverPaths,
    client: FetchClient,
    last_date: DateTime<Local>,
}

impl HttpResolver {
    /// Creates the resolver and its destination directories.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when a destination directory cannot be
    /// created.
    pub fn new(
        paths: ResolverPaths,
        cookies: Option<CookieInput>,
        headers: &HashMap<String, String>,
    ) -> Result<Self, FetchError> {
        let mut client = FetchClient::with_cookies(cookies);
        for (name, value) in headers {
            client.set_header(name, value);
        }
        Self::with_client(paths, client)
    }

    /// Creates the resolver around an existing client (tests shorten the
    /// retry delay this way).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when a destination directory cannot be
    /// created.
    pub fn with_client(paths: ResolverPaths, client: FetchClient) -> Result<Self, FetchError> {
        for dir in [&paths.dest_content, &paths.dest_html] {
            std::fs::create_dir_all(dir).map_err(|source| FetchError::io(dir.clone(), source))?;
        }
        Ok(Self {
            paths,
            client,
            last_date: Local::now(),
        })
    }
}

#[async_trait]
impl PageResolver for HttpResolver {
    fn paths(&self) -> &ResolverPaths {
        &self.paths
    }

    fn last_date(&self) -> DateTime<Local> {
        self.last_date
    }

    async fn main_page(&mut self) -> Result<Vec<u8>, FetchError> {
        self.last_date = Local::now();
        let url = self.paths.http_path.clone();
        self.client.fetch_bytes(&url).await
    }

    async fn file(
        &mut self,
        url: &str,
        dest: &Path,
        filename: &str,
    ) -> Result<Vec<u8>, FetchError> {
        self.last_date = Local::now();
        let response = self.client.fetch(url, false).await?;
        if response.status() != StatusCode::OK {
            warn!(url, status = response.status().as_u16(), "bad response, no page cached");
            return Ok(Vec::new());
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::network(url, source))?
            .to_vec();
        let path = dest.join(filename);
        tokio::fs::write(&path, &body)
            .await
            .map_err(|source| FetchError::io(path, source))?;
        Ok(body)
    }

    async fn download(
        &mut self,
        url: &str,
        dest_dir: &Path,
        filename: &str,
        name_source: NameSource,
        referer: Option<&str>,
    ) -> Result<Option<PathBuf>, FetchError> {
        self.last_date = Local::now();
        let (_, path) = self
            .client
            .download_file(url, dest_dir, filename, name_source, referer)
            .await?;
        Ok(path)
    }
}
