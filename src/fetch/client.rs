//! HTTP client wrapper for fetching pages and downloading files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{CONNECTION, CONTENT_DISPOSITION, COOKIE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument, warn};

use super::cookies::CookieInput;
use super::disposition::filename_from_disposition;
use super::error::FetchError;

/// Fixed delay before the single retry after a transport failure.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT_SECS: u64 = 30;
const READ_TIMEOUT_SECS: u64 = 300;

const USER_AGENT: &str = concat!("gallerist/", env!("CARGO_PKG_VERSION"));

/// Strategy for naming a downloaded file locally.
///
/// Selects which naming function produces the destination file name; see
/// [`crate::crawl::build_file_name`] for the full mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameSource {
    /// Derive the name from the file URL's path segment.
    #[default]
    Url,
    /// Derive the name from the response `Content-Disposition` header.
    Content,
    /// Derive the name from the explicit content name plus gallery counter.
    Name,
    /// Derive the name from the gallery index and title.
    Gallery,
}

/// HTTP client with caller-supplied cookie and header state.
///
/// Every request carries a forced `Connection: keep-alive` header. Transport
/// failures are retried exactly once after a fixed delay; a second failure
/// propagates. Non-200 responses are logged and returned (or raised in
/// strict mode), never retried.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    cookies: HashMap<String, String>,
    headers: HeaderMap,
    retry_delay: Duration,
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClient {
    /// Creates a client with no cookies and no extra headers.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cookies(None)
    }

    /// Creates a client carrying the given cookies on every request.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_cookies(cookies: Option<CookieInput>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            cookies: cookies.map(CookieInput::into_map).unwrap_or_default(),
            headers: HeaderMap::new(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Overrides the fixed retry delay (tests use short delays).
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Adds a header sent with every request.
    ///
    /// Invalid header names or values are logged and dropped.
    pub fn set_header(&mut self, name: &str, value: &str) {
        let parsed_name = name.parse::<reqwest::header::HeaderName>();
        let parsed_value = HeaderValue::from_str(value);
        match (parsed_name, parsed_value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(name, "dropping invalid header"),
        }
    }

    /// Sets or clears the `Referer` header sent with every request.
    pub fn set_referer(&mut self, referer: Option<&str>) {
        match referer {
            Some(value) => match HeaderValue::from_str(value) {
                Ok(value) => {
                    self.headers.insert(REFERER, value);
                }
                Err(_) => warn!(referer = value, "dropping invalid referer"),
            },
            None => {
                self.headers.remove(REFERER);
            }
        }
    }

    /// Issues a GET request with the client's cookies and headers.
    ///
    /// On a transport-level failure the request is retried exactly once
    /// after the fixed delay. A non-200 status is logged; with `do_throw`
    /// it becomes [`FetchError::HttpStatus`], otherwise the response is
    /// returned as-is for the caller to inspect.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] when both transport attempts fail,
    /// or [`FetchError::HttpStatus`] for a non-200 status in strict mode.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &str, do_throw: bool) -> Result<Response, FetchError> {
        self.fetch_with_referer(url, do_throw, None).await
    }

    /// Like [`fetch`](Self::fetch), with a per-request `Referer` override.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`fetch`](Self::fetch).
    pub async fn fetch_with_referer(
        &self,
        url: &str,
        do_throw: bool,
        referer: Option<&str>,
    ) -> Result<Response, FetchError> {
        debug!(url, "get");
        let response = match self.send(url, referer).await {
            Ok(response) => response,
            Err(error) => {
                warn!(url, %error, "transport failure, retrying once after delay");
                tokio::time::sleep(self.retry_delay).await;
                self.send(url, referer)
                    .await
                    .map_err(|source| FetchError::network(url, source))?
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url, status = status.as_u16(), "non-200 response");
            if do_throw {
                return Err(FetchError::http_status(url, status.as_u16()));
            }
        }
        Ok(response)
    }

    /// Fetches a page body, treating non-200 as "no content".
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] when both transport attempts fail or
    /// the body cannot be read.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.fetch(url, false).await?;
        if response.status() != StatusCode::OK {
            return Ok(Vec::new());
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::network(url, source))?;
        Ok(body.to_vec())
    }

    /// Downloads `url` into `dest_dir/filename`.
    ///
    /// A non-200 response yields `(status, None)` without touching disk.
    /// With [`NameSource::Content`], the `Content-Disposition` response
    /// header overrides the given filename when it carries a parsable name.
    /// The body is written in one piece; a failed write may leave a
    /// truncated file behind.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] for transport/body failures and
    /// [`FetchError::Io`] when the write fails.
    #[instrument(level = "debug", skip(self, dest_dir), fields(dest = %dest_dir.display()))]
    pub async fn download_file(
        &self,
        url: &str,
        dest_dir: &Path,
        filename: &str,
        name_source: NameSource,
        referer: Option<&str>,
    ) -> Result<(StatusCode, Option<PathBuf>), FetchError> {
        let response = self.fetch_with_referer(url, false, referer).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Ok((status, None));
        }

        let filename = if name_source == NameSource::Content {
            header_filename(&response).unwrap_or_else(|| filename.to_string())
        } else {
            filename.to_string()
        };

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::network(url, source))?;
        let path = dest_dir.join(filename);
        tokio::fs::write(&path, &body)
            .await
            .map_err(|source| FetchError::io(path.clone(), source))?;
        Ok((status, Some(path)))
    }

    async fn send(&self, url: &str, referer: Option<&str>) -> Result<Response, reqwest::Error> {
        let mut request = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .header(CONNECTION, "keep-alive");
        if let Some(cookie_header) = self.cookie_header() {
            request = request.header(COOKIE, cookie_header);
        }
        if let Some(referer) = referer
            && let Ok(value) = HeaderValue::from_str(referer)
        {
            request = request.header(REFERER, value);
        }
        request.send().await
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<_> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.sort();
        Some(pairs.join("; "))
    }
}

fn header_filename(response: &Response) -> Option<String> {
    let header = response.headers().get(CONTENT_DISPOSITION)?;
    let header = header.to_str().ok()?;
    filename_from_disposition(header)
}
