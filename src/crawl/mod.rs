//! Gallery crawler orchestration.
//!
//! Crawls a two-level page hierarchy: overview pages list galleries, each
//! gallery lists downloadable files. The crawler paginates the overview,
//! deduplicates gallery links, derives numbered destination directories and
//! file names per the configured [`NameSource`], appends the audit rows,
//! and downloads each file with the gallery page as referer.
//!
//! The crawl is strictly sequential: one page or file at a time, in
//! chronological gallery order (the site's newest-first ordering is
//! reversed). Missing data - an empty gallery, an unparsable header - skips
//! the affected unit and continues; only transport-level double failures
//! abort the crawl.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use crate::audit::{self, AuditError, CrawlRecord, GalleryRecord};
use crate::extract::{self, ExtractError};
use crate::fetch::{CookieInput, FetchClient, FetchError};
use crate::resolver::{HttpResolver, PageResolver, ReplayResolver, ResolverPaths, paths};

pub use crate::fetch::NameSource;

/// Errors that abort a crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Transport-level failure after the single retry, or a write failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A configured selector did not parse.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// An audit row could not be appended.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// A destination directory could not be created.
    #[error("cannot create {path}: {source}")]
    CreateDir {
        /// The directory that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Parameters of one crawl invocation.
///
/// Start from [`CrawlConfig::new`] and adjust fields with struct-update
/// syntax; the defaults mirror a plain "every `<a>` link" crawl.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Absolute root of the site, e.g. `https://example.com`.
    pub mainpage: String,
    /// Content name; selects the overview page and names the content dir.
    pub name: String,
    /// Optional sub-section between the root and the content name.
    pub sub_side: String,
    /// Ready-made query string appended to the overview request path.
    pub query: String,
    /// Selector for gallery links on overview pages.
    pub gallery_selector: String,
    /// Substring a gallery link must contain.
    pub gallery_contains: String,
    /// Selector for file links on gallery pages.
    pub file_selector: String,
    /// Substring a file link must contain.
    pub file_contains: String,
    /// URL segment index for deriving gallery titles.
    pub gallery_part: isize,
    /// URL segment index for deriving file names.
    pub file_part: isize,
    /// Extension override for derived file names.
    pub ext: String,
    /// Cookies attached to every request.
    pub cookies: Option<CookieInput>,
    /// Extra headers attached to every request.
    pub headers: HashMap<String, String>,
    /// Selector for additional overview page links (pagination).
    pub paginator: String,
    /// File naming strategy.
    pub name_source: NameSource,
    /// Resume marker: skip galleries until this title was seen.
    pub start_after: String,
    /// Prettify the content directory name.
    pub pretty: bool,
    /// Selector for the overview description text.
    pub description_selector: String,
    /// Selector for per-gallery description text.
    pub gallery_description_selector: String,
    /// Selector for per-gallery tag text.
    pub gallery_tags_selector: String,
    /// Selector for per-gallery metadata on the overview page.
    pub overview_info_selector: String,
    /// Dry run: compute and log, do not download.
    pub statistic_only: bool,
    /// Serve pages from the cached-HTML directory instead of the network.
    pub replay: bool,
    /// Crawl base directory; defaults to the working directory.
    pub root: Option<PathBuf>,
}

impl CrawlConfig {
    /// Creates a config for `mainpage`/`name` with default selectors.
    #[must_use]
    pub fn new(mainpage: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mainpage: mainpage.into(),
            name: name.into(),
            sub_side: String::new(),
            query: String::new(),
            gallery_selector: "a".to_string(),
            gallery_contains: String::new(),
            file_selector: "a".to_string(),
            file_contains: String::new(),
            gallery_part: -1,
            file_part: -1,
            ext: String::new(),
            cookies: None,
            headers: HashMap::new(),
            paginator: String::new(),
            name_source: NameSource::Url,
            start_after: String::new(),
            pretty: false,
            description_selector: String::new(),
            gallery_description_selector: String::new(),
            gallery_tags_selector: String::new(),
            overview_info_selector: String::new(),
            statistic_only: false,
            replay: false,
            root: None,
        }
    }

    fn resolver_paths(&self) -> ResolverPaths {
        match &self.root {
            Some(root) => ResolverPaths::with_root(
                root,
                &self.mainpage,
                &self.name,
                &self.sub_side,
                &self.query,
                self.pretty,
            ),
            None => ResolverPaths::new(
                &self.mainpage,
                &self.name,
                &self.sub_side,
                &self.query,
                self.pretty,
            ),
        }
    }
}

/// Counts reported by a finished crawl, also the dry-run output.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrawlReport {
    /// Galleries found on the overview pages.
    pub galleries: usize,
    /// Galleries skipped (resume marker, already downloaded, no files).
    pub galleries_skipped: usize,
    /// File links seen in processed galleries.
    pub files: usize,
    /// Files actually written to disk.
    pub downloaded: usize,
}

/// Runs a crawl with the resolver variant the config selects.
///
/// # Errors
///
/// Returns [`CrawlError`] for fatal transport failures, selector parse
/// failures, and audit/filesystem write failures.
pub async fn crawl(config: &CrawlConfig) -> Result<CrawlReport, CrawlError> {
    if Url::parse(&config.mainpage).is_err() {
        warn!(mainpage = %config.mainpage, "main page is not an absolute URL");
    }
    let paths = config.resolver_paths();
    let mut resolver: Box<dyn PageResolver> = if config.replay {
        Box::new(ReplayResolver::new(paths))
    } else {
        Box::new(HttpResolver::new(
            paths,
            config.cookies.clone(),
            &config.headers,
        )?)
    };
    crawl_with_resolver(config, resolver.as_mut()).await
}

/// Runs the crawl for each content name, in sorted order.
///
/// # Errors
///
/// Returns the first [`CrawlError`] encountered; earlier reports are lost
/// with it, matching the all-or-nothing behavior of a scripted batch.
pub async fn crawl_many(
    config: &CrawlConfig,
    names: &[String],
) -> Result<Vec<CrawlReport>, CrawlError> {
    let mut names = names.to_vec();
    names.sort();
    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        let config = CrawlConfig {
            name,
            ..config.clone()
        };
        reports.push(crawl(&config).await?);
    }
    Ok(reports)
}

/// Runs a crawl against an explicit resolver.
///
/// Exposed so offline tests can drive the orchestration with canned pages.
///
/// # Errors
///
/// Returns the same errors as [`crawl`].
#[instrument(skip_all, fields(name = %config.name))]
pub async fn crawl_with_resolver(
    config: &CrawlConfig,
    resolver: &mut dyn PageResolver,
) -> Result<CrawlReport, CrawlError> {
    let mut report = CrawlReport::default();

    // Overview page URLs: the primary request path plus any paginated pages.
    let mut urls = vec![resolver.paths().http_path.clone()];
    if !config.paginator.is_empty() {
        let main = resolver.main_page().await?;
        for href in extract::links(&main, &config.paginator, "")? {
            urls.push(paths::resolve_url(&href, &config.mainpage));
        }
    }

    let logical_name = resolver.paths().dirname_name.clone();
    let pages = resolver.html_files(&urls, &logical_name).await?;

    // Gallery links, deduplicated in first-occurrence order across pages.
    let mut galleries: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut overview_info: Vec<String> = Vec::new();
    for page in &pages {
        for href in extract::links(page, &config.gallery_selector, &config.gallery_contains)? {
            if seen.insert(href.clone()) {
                galleries.push(href);
            }
        }
        if !config.overview_info_selector.is_empty() {
            overview_info.extend(extract::text(page, &config.overview_info_selector)?);
        }
    }
    if galleries.is_empty() {
        warn!(name = %logical_name, "no galleries found");
        return Ok(report);
    }
    // The site lists newest first; process chronologically.
    galleries.reverse();
    overview_info.reverse();
    report.galleries = galleries.len();

    let first_page = pages.first().map_or(&[] as &[u8], Vec::as_slice);
    let title = extract::text(first_page, "title")?
        .into_iter()
        .next()
        .unwrap_or_default();
    let description = extract::text(first_page, &config.description_selector)?.join(", ");
    audit::append_crawl_record(
        &resolver.paths().dest_root,
        &CrawlRecord {
            dirname_mainpage: resolver.paths().dirname_mainpage.clone(),
            dirname_name: logical_name.clone(),
            gallery_count: galleries.len(),
            source: resolver.paths().http_path.clone(),
            title,
            description,
            date: audit::format_date(resolver.last_date()),
        },
    )?;

    let mut found = config.start_after.is_empty();
    for (index, gallery) in galleries.iter().enumerate() {
        let gallery_title = paths::strip_url(&paths::url_part(gallery, config.gallery_part));
        if !found {
            // Resume marker: skip silently up to and including the marked
            // gallery.
            found = config.start_after == gallery_title;
            report.galleries_skipped += 1;
            continue;
        }
        let dirname_gallery = format!("{:03}_{}", index + 1, gallery_title);
        let gallery_url = paths::resolve_url(gallery, &config.mainpage);
        let gallery_pages = resolver
            .html_files(&[gallery_url.clone()], &dirname_gallery)
            .await?;
        let gallery_page = gallery_pages.first().map_or(&[] as &[u8], Vec::as_slice);
        let file_urls = extract::links(gallery_page, &config.file_selector, &config.file_contains)?;

        if file_urls.is_empty() {
            warn!(gallery = %dirname_gallery, "no file urls found");
            report.galleries_skipped += 1;
            continue;
        }

        let dest_gallery = if file_urls.len() == 1 || config.name_source == NameSource::Gallery {
            resolver.paths().dest_content.clone()
        } else {
            let dest = resolver.paths().dest_content.join(&dirname_gallery);
            if dest.exists() {
                // An existing gallery directory means "already downloaded".
                report.galleries_skipped += 1;
                continue;
            }
            if !config.statistic_only {
                std::fs::create_dir_all(&dest).map_err(|source| CrawlError::CreateDir {
                    path: dest.clone(),
                    source,
                })?;
            }
            dest
        };
        info!(dest = %dest_gallery.display(), files = file_urls.len(), "gallery");
        report.files += file_urls.len();

        for (file_index, file_url) in file_urls.iter().enumerate() {
            let file_url = paths::resolve_url(file_url, &config.mainpage);
            let filename = build_file_name(
                &file_urls,
                file_index,
                config.file_part,
                &config.ext,
                &logical_name,
                index,
                &gallery_title,
                config.name_source,
            );
            if file_index == 0 {
                let gallery_description =
                    extract::text(gallery_page, &config.gallery_description_selector)?.join(", ");
                let gallery_tags =
                    extract::text(gallery_page, &config.gallery_tags_selector)?.join(", ");
                audit::append_gallery_record(
                    &resolver.paths().dest_root,
                    &GalleryRecord {
                        dirname_mainpage: resolver.paths().dirname_mainpage.clone(),
                        dirname_name: logical_name.clone(),
                        dirname_gallery: dirname_gallery.clone(),
                        filename: filename.clone(),
                        file_count: file_urls.len(),
                        source: gallery.clone(),
                        date: audit::format_date(resolver.last_date()),
                        tags: gallery_tags,
                        description: gallery_description,
                        overview_info: overview_info.get(index).cloned().unwrap_or_default(),
                    },
                )?;
            }
            if !config.statistic_only
                && resolver
                    .download(
                        &file_url,
                        &dest_gallery,
                        &filename,
                        config.name_source,
                        Some(&gallery_url),
                    )
                    .await?
                    .is_some()
            {
                report.downloaded += 1;
            }
        }
    }
    Ok(report)
}

/// Builds a destination file name for one file of a gallery.
///
/// Pure mapping from `(strategy, context)` to a name:
/// - `Url`/`Content` derive from the file URL segment (`Content` may later
///   be overridden by the response header),
/// - `Gallery` yields `NNN_title`,
/// - `Name` yields `name_NNN` with the 1-based gallery counter.
///
/// Multi-file galleries append a 3-digit 1-based file counter before the
/// extension.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn build_file_name(
    file_urls: &[String],
    file_index: usize,
    part: isize,
    ext: &str,
    name: &str,
    gallery_index: usize,
    gallery_title: &str,
    name_source: NameSource,
) -> String {
    let file_url = file_urls.get(file_index).map_or("", String::as_str);
    match name_source {
        NameSource::Url | NameSource::Content => paths::url_to_filename(file_url, part, ext),
        NameSource::Gallery | NameSource::Name => {
            let base = if name_source == NameSource::Gallery {
                format!("{:03}_{}", gallery_index + 1, gallery_title)
            } else {
                format!("{}_{:03}", name, gallery_index + 1)
            };
            if file_urls.len() > 1 {
                format!("{}_{:03}{}", base, file_index + 1, ext)
            } else {
                format!("{base}{ext}")
            }
        }
    }
}

/// Parameters of a single-gallery download (no overview level).
#[derive(Debug, Clone)]
pub struct GalleryDownload {
    /// Absolute root of the site.
    pub mainpage: String,
    /// Sub-page holding the file links.
    pub subpage: String,
    /// Selector for file links.
    pub selector: String,
    /// Substring a file link must contain.
    pub contains: String,
    /// URL segment index for deriving file names.
    pub part: isize,
    /// Extension override for derived file names.
    pub ext: String,
    /// Cookies attached to every request.
    pub cookies: Option<CookieInput>,
    /// File naming strategy.
    pub name_source: NameSource,
    /// Base directory; defaults to the working directory.
    pub root: Option<PathBuf>,
}

impl GalleryDownload {
    /// Creates a config for `mainpage`/`subpage` with default selectors.
    #[must_use]
    pub fn new(mainpage: impl Into<String>, subpage: impl Into<String>) -> Self {
        Self {
            mainpage: mainpage.into(),
            subpage: subpage.into(),
            selector: "a".to_string(),
            contains: String::new(),
            part: -1,
            ext: String::new(),
            cookies: None,
            name_source: NameSource::Url,
            root: None,
        }
    }
}

/// Downloads every matched file of a single gallery page.
///
/// Creates `root/mainname/subpage`, saves the gallery page HTML alongside
/// the files, and downloads each matched link with the gallery as referer.
/// Returns the number of files written.
///
/// # Errors
///
/// Returns [`CrawlError`] for fatal transport, selector, and filesystem
/// failures.
pub async fn download_gallery(config: &GalleryDownload) -> Result<usize, CrawlError> {
    let root = match &config.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let subpage_dirname = config.subpage.replace('/', "-");
    let dest = root
        .join(paths::strip_url(&config.mainpage))
        .join(&subpage_dirname);
    std::fs::create_dir_all(&dest).map_err(|source| CrawlError::CreateDir {
        path: dest.clone(),
        source,
    })?;

    let client = FetchClient::with_cookies(config.cookies.clone());
    let gallery_url = paths::build_http_path(&config.mainpage, &config.subpage, "", "");
    let page = client.fetch_bytes(&gallery_url).await?;
    let file_urls = extract::links(&page, &config.selector, &config.contains)?;
    client
        .download_file(
            &gallery_url,
            &dest,
            &format!("{subpage_dirname}.html"),
            NameSource::Url,
            None,
        )
        .await?;

    let mut downloaded = 0;
    for file_url in file_urls {
        let file_url = paths::resolve_url(&file_url, &config.mainpage);
        let filename = paths::url_to_filename(&file_url, config.part, &config.ext);
        let stripped = paths::strip_query(&file_url).to_string();
        if client
            .download_file(
                &stripped,
                &dest,
                &filename,
                config.name_source,
                Some(&gallery_url),
            )
            .await?
            .1
            .is_some()
        {
            downloaded += 1;
        }
    }
    Ok(downloaded)
}

/// Probes numbered variants of a lazily-loaded first link.
///
/// Takes the first link matching `selector`/`contains` on `mainpage`, then
/// substitutes `0` in the `contains` fragment with 0..100, downloading each
/// variant until one fails. Returns the number of files written.
///
/// # Errors
///
/// Returns [`CrawlError`] for fatal transport, selector, and filesystem
/// failures.
pub async fn first_and_lazy_loaded(
    mainpage: &str,
    dirname: &str,
    selector: &str,
    contains: &str,
    cookies: Option<CookieInput>,
    root: Option<PathBuf>,
) -> Result<usize, CrawlError> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let dest = root.join(dirname);
    std::fs::create_dir_all(&dest).map_err(|source| CrawlError::CreateDir {
        path: dest.clone(),
        source,
    })?;

    let client = FetchClient::with_cookies(cookies);
    let page = client.fetch_bytes(mainpage).await?;
    let file_urls = extract::links(&page, selector, contains)?;
    let Some(first_url) = file_urls.first() else {
        warn!(mainpage, "no matching link to probe");
        return Ok(0);
    };

    let mut downloaded = 0;
    for counter in 0..100 {
        let contains_sub = contains.replace('0', &counter.to_string());
        let file_url = first_url.replace(contains, &contains_sub);
        let stripped = paths::strip_query(&file_url).to_string();
        let filename = paths::url_to_filename(&stripped, -1, "");
        let (_, path) = client
            .download_file(&stripped, &dest, &filename, NameSource::Url, Some(mainpage))
            .await?;
        if path.is_none() {
            break;
        }
        downloaded += 1;
    }
    Ok(downloaded)
}
