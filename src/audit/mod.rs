//! Append-only CSV audit logs.
//!
//! Every crawl appends one row to `download1_names.csv` and one row per
//! gallery to `download2_galleries.csv`, both at the crawl root. The files
//! are semicolon-delimited, CRLF-terminated UTF-8; the header row is
//! written exactly once, when a log is first created, and each append
//! opens, writes and closes the file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

/// File name of the per-crawl log.
pub const CRAWL_LOG_NAME: &str = "download1_names.csv";

/// File name of the per-gallery log.
pub const GALLERY_LOG_NAME: &str = "download2_galleries.csv";

/// Errors raised while appending audit rows.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The log file could not be opened.
    #[error("cannot open audit log {path}: {source}")]
    Open {
        /// The log file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing or writing a row failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the log failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of the per-crawl log.
#[derive(Debug, Serialize)]
pub struct CrawlRecord {
    /// Sanitized main-page name.
    #[serde(rename = "dirname_mainpage")]
    pub dirname_mainpage: String,
    /// Content name directory.
    #[serde(rename = "dirname_name")]
    pub dirname_name: String,
    /// Number of galleries found on the overview pages.
    #[serde(rename = "number-of-galleries")]
    pub gallery_count: usize,
    /// Request path of the primary overview page.
    #[serde(rename = "download-source-name")]
    pub source: String,
    /// The overview page's `<title>` text.
    #[serde(rename = "download-title")]
    pub title: String,
    /// Joined description text from the overview page.
    #[serde(rename = "download-description")]
    pub description: String,
    /// Timestamp of the most recently fetched page.
    #[serde(rename = "download-date")]
    pub date: String,
}

/// One row of the per-gallery log.
#[derive(Debug, Serialize)]
pub struct GalleryRecord {
    /// Sanitized main-page name.
    #[serde(rename = "dirname_mainpage")]
    pub dirname_mainpage: String,
    /// Content name directory.
    #[serde(rename = "dirname_name")]
    pub dirname_name: String,
    /// Numbered gallery directory (`NNN_title`).
    #[serde(rename = "dirname_gallery")]
    pub dirname_gallery: String,
    /// Name of the gallery's first file.
    #[serde(rename = "filename")]
    pub filename: String,
    /// Number of file links in the gallery.
    #[serde(rename = "number-of-files")]
    pub file_count: usize,
    /// The gallery link as extracted from the overview page.
    #[serde(rename = "download-source-gallery")]
    pub source: String,
    /// Timestamp of the most recently fetched page.
    #[serde(rename = "download-date")]
    pub date: String,
    /// Joined tag text from the gallery page.
    #[serde(rename = "html_tags")]
    pub tags: String,
    /// Joined description text from the gallery page.
    #[serde(rename = "html_description")]
    pub description: String,
    /// Overview metadata text captured for this gallery.
    #[serde(rename = "overview_info")]
    pub overview_info: String,
}

/// Formats a timestamp the way audit rows carry it.
#[must_use]
pub fn format_date(date: DateTime<Local>) -> String {
    date.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Appends a row to the per-crawl log at `root`.
///
/// # Errors
///
/// Returns [`AuditError`] when the log cannot be opened or written.
pub fn append_crawl_record(root: &Path, record: &CrawlRecord) -> Result<(), AuditError> {
    append(&root.join(CRAWL_LOG_NAME), record)
}

/// Appends a row to the per-gallery log at `root`.
///
/// # Errors
///
/// Returns [`AuditError`] when the log cannot be opened or written.
pub fn append_gallery_record(root: &Path, record: &GalleryRecord) -> Result<(), AuditError> {
    append(&root.join(GALLERY_LOG_NAME), record)
}

fn append<T: Serialize>(path: &Path, record: &T) -> Result<(), AuditError> {
    let write_header = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AuditError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::CRLF)
        .has_headers(write_header)
        .from_writer(file);
    writer.serialize(record)?;
    writer.flush()?;
    Ok(())
}
