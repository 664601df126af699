//! Playlist generation and mapping-driven replacement.
//!
//! Playlists are plain `.m3u8` line lists plus a `.wpl` twin for players
//! that want XML. The mapping file is a semicolon-delimited CSV whose
//! columns name devices (`PC`, `IPod`, ...); each row maps one directory
//! prefix between devices. Retargeting rewrites playlist entries from the
//! source column's prefix to the output column's, optionally converting or
//! copying the referenced files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::rename::file_has_ext;
use crate::transcode::{self, AUDIO_EXTENSIONS, ToolError};

/// Errors raised by playlist maintenance.
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// The mapping file could not be parsed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error.
    #[error("io error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The transcoder failed while converting an entry.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

fn io_error(path: &Path, source: std::io::Error) -> PlaylistError {
    PlaylistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Reads the mapping file into keyed rows (column name -> value).
///
/// # Errors
///
/// Returns [`PlaylistError`] when the file cannot be read or parsed.
pub fn read_mapping(path: &Path) -> Result<Vec<HashMap<String, String>>, PlaylistError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(PlaylistError::Csv)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Applies every mapping pair as a text replacement across the tree.
///
/// The mapping file's first two columns are the old/new pair (`reverse`
/// swaps them). Comment lines starting with `#` are left alone, the
/// mapping file itself is skipped, and files that are not UTF-8 text are
/// skipped with a warning.
///
/// # Errors
///
/// Returns [`PlaylistError`] when the mapping cannot be read or a rewrite
/// fails.
pub fn replace_in_tree(root: &Path, mapping: &Path, reverse: bool) -> Result<(), PlaylistError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_path(mapping)
        .map_err(PlaylistError::Csv)?;
    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(old), Some(new)) = (record.get(0), record.get(1)) else {
            continue;
        };
        if reverse {
            pairs.push((new.to_string(), old.to_string()));
        } else {
            pairs.push((old.to_string(), new.to_string()));
        }
    }

    let mapping_name = mapping.file_name();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|source| io_error(&dir, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&dir, source))?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            if path.file_name() == mapping_name {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                warn!(path = %path.display(), "not utf-8 text, skipping");
                continue;
            };
            let mut rewritten = String::with_capacity(content.len());
            for line in content.split_inclusive('\n') {
                if line.starts_with('#') {
                    rewritten.push_str(line);
                    continue;
                }
                let mut line = line.to_string();
                for (old, new) in &pairs {
                    line = line.replace(old, new);
                }
                rewritten.push_str(&line);
            }
            if rewritten != content {
                fs::write(&path, rewritten).map_err(|source| io_error(&path, source))?;
            }
        }
    }
    Ok(())
}

/// Writes an `.m3u8` playlist file.
fn write_playlist(path: &Path, lines: &[String]) -> Result<(), PlaylistError> {
    fs::write(path, lines.concat()).map_err(|source| io_error(path, source))
}

/// Writes the `.wpl` twin of a playlist.
///
/// `path` may carry the `.m3u8` extension; the twin replaces it.
fn write_wpl(path: &Path, lines: &[String]) -> Result<(), PlaylistError> {
    let path = path.with_extension("wpl");
    let title = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let mut out = String::new();
    out.push_str("<?wpl version=\"1.0\"?>\n");
    out.push_str("<smil><head><author/>\n");
    out.push_str(&format!("<title>{title}</title>\n"));
    out.push_str("</head><body><seq>\n");
    for line in lines {
        if !line.starts_with('#') {
            out.push_str(&format!("<media src=\"{}\"/>\n", line.trim()));
        }
    }
    out.push_str("</seq></body></smil>\n");
    fs::write(&path, out).map_err(|source| io_error(&path, source))
}

/// Builds one playlist per directory holding audio files.
///
/// Each directory under `root` with audio files gets
/// `root/playlists/{dirname}.m3u8` and its `.wpl` twin, plus a sorted
/// `combined.m3u8` over everything. Returns the number of playlists
/// written (excluding the combined one).
///
/// # Errors
///
/// Returns [`PlaylistError`] when walking or writing fails.
pub fn folders_to_playlist(root: &Path) -> Result<usize, PlaylistError> {
    let out_dir = root.join("playlists");
    fs::create_dir_all(&out_dir).map_err(|source| io_error(&out_dir, source))?;

    let mut all_lines: Vec<String> = Vec::new();
    let mut written = 0;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        if dir == out_dir {
            continue;
        }
        let mut lines: Vec<String> = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|source| io_error(&dir, source))?;
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&dir, source))?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Some(filename) = path.file_name().and_then(|name| name.to_str())
                && file_has_ext(filename, &AUDIO_EXTENSIONS, true)
            {
                lines.push(format!("{}\n", path.display()));
            }
        }
        if lines.is_empty() {
            continue;
        }
        lines.sort();
        let basename = dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("playlist");
        let playlist = out_dir.join(format!("{basename}.m3u8"));
        write_playlist(&playlist, &lines)?;
        write_wpl(&playlist, &lines)?;
        info!(playlist = %playlist.display(), entries = lines.len(), "playlist written");
        written += 1;
        all_lines.extend(lines);
    }
    all_lines.sort();
    write_playlist(&out_dir.join("combined.m3u8"), &all_lines)?;
    Ok(written)
}

/// Options for retargeting playlists to another device.
#[derive(Debug, Clone)]
pub struct RetargetOptions {
    /// Mapping column (and output directory name) of the target device.
    pub output: String,
    /// Only playlists whose name contains this are processed (empty: all).
    pub include_only: String,
    /// Convert convertible entries to MP3 for the `IPod` target.
    pub convert: bool,
    /// Copy referenced files to their retargeted location.
    pub copy: bool,
    /// Mapping column naming paths valid on this machine.
    pub source_key: String,
    /// Extensions converted to `.mp3` for the `IPod` target.
    pub convertible_exts: Vec<String>,
}

impl RetargetOptions {
    /// Options for the given target column with the usual defaults.
    #[must_use]
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            include_only: String::new(),
            convert: true,
            copy: false,
            source_key: "PC".to_string(),
            convertible_exts: vec![".m4a".to_string(), ".flac".to_string(), ".wav".to_string()],
        }
    }
}

/// Retargets the top-level playlists under `root` to another device.
///
/// Every non-comment entry that exists on disk and matches a mapping row's
/// source prefix is rewritten to the output column's prefix; for the
/// `IPod` target, convertible extensions additionally become `.mp3` and are
/// transcoded on demand. Entries without a mapping row or pointing at
/// missing files are logged and kept as-is. The rewritten playlists, their
/// `.wpl` twins and a combined pair land in `root/{output}`.
///
/// # Errors
///
/// Returns [`PlaylistError`] when the mapping cannot be read, a playlist
/// cannot be written, or a conversion/copy fails.
pub fn replace_playlists(
    root: &Path,
    mapping: &Path,
    options: &RetargetOptions,
) -> Result<(), PlaylistError> {
    let out_dir = root.join(&options.output);
    fs::create_dir_all(&out_dir).map_err(|source| io_error(&out_dir, source))?;
    let mapping_rows = read_mapping(mapping)?;

    let mut all_lines: Vec<String> = Vec::new();
    let entries = fs::read_dir(root).map_err(|source| io_error(root, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| io_error(root, source))?;
        let path = entry.path();
        if path.is_dir() || path.file_name() == mapping.file_name() {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !options.include_only.is_empty() && !filename.contains(&options.include_only) {
            continue;
        }
        let Ok(content) = fs::read_to_string(&path) else {
            warn!(path = %path.display(), "not utf-8 text, skipping");
            continue;
        };

        let mut outlines: Vec<String> = Vec::new();
        for raw_line in content.split_inclusive('\n') {
            let line = retarget_line(raw_line, &mapping_rows, options)?;
            if !outlines.contains(&line) {
                outlines.push(line.clone());
            }
            if !all_lines.contains(&line) {
                all_lines.push(line);
            }
        }
        let playlist = out_dir.join(filename);
        write_playlist(&playlist, &outlines)?;
        write_wpl(&playlist, &outlines)?;
    }

    write_playlist(&out_dir.join("combined.m3u8"), &all_lines)?;
    write_wpl(&out_dir.join("combined.m3u8"), &all_lines)?;
    Ok(())
}

fn retarget_line(
    raw_line: &str,
    mapping_rows: &[HashMap<String, String>],
    options: &RetargetOptions,
) -> Result<String, PlaylistError> {
    if raw_line.starts_with('#') {
        return Ok(raw_line.to_string());
    }
    let name_org = raw_line.trim();
    if name_org.is_empty() {
        return Ok(raw_line.to_string());
    }
    if !Path::new(name_org).is_file() {
        warn!(entry = name_org, "playlist entry does not exist");
        return Ok(raw_line.to_string());
    }
    let Some(row) = mapping_rows
        .iter()
        .find(|row| {
            row.get(&options.source_key)
                .is_some_and(|prefix| !prefix.is_empty() && raw_line.contains(prefix))
        })
    else {
        warn!(entry = name_org, "destination not configured");
        return Ok(raw_line.to_string());
    };

    let source_prefix = row.get(&options.source_key).cloned().unwrap_or_default();
    let mut target_prefix = row.get(&options.output).cloned().unwrap_or_default();
    if target_prefix.is_empty() {
        target_prefix = source_prefix.clone();
    }

    let basename_start = raw_line
        .rfind(['/', '\\'])
        .map_or(0, |index| index + 1);
    let basename = &raw_line[basename_start..];

    let mut line = raw_line.to_string();
    if options.output == "IPod" {
        let ext = name_org
            .rfind('.')
            .map_or("", |index| &name_org[index..]);
        if options.convertible_exts.iter().any(|conv| conv == ext) {
            line = format!("{target_prefix}{basename}").replace(ext, ".mp3");
            let name_dest = line.trim().to_string();
            if options.convert && !Path::new(&name_dest).is_file() {
                transcode::convert_to_mp3(Path::new(name_org), Path::new(&name_dest))?;
            }
        }
    } else {
        line = format!("{target_prefix}{basename}");
    }

    if options.copy {
        let name_dest = line.trim().to_string();
        if target_prefix != source_prefix && !Path::new(&name_dest).is_file() {
            let dest = PathBuf::from(&name_dest);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
            }
            info!(from = name_org, to = %dest.display(), "copy");
            fs::copy(name_org, &dest).map_err(|source| io_error(&dest, source))?;
        }
    }
    Ok(line)
}
