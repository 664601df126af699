//! External `ffmpeg` invocation for audio conversion and normalization.
//!
//! The transcoder shells out to an `ffmpeg` binary on the `PATH`. A missing
//! binary and a failed run are distinct errors; the failed-run variant
//! carries the exit code and stderr so the caller can report what the tool
//! said.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{info, warn};

/// Extensions the normalization pass picks up.
pub const AUDIO_EXTENSIONS: [&str; 4] = [".mp3", ".m4a", ".mp4", ".flv"];

/// Errors raised by the transcoder.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The external binary is not installed or not on the `PATH`.
    #[error("external tool is missing: {tool}")]
    Missing {
        /// Name of the missing binary.
        tool: String,
    },

    /// The external binary ran and failed.
    #[error("external tool failed: {tool} (code={code:?}) {stderr}")]
    Failed {
        /// Name of the binary.
        tool: String,
        /// Exit code, when the process was not killed by a signal.
        code: Option<i32>,
        /// Captured stderr, trimmed.
        stderr: String,
    },

    /// Filesystem error around an invocation.
    #[error("io error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Maps a file extension to the ffmpeg container format name.
#[must_use]
pub fn ext_to_format(ext: &str) -> &str {
    match ext {
        "m4a" | "mp4" => "mp4",
        other => other,
    }
}

/// Converts an audio file to 320k MP3, carrying metadata over.
///
/// # Errors
///
/// Returns [`ToolError`] when ffmpeg is missing or exits non-zero.
pub fn convert_to_mp3(input: &Path, output: &Path) -> Result<(), ToolError> {
    ensure_parent(output)?;
    info!(input = %input.display(), output = %output.display(), "convert to mp3");
    run_ffmpeg(|cmd| {
        cmd.arg("-i")
            .arg(input)
            .args(["-f", "mp3", "-b:a", "320k", "-map_metadata", "0", "-y"])
            .arg(output);
    })
}

/// Normalizes an audio file's loudness via the `loudnorm` filter.
///
/// The container format is derived from `ext` (without the dot).
///
/// # Errors
///
/// Returns [`ToolError`] when ffmpeg is missing or exits non-zero.
pub fn normalize_file(input: &Path, output: &Path, ext: &str) -> Result<(), ToolError> {
    ensure_parent(output)?;
    let format = ext_to_format(ext).to_string();
    run_ffmpeg(|cmd| {
        cmd.arg("-i")
            .arg(input)
            .args(["-filter:a", "loudnorm"])
            .args(["-f", &format, "-b:a", "260k", "-map_metadata", "0", "-y"])
            .arg(output);
    })
}

/// Normalizes every audio file under `root`, mirroring the tree into
/// `root/output`.
///
/// Files ffmpeg rejects are logged and skipped; the walk continues. Returns
/// the number of files normalized.
///
/// # Errors
///
/// Returns [`ToolError::Missing`] when ffmpeg is not installed, and
/// [`ToolError::Io`] when the walk or directory creation fails.
pub fn normalize_tree(root: &Path) -> Result<usize, ToolError> {
    let out_root = root.join("output");
    let mut normalized = 0;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        if dir.starts_with(&out_root) {
            continue;
        }
        let entries = std::fs::read_dir(&dir).map_err(|source| ToolError::Io {
            path: dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| ToolError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !crate::rename::file_has_ext(filename, &AUDIO_EXTENSIONS, true) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path.as_path());
            let output = out_root.join(relative);
            let ext = filename.rsplit('.').next().unwrap_or_default();
            match normalize_file(&path, &output, ext) {
                Ok(()) => normalized += 1,
                Err(error @ ToolError::Missing { .. }) => return Err(error),
                Err(error) => {
                    warn!(input = %path.display(), %error, "normalization failed, skipping");
                }
            }
        }
    }
    Ok(normalized)
}

fn ensure_parent(path: &Path) -> Result<(), ToolError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ToolError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn run_ffmpeg(configure: impl FnOnce(&mut Command)) -> Result<(), ToolError> {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-nostdin");
    configure(&mut cmd);
    let output = cmd.output().map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => ToolError::Missing {
            tool: "ffmpeg".to_string(),
        },
        _ => ToolError::Io {
            path: PathBuf::from("ffmpeg"),
            source: error,
        },
    })?;
    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: "ffmpeg".to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_to_format_maps_mp4_family() {
        assert_eq!(ext_to_format("m4a"), "mp4");
        assert_eq!(ext_to_format("mp4"), "mp4");
        assert_eq!(ext_to_format("mp3"), "mp3");
        assert_eq!(ext_to_format("flv"), "flv");
    }

    #[test]
    fn test_failed_error_carries_stderr() {
        let error = ToolError::Failed {
            tool: "ffmpeg".to_string(),
            code: Some(1),
            stderr: "unknown codec".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("unknown codec"));
    }
}
