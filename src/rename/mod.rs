//! Bulk file renaming helpers.
//!
//! Straight-line wrappers around `std::fs` used by the manual curation
//! workflow: temp-suffix renames (the suffix is always an explicit
//! argument), moves into subdirectories, numbered-name generation, and
//! natural-sorted collection of `.jpg` files. The [`Renamer`] collector
//! supports dry runs that write a preview file instead of touching the
//! tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Renames `old` to `new` inside `dir`.
///
/// # Errors
///
/// Returns the underlying IO error when the rename fails.
pub fn rename_in_place(dir: &Path, old: &str, new: &str) -> io::Result<()> {
    fs::rename(dir.join(old), dir.join(new))
}

/// Moves `old` out of `dir` into `dir`'s parent under the name `new`.
///
/// # Errors
///
/// Returns the underlying IO error when the rename fails.
pub fn rename_to_parent(dir: &Path, old: &str, new: &str) -> io::Result<()> {
    let parent = dir.parent().unwrap_or(dir);
    fs::rename(dir.join(old), parent.join(new))
}

/// Appends `suffix` to one file's name.
///
/// # Errors
///
/// Returns the underlying IO error when the rename fails.
pub fn append_suffix(dir: &Path, filename: &str, suffix: &str) -> io::Result<()> {
    rename_in_place(dir, filename, &format!("{filename}{suffix}"))
}

/// Appends `suffix` to every file name under `root`, recursively.
///
/// Useful before a renumbering pass so new names cannot collide with old
/// ones.
///
/// # Errors
///
/// Returns the underlying IO error when walking or renaming fails.
pub fn append_suffix_all(root: &Path, suffix: &str) -> io::Result<()> {
    if !root.is_dir() {
        warn!(root = %root.display(), "not a directory");
        return Ok(());
    }
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            append_suffix_all(&path, suffix)?;
        } else if let Some(filename) = path.file_name().and_then(|name| name.to_str()) {
            append_suffix(root, filename, suffix)?;
        }
    }
    Ok(())
}

/// Strips a trailing `suffix` from one file's name.
///
/// A name not ending in the suffix is left unchanged.
///
/// # Errors
///
/// Returns the underlying IO error when the rename fails.
pub fn strip_suffix(dir: &Path, filename: &str, suffix: &str) -> io::Result<()> {
    match filename.strip_suffix(suffix) {
        Some(stripped) => rename_in_place(dir, filename, stripped),
        None => Ok(()),
    }
}

/// Moves `filename` from `dir` into `dir/sub`, creating the subdirectory.
///
/// A missing source file logs a warning and is skipped.
///
/// # Errors
///
/// Returns the underlying IO error when creating the subdirectory or
/// renaming fails.
pub fn move_to_subdir(dir: &Path, filename: &str, sub: &str) -> io::Result<()> {
    let target_dir = dir.join(sub);
    fs::create_dir_all(&target_dir)?;
    let source = dir.join(filename);
    if !source.is_file() {
        warn!(path = %source.display(), "file not found, nothing moved");
        return Ok(());
    }
    fs::rename(source, target_dir.join(filename))
}

/// Removes `dir` when it contains no entries.
///
/// # Errors
///
/// Returns the underlying IO error when reading or removing fails.
pub fn remove_if_empty(dir: &Path) -> io::Result<()> {
    if fs::read_dir(dir)?.next().is_none() {
        fs::remove_dir(dir)?;
    }
    Ok(())
}

/// Builds a numbered `.jpg` name: `base_DD_FF.jpg`.
///
/// The directory counter is zero-padded to `digits`, the file counter to 2.
/// An empty base drops the leading underscore.
#[must_use]
pub fn numbered_name(base: &str, dir_counter: usize, file_counter: usize, digits: usize) -> String {
    let prefix = if base.is_empty() {
        String::new()
    } else {
        format!("{base}_")
    };
    format!("{prefix}{dir_counter:0digits$}_{file_counter:02}.jpg")
}

/// Returns whether `filename` carries one of the given extensions.
#[must_use]
pub fn file_has_ext(filename: &str, extensions: &[&str], ignore_case: bool) -> bool {
    let Some(dot) = filename.rfind('.') else {
        return false;
    };
    let actual = &filename[dot..];
    extensions.iter().any(|ext| {
        if ignore_case {
            ext.eq_ignore_ascii_case(actual)
        } else {
            *ext == actual
        }
    })
}

/// Collects `.jpg` files under `root`, natural-sorted by file name.
///
/// With `recursive` unset only `root` itself is scanned. Each entry is the
/// containing directory plus the file name.
///
/// # Errors
///
/// Returns the underlying IO error when walking fails.
pub fn jpeg_files(root: &Path, recursive: bool) -> io::Result<Vec<(PathBuf, String)>> {
    let mut found = Vec::new();
    collect_jpegs(root, recursive, &mut found)?;
    found.sort_by(|a, b| natural_cmp(&a.1, &b.1));
    Ok(found)
}

fn collect_jpegs(
    dir: &Path,
    recursive: bool,
    found: &mut Vec<(PathBuf, String)>,
) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                collect_jpegs(&path, recursive, found)?;
            }
        } else if let Some(filename) = path.file_name().and_then(|name| name.to_str())
            && filename.contains(".jpg")
        {
            found.push((dir.to_path_buf(), filename.to_string()));
        }
    }
    Ok(())
}

/// Compares two names treating digit runs numerically.
///
/// `img2.jpg` orders before `img10.jpg`; equal numeric values fall back to
/// the longer digit run (more leading zeros) last.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(lc), Some(rc)) => {
                if lc.is_ascii_digit() && rc.is_ascii_digit() {
                    let lnum = take_digits(&mut left);
                    let rnum = take_digits(&mut right);
                    let ltrim = lnum.trim_start_matches('0');
                    let rtrim = rnum.trim_start_matches('0');
                    let order = ltrim
                        .len()
                        .cmp(&rtrim.len())
                        .then_with(|| ltrim.cmp(rtrim))
                        .then_with(|| lnum.len().cmp(&rnum.len()));
                    if order != Ordering::Equal {
                        return order;
                    }
                } else {
                    let order = lc.cmp(&rc);
                    if order != Ordering::Equal {
                        return order;
                    }
                    left.next();
                    right.next();
                }
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

/// Rename collector with dry-run support.
///
/// With `write` set, renames happen immediately. Without it, changed pairs
/// are collected and [`finish`](Self::finish) writes a tab-separated
/// `newNames.txt` preview at the root instead.
pub struct Renamer {
    write: bool,
    root: PathBuf,
    preview: Vec<(String, String)>,
}

impl Renamer {
    /// Creates a collector rooted at `root`.
    #[must_use]
    pub fn new(write: bool, root: &Path) -> Self {
        Self {
            write,
            root: root.to_path_buf(),
            preview: Vec::new(),
        }
    }

    /// Renames or records one file.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when an immediate rename fails.
    pub fn rename(&mut self, dir: &Path, old: &str, new: &str) -> io::Result<()> {
        if self.write {
            return rename_in_place(dir, old, new);
        }
        if old != new {
            self.preview.push((old.to_string(), new.to_string()));
        }
        Ok(())
    }

    /// Finishes the run; dry runs write the preview file.
    ///
    /// Returns the preview path when one was written.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when writing the preview fails.
    pub fn finish(self) -> io::Result<Option<PathBuf>> {
        if self.write {
            return Ok(None);
        }
        let mut out = String::new();
        for (old, new) in &self.preview {
            out.push_str(old);
            out.push('\t');
            out.push_str(new);
            out.push('\n');
        }
        let path = self.root.join("newNames.txt");
        fs::write(&path, out)?;
        Ok(Some(path))
    }
}
