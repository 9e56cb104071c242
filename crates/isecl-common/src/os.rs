//! File system helpers for trust directories

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::Result;
use crate::search::wildcard_matched;

/// Read every regular file directly inside `dir` whose name matches the
/// wildcard `pattern`
///
/// Files are returned in file name order. Subdirectories are not descended.
///
/// # Errors
///
/// Returns an I/O error if `dir` does not exist or a matching file cannot
/// be read.
pub fn dir_file_contents(dir: impl AsRef<Path>, pattern: &str) -> Result<Vec<Vec<u8>>> {
    let dir = dir.as_ref();
    // surface a missing directory as NotFound instead of a walk error
    fs::metadata(dir)?;

    let mut contents = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !wildcard_matched(&name, pattern) {
            continue;
        }
        contents.push(fs::read(entry.path())?);
    }

    debug!(dir = %dir.display(), pattern, files = contents.len(), "Read directory contents");
    Ok(contents)
}
