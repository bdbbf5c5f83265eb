//! File placement helpers for writing EDI documents.

use crate::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Return `path` if it is free, else the first free `<stem>_<n>.<ext>` beside it
pub fn make_unique_filename(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n = 1usize;
    loop {
        let name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            debug!("{} exists, using {}", path.display(), candidate.display());
            return candidate;
        }
        n += 1;
    }
}

/// Write `contents` to a temporary file beside `path`, then move it into place
///
/// Readers never observe a partially written file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(Error::missing_input(parent.display().to_string()));
    }

    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| {
        Error::io(
            format!("Failed to create temporary file in {}", parent.display()),
            e,
        )
    })?;
    temp.write_all(contents.as_bytes())
        .and_then(|_| temp.flush())
        .map_err(|e| Error::io(format!("Failed to write {}", path.display()), e))?;

    temp.persist(path)
        .map_err(|e| Error::persist(path.display().to_string(), e.error))?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
