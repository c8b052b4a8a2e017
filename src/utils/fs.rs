//! File system helpers.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Creates `path` and its parents if needed.
///
/// # Errors
///
/// Fails when the directory cannot be created or `path` exists but is not a
/// directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// Content goes to a sibling `.tmp` file that is synced to disk and then
/// renamed over the target, so readers never observe a partial write.
/// Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;
        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Converts a `file://` URL into a local path.
///
/// Returns `None` for any other scheme.
///
/// ```rust
/// use binpm::utils::fs::file_url_to_path;
/// use std::path::PathBuf;
///
/// assert_eq!(file_url_to_path("file:///srv/pkgs"), Some(PathBuf::from("/srv/pkgs")));
/// assert_eq!(file_url_to_path("https://example.com"), None);
/// ```
pub fn file_url_to_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("file://")?;
    // file:///C:/pkgs on Windows
    let rest = if cfg!(windows) {
        rest.strip_prefix('/').filter(|r| r.get(1..2) == Some(":")).unwrap_or(rest)
    } else {
        rest
    };
    if rest.is_empty() {
        return None;
    }
    Some(PathBuf::from(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/registry.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(!path.with_extension("tmp").exists());

        atomic_write(&path, b"[]").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_ensure_dir_rejects_files() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(ensure_dir(&file).is_err());
        ensure_dir(&temp.path().join("dir")).unwrap();
        assert!(temp.path().join("dir").is_dir());
    }

    #[test]
    fn test_file_url_to_path() {
        assert!(file_url_to_path("file://").is_none());
        assert!(file_url_to_path("ftp://host/x").is_none());
        #[cfg(unix)]
        assert_eq!(file_url_to_path("file:///tmp/x"), Some(PathBuf::from("/tmp/x")));
    }
}
