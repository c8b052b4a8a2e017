//! File-tree manifests.
//!
//! A manifest records a timestamp and one content hash per file of an
//! exported recipe or a built package. Two manifests are equal when their
//! file hashes are equal; the timestamp only decides which side is newer when
//! an update is considered.
//!
//! On disk the manifest is plain text: the unix timestamp on the first line,
//! then one `path: hash` line per file in path order.
//!
//! ```text
//! 1540000000
//! include/zlib.h: 1a79a4d60de6718e8e5b326e338ae533...
//! lib/libz.a: 7e240de74fb1ed08fa08d38063f6a6a9...
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::core::BinpmError;

/// Name of the manifest file inside export and package folders.
pub const MANIFEST_FILE: &str = "conanmanifest.txt";

/// Timestamped content hashes of a folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileTreeManifest {
    /// Unix timestamp (seconds) of the moment the manifest was created.
    pub time: u64,
    /// Relative path (with `/` separators) to hex content hash.
    pub file_sums: BTreeMap<String, String>,
}

impl PartialEq for FileTreeManifest {
    fn eq(&self, other: &Self) -> bool {
        self.file_sums == other.file_sums
    }
}

impl Eq for FileTreeManifest {}

impl FileTreeManifest {
    /// Creates a manifest from explicit values.
    pub fn new(time: u64, file_sums: BTreeMap<String, String>) -> Self {
        Self { time, file_sums }
    }

    /// Parses the textual manifest format.
    pub fn parse(text: &str) -> Result<Self, BinpmError> {
        let mut lines = text.lines();
        let time_line = lines.next().unwrap_or_default().trim();
        let time = time_line.parse::<u64>().map_err(|e| BinpmError::ParseError {
            file: MANIFEST_FILE.to_string(),
            reason: format!("invalid timestamp '{time_line}': {e}"),
        })?;

        let mut file_sums = BTreeMap::new();
        for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
            let (path, hash) = line.rsplit_once(": ").ok_or_else(|| BinpmError::ParseError {
                file: MANIFEST_FILE.to_string(),
                reason: format!("malformed entry '{line}'"),
            })?;
            file_sums.insert(path.to_string(), hash.to_string());
        }

        Ok(Self { time, file_sums })
    }

    /// Hash summarising all file hashes, independent of the timestamp.
    ///
    /// Used to detect whether a binary was built from the recipe currently
    /// in the cache.
    pub fn summary_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, hash) in &self.file_sums {
            hasher.update(format!("{path}: {hash}\n").as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Human readable form of [`FileTreeManifest::time`].
    pub fn time_str(&self) -> String {
        i64::try_from(self.time)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map_or_else(|| self.time.to_string(), |dt| dt.to_rfc3339())
    }

    /// Loads `conanmanifest.txt` from `folder`.
    pub async fn load(folder: &Path) -> Result<Self> {
        let path = folder.join(MANIFEST_FILE);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Ok(Self::parse(&content)?)
    }

    /// Writes `conanmanifest.txt` into `folder`.
    pub async fn save(&self, folder: &Path) -> Result<()> {
        let path = folder.join(MANIFEST_FILE);
        tokio::fs::write(&path, self.to_string())
            .await
            .with_context(|| format!("Failed to write manifest {}", path.display()))
    }
}

impl fmt::Display for FileTreeManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.time)?;
        for (path, hash) in &self.file_sums {
            writeln!(f, "{path}: {hash}")?;
        }
        Ok(())
    }
}
