//! Package information files (`conaninfo.txt`).
//!
//! The file is INI-like: `[section]` headers followed by indented lines.
//! The resolution engine only needs the `recipe_hash` section, which records
//! the summary hash of the recipe a binary was built from; the remaining
//! sections are kept in order so the file renders back unchanged.
//!
//! ```text
//! [settings]
//!     arch=x86_64
//!     os=Linux
//!
//! [options]
//!     shared=False
//!
//! [recipe_hash]
//!     8d7ba0c3b1b5ab0a2b5a1e4e0b8dc1c3
//! ```

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::core::BinpmError;

/// Name of the package information file inside a package folder.
pub const PACKAGE_INFO_FILE: &str = "conaninfo.txt";

const RECIPE_HASH_SECTION: &str = "recipe_hash";

/// Parsed package information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    sections: BTreeMap<String, Vec<String>>,
}

impl PackageInfo {
    /// Minimal info carrying only a recipe hash.
    pub fn with_recipe_hash(recipe_hash: impl Into<String>) -> Self {
        let mut sections = BTreeMap::new();
        sections.insert(RECIPE_HASH_SECTION.to_string(), vec![recipe_hash.into()]);
        Self { sections }
    }

    /// Parses the INI-like text format.
    pub fn parse(text: &str) -> Result<Self, BinpmError> {
        let mut sections: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                sections.entry(name.to_string()).or_default();
                current = Some(name.to_string());
                continue;
            }
            let Some(section) = &current else {
                return Err(BinpmError::ParseError {
                    file: PACKAGE_INFO_FILE.to_string(),
                    reason: format!("line {} is outside of any section: '{line}'", number + 1),
                });
            };
            sections.entry(section.clone()).or_default().push(line.to_string());
        }

        Ok(Self { sections })
    }

    /// Summary hash of the recipe this binary was built from.
    pub fn recipe_hash(&self) -> Option<&str> {
        self.sections.get(RECIPE_HASH_SECTION)?.first().map(String::as_str)
    }

    /// Loads `conaninfo.txt` from a package folder.
    pub async fn load(folder: &Path) -> Result<Self> {
        let path = folder.join(PACKAGE_INFO_FILE);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read package info {}", path.display()))?;
        Ok(Self::parse(&content)?)
    }

    /// Writes `conaninfo.txt` into a package folder.
    pub async fn save(&self, folder: &Path) -> Result<()> {
        let path = folder.join(PACKAGE_INFO_FILE);
        tokio::fs::write(&path, self.to_string())
            .await
            .with_context(|| format!("Failed to write package info {}", path.display()))
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, lines) in &self.sections {
            writeln!(f, "[{name}]")?;
            for line in lines {
                writeln!(f, "    {line}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
