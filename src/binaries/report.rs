use serde::Serialize;
use std::fmt;

use crate::graph::{BinaryStatus, DepsGraph};

/// Outcome of an analysis, one entry per non-root node.
#[derive(Debug, Clone, Serialize)]
pub struct BinaryReport {
    /// Entries in graph order.
    pub packages: Vec<BinaryReportEntry>,
}

/// Decision for one node.
#[derive(Debug, Clone, Serialize)]
pub struct BinaryReportEntry {
    /// Node label.
    pub id: String,
    /// Recipe reference.
    pub reference: String,
    /// Package id.
    pub package_id: String,
    /// Decided status, `None` when the analysis did not reach the node.
    pub binary: Option<BinaryStatus>,
    /// Remote the binary comes from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    /// Creation time of the newer remote binary, for `UPDATE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl BinaryReport {
    /// Collects the decisions recorded on `graph`.
    pub fn from_graph(graph: &DepsGraph) -> Self {
        let packages = graph
            .nodes()
            .filter_map(|node| {
                let reference = node.reference.as_ref()?;
                Some(BinaryReportEntry {
                    id: node.id.clone(),
                    reference: reference.to_string(),
                    package_id: node.recipe.package_id.clone(),
                    binary: node.binary,
                    remote: node.binary_remote.as_ref().map(|r| r.name.clone()),
                    update_time: node.update_manifest.as_ref().map(|m| m.time_str()),
                })
            })
            .collect();
        Self { packages }
    }

    /// Number of entries with `status`.
    pub fn count(&self, status: BinaryStatus) -> usize {
        self.packages.iter().filter(|entry| entry.binary == Some(status)).count()
    }

    /// Entries that can be neither reused nor built.
    pub fn missing(&self) -> impl Iterator<Item = &BinaryReportEntry> {
        self.packages.iter().filter(|entry| entry.binary == Some(BinaryStatus::Missing))
    }
}

impl fmt::Display for BinaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.packages {
            let status = entry.binary.map_or_else(|| "-".to_string(), |b| b.to_string());
            write!(f, "{}:{}  {}", entry.reference, entry.package_id, status)?;
            if let Some(remote) = &entry.remote {
                write!(f, "  {remote}")?;
            }
            if let Some(time) = &entry.update_time {
                write!(f, "  (remote built {time})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
