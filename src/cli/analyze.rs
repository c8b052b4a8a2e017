//! `binpm analyze`: run binary resolution over a dependency graph.
//!
//! ```bash
//! binpm analyze graph.json                     # reuse only, report MISSING
//! binpm analyze graph.json --build             # build everything
//! binpm analyze graph.json --build=missing     # build what has no binary
//! binpm analyze graph.json --build=zlib --build=outdated
//! binpm analyze graph.json --update --remote conan-center
//! binpm analyze graph.json --workspace binpm_ws.yml --format json
//! ```
//!
//! The command fails when a `--build` pattern matches no package, or when a
//! package ends up `MISSING`.

use anyhow::Result;
use clap::{ArgAction, Args, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use super::CommandContext;
use crate::binaries::{BinaryAnalyzer, BinaryReport};
use crate::build_mode::BuildMode;
use crate::cache::PackageCache;
use crate::core::BinpmError;
use crate::graph::{BinaryStatus, DepsGraph};
use crate::reference::RecipeReference;
use crate::remote::{FileRemoteManager, Registry};
use crate::workspace::Workspace;

/// Output format of the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per package.
    #[default]
    Text,
    /// The report as JSON.
    Json,
}

/// Decide the binary status of every package of a dependency graph.
#[derive(Args, Debug)]
pub struct AnalyzeCommand {
    /// JSON description of the dependency graph.
    graph: PathBuf,

    /// Build from source: bare `--build` builds everything; values are
    /// `missing`, `outdated`, `never` or a name/reference glob. Repeatable.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "",
        action = ArgAction::Append
    )]
    build: Option<Vec<String>>,

    /// Check remotes for newer binaries of cached packages.
    #[arg(short, long)]
    update: bool,

    /// Only look binaries up in this remote.
    #[arg(short, long)]
    remote: Option<String>,

    /// Workspace file listing editable packages.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl AnalyzeCommand {
    /// `--build` values with the bare flag folded in: `None` when absent,
    /// an empty list when bare.
    fn build_params(&self) -> Option<Vec<String>> {
        self.build
            .as_ref()
            .map(|values| values.iter().filter(|v| !v.is_empty()).cloned().collect())
    }

    /// Runs the analysis and prints the report.
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let build_mode = BuildMode::new(self.build_params().as_deref())?;
        let mut graph = DepsGraph::load(&self.graph).await?;
        let registry = Registry::load(&context.registry_path).await?;
        let workspace = match &self.workspace {
            Some(path) => Some(Workspace::load(path).await?),
            None => None,
        };
        let cache = PackageCache::new(&context.storage_path);
        let remote_manager = FileRemoteManager::new();

        debug!(
            graph = %self.graph.display(),
            storage = %context.storage_path.display(),
            "Analyzing {} nodes",
            graph.len()
        );

        BinaryAnalyzer::new(&cache, &remote_manager, &registry)
            .with_workspace(workspace.as_ref())
            .with_revisions(context.revisions_enabled)
            .evaluate_graph(&mut graph, &build_mode, self.update, self.remote.as_deref())
            .await?;

        let report = BinaryReport::from_graph(&graph);
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_text(&report),
        }

        let references: Vec<&RecipeReference> =
            graph.nodes().filter_map(|node| node.reference.as_ref()).collect();
        let unmatched = build_mode.unmatched_patterns(references.iter().copied());
        if !unmatched.is_empty() {
            return Err(BinpmError::Other {
                message: format!("No package matching '{}' pattern", unmatched.join("', '")),
            }
            .into());
        }

        let missing: Vec<_> = report.missing().collect();
        if let Some(first) = missing.first() {
            let names: Vec<_> = missing.iter().map(|entry| entry.reference.as_str()).collect();
            let name = first.reference.split('/').next().unwrap_or(&first.reference);
            return Err(BinpmError::Other {
                message: format!(
                    "Missing prebuilt package for '{}'. Try to build it from sources with '--build={}'",
                    names.join("', '"),
                    name
                ),
            }
            .into());
        }
        Ok(())
    }
}

fn print_text(report: &BinaryReport) {
    if report.packages.is_empty() {
        println!("No packages to resolve");
        return;
    }
    println!("{}", "Binary packages:".bold());
    for entry in &report.packages {
        let status = match entry.binary {
            Some(status) if status.is_reused() => status.to_string().green(),
            Some(status @ BinaryStatus::Missing) => status.to_string().red(),
            Some(status) => status.to_string().yellow(),
            None => "-".dimmed(),
        };
        let remote = entry.remote.as_deref().map(|r| format!("  {}", r.cyan())).unwrap_or_default();
        println!("    {}:{}  {}{}", entry.reference, entry.package_id, status, remote);
    }
}
