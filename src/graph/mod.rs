//! Dependency graph annotated with binary decisions.
//!
//! Nodes are stored in a petgraph [`DiGraph`] in insertion order, which is
//! also the order the resolution engine visits them. Edges point from a
//! consumer to its dependency and carry whether the requirement is private.
//!
//! Graphs are usually produced by the recipe loader; the CLI reads them from
//! a JSON description:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "app", "package_id": "" },
//!     { "id": "zlib", "reference": "zlib/1.2.11@conan/stable", "package_id": "9e186f6d" },
//!     { "id": "gtest", "reference": "gtest/1.8.0@conan/stable", "package_id": "a1b2",
//!       "build_policy": "missing", "short_paths": true }
//!   ],
//!   "edges": [
//!     { "from": "app", "to": "zlib" },
//!     { "from": "app", "to": "gtest", "private": true }
//!   ]
//! }
//! ```
//!
//! A node without `reference` is the root consumer and is never resolved.

use anyhow::{Context, Result};
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::Path;

use crate::build_mode::BuildPolicy;
use crate::core::BinpmError;
use crate::model::FileTreeManifest;
use crate::reference::{PackageReference, RecipeReference};
use crate::remote::Remote;

/// Index of a node in a [`DepsGraph`].
pub type NodeId = NodeIndex;

/// The recipe facts binary resolution depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recipe {
    /// Identifier of the binary configuration computed for this node.
    pub package_id: String,
    /// Whether the package folder may be redirected to a short path.
    pub short_paths: bool,
    /// Build policy declared by the recipe.
    pub build_policy: Option<BuildPolicy>,
}

/// Outcome of binary resolution for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BinaryStatus {
    /// Build from source.
    Build,
    /// Use the binary already in the local cache.
    Cache,
    /// Download the binary from a remote.
    Download,
    /// Replace the cached binary with a newer one from a remote.
    Update,
    /// No binary exists and building is not allowed.
    Missing,
    /// Not needed: only reached through a private dependency of a reused binary.
    Skip,
    /// Provided by a local workspace folder.
    Workspace,
}

impl BinaryStatus {
    /// Whether the status reuses an existing binary.
    pub const fn is_reused(self) -> bool {
        matches!(self, Self::Cache | Self::Download | Self::Update)
    }
}

impl fmt::Display for BinaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Build => "BUILD",
            Self::Cache => "CACHE",
            Self::Download => "DOWNLOAD",
            Self::Update => "UPDATE",
            Self::Missing => "MISSING",
            Self::Skip => "SKIP",
            Self::Workspace => "WORKSPACE",
        };
        f.write_str(text)
    }
}

/// A node of the dependency graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// Label of the node in its description.
    pub id: String,
    /// Recipe reference; `None` for the root consumer.
    pub reference: Option<RecipeReference>,
    /// Recipe facts.
    pub recipe: Recipe,
    /// Decided binary status.
    pub binary: Option<BinaryStatus>,
    /// Remote the binary comes from.
    pub binary_remote: Option<Remote>,
    /// Remote manifest recorded when the status is [`BinaryStatus::Update`].
    pub update_manifest: Option<FileTreeManifest>,
}

impl Node {
    /// Creates an unresolved node.
    pub fn new(id: impl Into<String>, reference: Option<RecipeReference>, recipe: Recipe) -> Self {
        Self {
            id: id.into(),
            reference,
            recipe,
            binary: None,
            binary_remote: None,
            update_manifest: None,
        }
    }

    /// Whether this is the root consumer.
    pub const fn is_root(&self) -> bool {
        self.reference.is_none()
    }

    /// Package reference of the node's binary, `None` for the root.
    pub fn package_reference(&self) -> Option<Result<PackageReference, BinpmError>> {
        self.reference.as_ref().map(|reference| {
            PackageReference::new(reference.clone(), &self.recipe.package_id).map_err(Into::into)
        })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{reference}"),
            None => write!(f, "{} (root)", self.id),
        }
    }
}

/// Requirement edge attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requirement {
    /// Private requirements are not propagated to consumers.
    pub private: bool,
}

/// Directed dependency graph.
#[derive(Debug, Clone, Default)]
pub struct DepsGraph {
    graph: DiGraph<Node, Requirement>,
}

impl DepsGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node; nodes are visited in the order they are added.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.graph.add_node(node)
    }

    /// Declares that `from` depends on `to`.
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId, private: bool) {
        self.graph.add_edge(from, to, Requirement { private });
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_weights()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Borrows a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.graph[id]
    }

    /// Mutably borrows a node.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.graph[id]
    }

    /// Finds a node by its description label.
    pub fn find(&self, label: &str) -> Option<NodeId> {
        self.graph.node_indices().find(|&id| self.graph[id].id == label)
    }

    /// Dependencies of `id` reached through private requirements, in edge
    /// declaration order.
    pub fn private_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(id, Direction::Outgoing)
            .filter(|edge| edge.weight().private)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(edge, _)| *edge);
        let mut seen = HashSet::new();
        edges.into_iter().map(|(_, target)| target).filter(|t| seen.insert(*t)).collect()
    }

    /// Every node reachable downstream of `id` (excluding `id`), following
    /// public and private requirements alike.
    pub fn full_closure(&self, id: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::from([id]);
        let mut closure = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if visited.insert(next) {
                    closure.push(next);
                    queue.push_back(next);
                }
            }
        }
        closure
    }

    /// Builds a graph from its JSON description.
    ///
    /// # Errors
    ///
    /// Fails on duplicate or unknown node ids, invalid references, reference
    /// nodes without a package id, and dependency cycles.
    pub fn from_description(description: GraphDescription) -> Result<Self, BinpmError> {
        let mut graph = Self::new();
        let mut ids: HashMap<String, NodeId> = HashMap::new();

        for node in description.nodes {
            if ids.contains_key(&node.id) {
                return Err(graph_error(format!("duplicate node id '{}'", node.id)));
            }
            let reference = match &node.reference {
                Some(text) => Some(text.parse::<RecipeReference>()?),
                None => None,
            };
            let recipe = Recipe {
                package_id: node.package_id,
                short_paths: node.short_paths,
                build_policy: node.build_policy,
            };
            let built = Node::new(node.id.clone(), reference, recipe);
            if let Some(package) = built.package_reference() {
                package?;
            }
            ids.insert(node.id, graph.add_node(built));
        }

        for edge in description.edges {
            let lookup = |label: &str| {
                ids.get(label)
                    .copied()
                    .ok_or_else(|| graph_error(format!("edge references unknown node '{label}'")))
            };
            let from = lookup(&edge.from)?;
            let to = lookup(&edge.to)?;
            graph.add_dependency(from, to, edge.private);
        }

        toposort(&graph.graph, None).map_err(|cycle| {
            graph_error(format!(
                "dependency cycle through '{}'",
                graph.graph[cycle.node_id()].id
            ))
        })?;

        Ok(graph)
    }

    /// Reads a JSON graph description from `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read graph {}", path.display()))?;
        let description: GraphDescription =
            serde_json::from_str(&content).map_err(|e| BinpmError::ParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_description(description)?)
    }
}

fn graph_error(message: String) -> BinpmError {
    BinpmError::GraphError { message }
}

/// Serialized form of a dependency graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDescription {
    /// Nodes in visiting order.
    pub nodes: Vec<NodeDescription>,
    /// Requirements between nodes.
    #[serde(default)]
    pub edges: Vec<EdgeDescription>,
}

/// Serialized node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescription {
    /// Unique label.
    pub id: String,
    /// Recipe reference text; absent for the root consumer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Package id of the binary configuration.
    #[serde(default)]
    pub package_id: String,
    /// Whether short paths are enabled for the package.
    #[serde(default)]
    pub short_paths: bool,
    /// Build policy declared by the recipe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_policy: Option<BuildPolicy>,
}

/// Serialized requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDescription {
    /// Consumer label.
    pub from: String,
    /// Dependency label.
    pub to: String,
    /// Whether the requirement is private.
    #[serde(default)]
    pub private: bool,
}
