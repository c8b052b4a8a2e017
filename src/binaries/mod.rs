//! Binary resolution: deciding where each package's binary comes from.
//!
//! For every node of a [`DepsGraph`] the [`BinaryAnalyzer`] picks one
//! [`BinaryStatus`]:
//!
//! - `BUILD` when a build is forced, or no binary exists and building is allowed
//! - `CACHE` when the binary is already in the local cache
//! - `UPDATE` when `--update` finds a newer binary on the remote
//! - `DOWNLOAD` when a remote has the binary and the cache does not
//! - `MISSING` when no binary exists and building is not allowed
//! - `WORKSPACE` when the package is an editable in the workspace
//! - `SKIP` when the node is only reachable through a private requirement of
//!   a package whose binary is reused
//!
//! # Passes
//!
//! Nodes are visited in graph insertion order, twice. The first pass only
//! evaluates nodes with private requirements; when such a node reuses a
//! binary, its private dependencies and everything below them are skipped.
//! The second pass evaluates everything still undecided. Root nodes and
//! nodes already decided are never evaluated again, so running the analysis
//! on an analyzed graph changes nothing.
//!
//! # Memoization
//!
//! Within one run, nodes sharing a package reference receive the current
//! status of the first one evaluated, without further cache or remote
//! access. If that node was skipped in the meantime, so are they.
//!
//! # Remotes
//!
//! The remote consulted for a package is, in order: the remote named on the
//! command line, the remote the binary was last retrieved from, the remote of
//! its recipe. When the binary is not cached the resolved remote is probed
//! first; the remaining remotes are tried afterwards only when revisions are
//! enabled or no remote was resolved. A remote answering "not found" or
//! "unavailable" moves on to the next candidate; any other remote error
//! aborts the analysis.

mod report;

pub use report::{BinaryReport, BinaryReportEntry};

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::build_mode::BuildMode;
use crate::cache::CacheStore;
use crate::core::BinpmError;
use crate::graph::{BinaryStatus, DepsGraph, NodeId, Recipe};
use crate::model::{FileTreeManifest, PackageInfo};
use crate::reference::PackageReference;
use crate::remote::{Remote, RemoteError, RemoteManager, RemoteRegistry};
use crate::workspace::Workspace;

/// State of one analysis run.
///
/// Built once per [`BinaryAnalyzer::evaluate_graph`] call: the explicit
/// remote is resolved up front, and the first node evaluated for each
/// package reference is remembered for the duration of the run.
#[derive(Debug)]
pub struct ResolutionContext {
    revisions_enabled: bool,
    remote: Option<Remote>,
    evaluated: HashMap<PackageReference, NodeId>,
}

impl ResolutionContext {
    /// Creates the context of a run.
    ///
    /// # Errors
    ///
    /// Returns [`BinpmError::UnknownRemote`] when `remote_name` is not a
    /// declared remote.
    pub fn new(
        registry: &dyn RemoteRegistry,
        remote_name: Option<&str>,
        revisions_enabled: bool,
    ) -> Result<Self, BinpmError> {
        let remote = match remote_name {
            Some(name) => Some(registry.remote(name).cloned().ok_or_else(|| {
                BinpmError::unknown_remote(name, registry.remotes().iter().map(|r| r.name.as_str()))
            })?),
            None => None,
        };
        Ok(Self {
            revisions_enabled,
            remote,
            evaluated: HashMap::new(),
        })
    }

    /// Remote named on the command line.
    pub fn explicit_remote(&self) -> Option<&Remote> {
        self.remote.as_ref()
    }

    /// Whether recipe revisions are tracked.
    pub const fn revisions_enabled(&self) -> bool {
        self.revisions_enabled
    }
}

/// Decision for one package reference.
struct Decision {
    binary: BinaryStatus,
    remote: Option<Remote>,
    update_manifest: Option<FileTreeManifest>,
}

impl Decision {
    const fn local(binary: BinaryStatus) -> Self {
        Self {
            binary,
            remote: None,
            update_manifest: None,
        }
    }
}

/// Decides the binary status of every node of a graph.
pub struct BinaryAnalyzer<'a> {
    cache: &'a dyn CacheStore,
    remote_manager: &'a dyn RemoteManager,
    registry: &'a dyn RemoteRegistry,
    workspace: Option<&'a Workspace>,
    revisions_enabled: bool,
}

impl<'a> BinaryAnalyzer<'a> {
    /// Creates an analyzer without workspace and with revisions disabled.
    pub fn new(
        cache: &'a dyn CacheStore,
        remote_manager: &'a dyn RemoteManager,
        registry: &'a dyn RemoteRegistry,
    ) -> Self {
        Self {
            cache,
            remote_manager,
            registry,
            workspace: None,
            revisions_enabled: false,
        }
    }

    /// Resolves editable packages to `WORKSPACE`.
    #[must_use]
    pub fn with_workspace(mut self, workspace: Option<&'a Workspace>) -> Self {
        self.workspace = workspace;
        self
    }

    /// Enables recipe revision tracking.
    #[must_use]
    pub fn with_revisions(mut self, enabled: bool) -> Self {
        self.revisions_enabled = enabled;
        self
    }

    /// Decides `binary` and `binary_remote` for every undecided node.
    ///
    /// # Errors
    ///
    /// Fails on an unknown `remote_name`, on invalid package references, on
    /// cache failures, and on remote errors other than "not found" and
    /// "unavailable". Nodes decided before the failure keep their status.
    pub async fn evaluate_graph(
        &self,
        graph: &mut DepsGraph,
        build_mode: &BuildMode,
        update: bool,
        remote_name: Option<&str>,
    ) -> Result<()> {
        let mut context =
            ResolutionContext::new(self.registry, remote_name, self.revisions_enabled)?;
        let ids: Vec<NodeId> = graph.node_ids().collect();

        for &id in &ids {
            if !is_pending(graph, id) {
                continue;
            }
            let private = graph.private_neighbors(id);
            if private.is_empty() {
                continue;
            }
            self.evaluate_node(&mut context, graph, id, build_mode, update).await?;
            if graph.node(id).binary.is_some_and(BinaryStatus::is_reused) {
                for neighbor in private {
                    skip(graph, neighbor);
                    for downstream in graph.full_closure(neighbor) {
                        skip(graph, downstream);
                    }
                }
            }
        }

        for &id in &ids {
            if is_pending(graph, id) {
                self.evaluate_node(&mut context, graph, id, build_mode, update).await?;
            }
        }
        Ok(())
    }

    async fn evaluate_node(
        &self,
        context: &mut ResolutionContext,
        graph: &mut DepsGraph,
        id: NodeId,
        build_mode: &BuildMode,
        update: bool,
    ) -> Result<()> {
        let node = graph.node(id);
        let Some(package) = node.package_reference().transpose()? else {
            return Ok(());
        };

        if let Some(&first) = context.evaluated.get(&package) {
            // The first node may have been skipped since it was decided.
            let (binary, remote) = {
                let first = graph.node(first);
                (first.binary, first.binary_remote.clone())
            };
            debug!(
                reference = %package,
                binary = ?binary,
                "Reusing decision of an identical package"
            );
            let node = graph.node_mut(id);
            node.binary = binary;
            node.binary_remote = remote;
            return Ok(());
        }

        let recipe = node.recipe.clone();
        let decision = self.decide(context, &package, &recipe, build_mode, update).await?;
        debug!(reference = %package, binary = %decision.binary, "Binary decided");

        context.evaluated.insert(package, id);
        let node = graph.node_mut(id);
        node.binary = Some(decision.binary);
        node.binary_remote = decision.remote;
        node.update_manifest = decision.update_manifest;
        Ok(())
    }

    async fn decide(
        &self,
        context: &ResolutionContext,
        package: &PackageReference,
        recipe: &Recipe,
        build_mode: &BuildMode,
        update: bool,
    ) -> Result<Decision> {
        let reference = package.recipe();
        if build_mode.forced(recipe, reference) {
            warn!(reference = %reference, "Forced build from source");
            return Ok(Decision::local(BinaryStatus::Build));
        }

        let folder = self.cache.package_folder(package, recipe.short_paths).await?;

        if let Some(local) = self.workspace.and_then(|workspace| workspace.lookup(reference)) {
            debug!(reference = %reference, path = %local.path.display(), "Using workspace package");
            return Ok(Decision::local(BinaryStatus::Workspace));
        }

        self.purge_if_dirty(package, &folder).await?;

        let remote = self.consulted_remote(context, package);
        let mut update_manifest = None;
        let mut binary_remote = remote.clone();
        let mut recipe_hash: Option<String> = None;

        let mut binary = if self.cache.package_exists(&folder).await? {
            let mut binary = BinaryStatus::Cache;
            if update {
                match &remote {
                    Some(remote) => {
                        if let Some(upstream) =
                            self.check_update(context, package, &folder, remote).await?
                        {
                            binary = BinaryStatus::Update;
                            update_manifest = Some(upstream);
                            if build_mode.outdated() {
                                recipe_hash = self
                                    .probe_package_info(package, remote)
                                    .await?
                                    .and_then(|info| info.recipe_hash().map(str::to_string));
                            }
                        }
                    }
                    None if self.registry.remotes().is_empty() => {
                        warn!(reference = %reference, "Can't update, no remote defined");
                    }
                    None => {}
                }
            }
            if build_mode.outdated() && recipe_hash.is_none() {
                let info = self.cache.load_package_info(&folder).await?;
                recipe_hash = info.recipe_hash().map(str::to_string);
            }
            binary
        } else {
            match self.find_remote_binary(context, package, remote.as_ref()).await? {
                Some((found, info)) => {
                    recipe_hash = info.recipe_hash().map(str::to_string);
                    binary_remote = Some(found);
                    BinaryStatus::Download
                }
                None if build_mode.allowed(recipe, reference) => BinaryStatus::Build,
                None => BinaryStatus::Missing,
            }
        };

        if build_mode.outdated() && binary.is_reused() {
            let local_hash = self.cache.load_recipe_manifest(reference).await?.summary_hash();
            if recipe_hash.as_deref() == Some(local_hash.as_str()) {
                info!(reference = %reference, "Package is up to date");
            } else {
                info!(reference = %reference, "Outdated package!");
                binary = BinaryStatus::Build;
                update_manifest = None;
            }
        }

        Ok(Decision {
            binary,
            remote: if binary.is_reused() { binary_remote } else { None },
            update_manifest,
        })
    }

    /// Removes a package folder left half written, holding the package lock
    /// only for the check and the removal.
    async fn purge_if_dirty(&self, package: &PackageReference, folder: &Path) -> Result<()> {
        let _lock = self.cache.package_lock(package).await?;
        if self.cache.is_dirty(folder).await? {
            warn!(
                reference = %package.recipe(),
                "Package is corrupted, removing folder: {}",
                folder.display()
            );
            self.cache.purge(folder).await?;
        }
        Ok(())
    }

    fn consulted_remote(
        &self,
        context: &ResolutionContext,
        package: &PackageReference,
    ) -> Option<Remote> {
        context
            .explicit_remote()
            .or_else(|| self.registry.remote_for_package(package))
            .or_else(|| self.registry.remote_for_reference(package.recipe()))
            .cloned()
    }

    /// Compares the cached binary against the remote one. Returns the remote
    /// manifest when the remote binary is newer.
    async fn check_update(
        &self,
        context: &ResolutionContext,
        package: &PackageReference,
        folder: &Path,
        remote: &Remote,
    ) -> Result<Option<FileTreeManifest>> {
        let reference = package.recipe();
        if context.revisions_enabled() {
            let metadata = self.cache.load_metadata(reference).await?;
            if metadata.recipe_revision_of(package.package_id()) != reference.revision() {
                warn!(
                    reference = %reference,
                    "Outdated package! The package doesn't belong to the installed recipe revision: {}",
                    package
                );
            }
        }

        let upstream = match self.remote_manager.get_package_manifest(package, remote).await {
            Ok(manifest) => manifest,
            Err(RemoteError::NotFound { .. }) => {
                warn!(reference = %reference, "Can't update, no package in remote");
                return Ok(None);
            }
            Err(RemoteError::NoRemoteAvailable { .. }) => {
                warn!(reference = %reference, "Can't update, no remote defined");
                return Ok(None);
            }
            Err(e) => return Err(BinpmError::from(e).into()),
        };

        let local = self.cache.load_package_manifest(folder).await?;
        if upstream == local {
            return Ok(None);
        }
        if upstream.time > local.time {
            warn!(reference = %reference, "Current package is older than remote upstream one");
            Ok(Some(upstream))
        } else {
            warn!(reference = %reference, "Current package is newer than remote upstream one");
            Ok(None)
        }
    }

    /// Probes the resolved remote, then the fallback pool, for the binary.
    async fn find_remote_binary(
        &self,
        context: &ResolutionContext,
        package: &PackageReference,
        remote: Option<&Remote>,
    ) -> Result<Option<(Remote, PackageInfo)>> {
        if let Some(remote) = remote
            && let Some(info) = self.probe_package_info(package, remote).await?
        {
            return Ok(Some((remote.clone(), info)));
        }

        let remotes = self.registry.remotes();
        let pool: Vec<&Remote> = if context.revisions_enabled() {
            remotes
                .iter()
                .filter(|r| remote.is_none_or(|resolved| resolved.name != r.name))
                .collect()
        } else if remote.is_some() {
            Vec::new()
        } else {
            remotes.iter().collect()
        };

        for candidate in pool {
            if let Some(info) = self.probe_package_info(package, candidate).await? {
                return Ok(Some((candidate.clone(), info)));
            }
        }
        Ok(None)
    }

    /// Package info on `remote`, `None` when the remote lacks the package or
    /// cannot be used.
    async fn probe_package_info(
        &self,
        package: &PackageReference,
        remote: &Remote,
    ) -> Result<Option<PackageInfo>> {
        match self.remote_manager.get_package_info(package, remote).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.is_absent() => {
                debug!(reference = %package, remote = %remote, "{e}");
                Ok(None)
            }
            Err(e) => Err(BinpmError::from(e).into()),
        }
    }
}

fn is_pending(graph: &DepsGraph, id: NodeId) -> bool {
    let node = graph.node(id);
    !node.is_root() && node.binary.is_none()
}

fn skip(graph: &mut DepsGraph, id: NodeId) {
    let node = graph.node_mut(id);
    debug!(node = %node, "Skipping binary of private dependency");
    node.binary = Some(BinaryStatus::Skip);
    node.binary_remote = None;
    node.update_manifest = None;
}
