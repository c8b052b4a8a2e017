//! Manage the remote registry.
//!
//! Remotes are probed in the order they were added. A recipe or binary
//! package can be associated with one remote so later lookups go straight
//! to it.
//!
//! ```bash
//! binpm remote list
//! binpm remote add conan-center file:///srv/conan-center
//! binpm remote add internal https://binaries.example.com --insecure
//! binpm remote add-ref zlib/1.2.11@conan/stable conan-center
//! binpm remote add-pref zlib/1.2.11@conan/stable:abc123 internal
//! binpm remote remove internal
//! ```
//!
//! Removing a remote also drops every association pointing at it.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use tracing::info;

use super::CommandContext;
use crate::reference::{PackageReference, RecipeReference};
use crate::remote::{Registry, Remote, RemoteRegistry};

/// Command to manage remotes and reference associations.
#[derive(Args, Debug)]
pub struct RemoteCommand {
    /// Operation to perform
    #[command(subcommand)]
    command: RemoteSubcommands,
}

#[derive(Subcommand, Debug)]
enum RemoteSubcommands {
    /// List declared remotes in probing order.
    List,

    /// Declare a new remote, probed after the existing ones.
    Add {
        /// Unique remote name
        name: String,

        /// Remote URL (`file://` folders are served locally)
        url: String,

        /// Skip TLS certificate verification
        #[arg(long)]
        insecure: bool,
    },

    /// Remove a remote and its associations.
    Remove {
        /// Name of the remote to remove
        name: String,
    },

    /// Associate a recipe with a remote.
    AddRef {
        /// Recipe reference, `name/version@user/channel`
        reference: RecipeReference,

        /// Declared remote name
        remote: String,
    },

    /// Associate a binary package with a remote.
    AddPref {
        /// Package reference, `name/version@user/channel:package_id`
        package: PackageReference,

        /// Declared remote name
        remote: String,
    },
}

impl RemoteCommand {
    /// Runs the subcommand against the registry file of `context`.
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let mut registry = Registry::load(&context.registry_path).await?;

        match self.command {
            RemoteSubcommands::List => {
                list(&registry);
                return Ok(());
            }
            RemoteSubcommands::Add {
                name,
                url,
                insecure,
            } => {
                let remote = Remote {
                    verify_ssl: !insecure,
                    ..Remote::new(name, url)
                };
                registry.add_remote(remote.clone())?;
                info!(remote = %remote.name, url = %remote.url, "Remote added");
                println!("{} Added remote '{}' ({})", "✓".green(), remote.name, remote.url);
            }
            RemoteSubcommands::Remove {
                name,
            } => {
                let removed = registry.remove_remote(&name)?;
                println!("{} Removed remote '{}'", "✓".green(), removed.name);
            }
            RemoteSubcommands::AddRef {
                reference,
                remote,
            } => {
                registry.set_reference_remote(&reference, &remote)?;
                println!("{} '{}' now resolves from '{}'", "✓".green(), reference, remote);
            }
            RemoteSubcommands::AddPref {
                package,
                remote,
            } => {
                registry.set_package_remote(&package, &remote)?;
                println!("{} '{}' now resolves from '{}'", "✓".green(), package, remote);
            }
        }

        registry.save(&context.registry_path)
    }
}

fn list(registry: &Registry) {
    if registry.remotes().is_empty() {
        println!("No remotes defined");
        println!("  Add one with: {}", "binpm remote add <name> <url>".cyan());
        return;
    }
    for remote in registry.remotes() {
        let ssl = if remote.verify_ssl {
            String::new()
        } else {
            format!(" {}", "[Verify SSL: False]".yellow())
        };
        println!("{}: {}{}", remote.name.bold(), remote.url, ssl);
    }
}
