//! Command-line interface for binpm.
//!
//! # Available Commands
//!
//! - `analyze` - Decide where the binary of every package in a dependency
//!   graph comes from (cache, remote download, build, workspace...)
//! - `remote` - Manage declared remotes and reference associations
//!
//! # Examples
//!
//! ```bash
//! # Declare a remote served from a local folder
//! binpm remote add local file:///srv/packages
//!
//! # Analyze a graph, building whatever has no binary
//! binpm analyze graph.json --build=missing
//!
//! # Check remotes for newer binaries, restricted to one remote
//! binpm analyze graph.json --update --remote local --format json
//! ```
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - Debug logging
//! - `--quiet` / `-q` - Only errors are logged
//! - `--config` / `-c` - Alternative global configuration file
//!
//! Logs go to stderr; command results go to stdout.

mod analyze;
mod remote;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;

pub use analyze::{AnalyzeCommand, OutputFormat};
pub use remote::RemoteCommand;

/// Runtime configuration derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: Option<String>,

    /// Custom path to the global configuration file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Create a new CLI configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the tracing subscriber writing to stderr.
    ///
    /// `RUST_LOG` wins over the level chosen by the flags. Calling this more
    /// than once is harmless.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_level.as_deref().unwrap_or("error"))
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Paths and switches every command works with, resolved from the global
/// configuration.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Package cache root.
    pub storage_path: PathBuf,
    /// Remote registry file.
    pub registry_path: PathBuf,
    /// Whether recipe revisions are tracked.
    pub revisions_enabled: bool,
}

impl CommandContext {
    /// Loads the global configuration (from `config_path` when given) and
    /// resolves the paths it defines.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or the home
    /// folder cannot be determined.
    pub async fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = GlobalConfig::load_with_optional(config_path).await?;
        let home = GlobalConfig::home_dir()?;
        Ok(Self {
            storage_path: config.storage_path(&home),
            registry_path: config.registry_path(&home),
            revisions_enabled: config.revisions_enabled,
        })
    }
}

/// Binary resolution for compiled-library packages.
#[derive(Parser)]
#[command(
    name = "binpm",
    about = "Decide where the binaries of a dependency graph come from",
    version,
    long_about = "binpm resolves, for every package of a dependency graph, whether its binary is \
                  reused from the local cache, downloaded from a remote, updated, built from \
                  source or provided by a workspace."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    ///
    /// Equivalent to `RUST_LOG=debug`. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a custom global configuration file.
    ///
    /// Overrides `~/.binpm/config.toml` (or `$BINPM_HOME/config.toml`).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide the binary status of every package of a dependency graph.
    Analyze(AnalyzeCommand),

    /// Manage remotes and reference associations.
    Remote(RemoteCommand),
}

impl Cli {
    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns whatever error the command failed with; `main` renders it
    /// with [`crate::core::user_friendly_error`].
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the parsed CLI arguments.
    ///
    /// ```rust,ignore
    /// let cli = Cli::parse_from(["binpm", "--verbose", "remote", "list"]);
    /// assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));
    /// ```
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: Some(log_level.to_string()),
            config_path: self.config.clone(),
        }
    }

    /// Execute the CLI with a specific configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the command
    /// fails.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();
        let context = CommandContext::load(config.config_path).await?;

        match self.command {
            Commands::Analyze(cmd) => cmd.execute(&context).await,
            Commands::Remote(cmd) => cmd.execute(&context).await,
        }
    }
}
