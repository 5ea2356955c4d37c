//! apkg - declarative package reconciler
//!
//! Converges a target root to the package set declared in `apkg.toml`,
//! using Alpine-style repository indexes as the source of truth.
//!
//! # Architecture
//!
//! - **Closed operations**: every invocation maps to one [`ops::Operation`]
//!   variant, dispatched by an explicit match in [`cmd::run`].
//! - **Actor Pattern**: ledger and manifest access is serialized through
//!   [`LedgerHandle`], a single writer on its own thread.
//! - **Newtypes**: `PackageName`, `Version` and `RepoUrl` come from
//!   `apkg-schema`.
//!
//! # State Layout
//!
//! ```text
//! $APKG_HOME/
//! ├── installed.toml      # Ledger
//! ├── installed_files/    # Per-package manifests
//! ├── staged/             # Downloaded archives (removed after a run)
//! └── staging/            # Extracted trees (removed after a run)
//! ```
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub mod cmd;
pub mod config;
pub mod ops;
pub mod store;
pub mod ui;

pub use crate::store::LedgerHandle;
pub use apkg_core::USER_AGENT;

use apkg_schema::PackageName;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::ops::Operation;

#[derive(Debug, Parser)]
#[command(name = "apkg")]
#[command(author, version, about = "apkg - declarative package reconciler for Alpine repositories")]
pub struct Cli {
    /// Desired-state file
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "APKG_CONFIG",
        default_value = "apkg.toml"
    )]
    pub config: PathBuf,

    /// Directory holding the ledger, manifests and staging area
    #[arg(long, global = true, env = "APKG_HOME")]
    pub state_dir: Option<PathBuf>,

    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The operation this invocation asks for. No subcommand reconciles.
    pub fn operation(&self) -> Operation {
        match &self.command {
            None => Operation::Reconcile,
            Some(Commands::Add { package }) => Operation::Add(PackageName::new(package)),
            Some(Commands::Remove { package }) => Operation::Remove(PackageName::new(package)),
            Some(Commands::Reinstall { package }) => {
                Operation::Reinstall(PackageName::new(package))
            }
            Some(Commands::RegenIndexes) => Operation::RegenIndexes,
            Some(Commands::ListInstalled) => Operation::ListInstalled,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add a package to the desired state and reconcile
    Add {
        /// Package name
        package: String,
    },
    /// Drop a package from the desired state and reconcile
    #[command(visible_alias = "del")]
    Remove {
        /// Package name
        package: String,
    },
    /// Remove a package's files and install it again
    Reinstall {
        /// Package name
        package: String,
    },
    /// Rebuild every installed package's file manifest from its archive
    RegenIndexes,
    /// List installed packages
    ListInstalled,
}
