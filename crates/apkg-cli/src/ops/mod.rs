//! Reconciliation and maintenance operations.
//!
//! Each operation receives its collaborators (ledger actor, layout, HTTP
//! client, reporter) through a [`Context`]; none of them read process-wide
//! state.

pub mod context;
pub mod error;
pub mod reconcile;
pub mod regen;
pub mod uninstall;

pub use context::Context;
pub use error::{PackageError, ReconcileError};

use apkg_schema::PackageName;

/// Everything apkg can be asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Converge the target root to the desired state.
    Reconcile,
    /// Add to the desired packages, then reconcile.
    Add(PackageName),
    /// Drop from the desired packages, then reconcile.
    Remove(PackageName),
    /// Remove a package's files and ledger entry, then reconcile.
    Reinstall(PackageName),
    /// Rebuild manifests from re-downloaded archives.
    RegenIndexes,
    /// Print the ledger.
    ListInstalled,
}
