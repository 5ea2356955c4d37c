//! Domain-specific errors for reconciliation
//!
//! [`ReconcileError`] aborts a whole run. [`PackageError`] stops one
//! package and is reported, never propagated past the package boundary.

use std::path::PathBuf;

use apkg_core::catalog::CatalogError;
use apkg_core::io::download::DownloadError;
use apkg_core::io::extract::ExtractError;
use apkg_core::place::PlaceError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to build catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] StoreError),

    #[error("Cannot create staging directory {}: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("not found in any repository")]
    NotInCatalog,

    #[error("no repository owns this package")]
    NoOwner,

    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("placement failed: {0}")]
    Place(#[from] PlaceError),

    #[error("ledger update failed: {0}")]
    Ledger(#[from] StoreError),

    #[error("file manifest unknown; run `apkg regen-indexes`")]
    ManifestUnknown,

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
