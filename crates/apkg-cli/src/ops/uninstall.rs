//! Package removal shared by reconciliation and reinstall.

use std::path::{Path, PathBuf};

use apkg_core::Installed;
use apkg_core::place::{self, RemoveReport};
use apkg_schema::PackageName;

use super::{Context, PackageError};
use crate::store::StoreError;

/// Collect the manifests of `names`. Packages with an unknown manifest
/// contribute nothing.
pub async fn sibling_paths<'a>(
    ctx: &Context,
    names: impl IntoIterator<Item = &'a PackageName>,
) -> Result<Vec<PathBuf>, StoreError> {
    let mut paths = Vec::new();
    for name in names {
        if let Some(manifest) = ctx.ledger.load_manifest(name.clone()).await? {
            paths.extend(manifest);
        }
    }
    Ok(paths)
}

/// Remove `name` from the target root and the ledger.
///
/// Flow: load manifest → remove files (sibling-safe) → drop the ledger entry
/// and persist → delete the manifest. The ledger entry survives any failure
/// before the persist, including an unknown manifest.
pub async fn uninstall(
    ctx: &Context,
    name: &PackageName,
    ledger: &mut Installed,
    target_root: &Path,
) -> Result<RemoveReport, PackageError> {
    let Some(version) = ledger.get(name).cloned() else {
        return Ok(RemoveReport::default());
    };
    ctx.reporter.removing(name, &version);

    let manifest = ctx
        .ledger
        .load_manifest(name.clone())
        .await?
        .ok_or(PackageError::ManifestUnknown)?;
    let siblings = sibling_paths(ctx, ledger.keys().filter(|n| *n != name)).await?;

    let root = target_root.to_path_buf();
    let report =
        tokio::task::spawn_blocking(move || place::remove(&manifest, &root, &siblings)).await??;

    ledger.remove(name);
    if let Err(e) = ctx.ledger.save(ledger.clone()).await {
        ledger.insert(name.clone(), version);
        return Err(e.into());
    }
    ctx.ledger.delete_manifest(name.clone()).await?;

    tracing::info!(
        package = %name,
        version = %version,
        files = report.files_removed,
        dirs = report.dirs_pruned,
        "uninstalled"
    );
    ctx.reporter
        .done(name, &version, &format!("removed {} files", report.files_removed));
    Ok(report)
}
