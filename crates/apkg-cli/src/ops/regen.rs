//! Manifest regeneration
//!
//! Rebuilds each installed package's manifest from a fresh download of the
//! exact version the ledger records. Ledger versions never change here.

use apkg_core::catalog;
use apkg_core::io::{download, extract};
use apkg_core::place;
use apkg_schema::{Catalog, CatalogEntry, PackageName, Version};

use super::{Context, PackageError, ReconcileError};
use crate::config::DesiredState;

/// Counts for one regeneration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegenSummary {
    pub rebuilt: usize,
    pub failed: usize,
}

pub async fn regen_indexes(
    ctx: &Context,
    desired: &DesiredState,
    dry_run: bool,
) -> Result<RegenSummary, ReconcileError> {
    let reporter = &ctx.reporter;
    let installed = ctx.ledger.load().await?;
    let mut summary = RegenSummary::default();

    if installed.is_empty() {
        reporter.info("No packages installed.");
        return Ok(summary);
    }

    reporter.section("Fetching catalog");
    let catalog = catalog::fetch_catalog(&ctx.client, &desired.repos, reporter).await?;

    if dry_run {
        reporter.section("Plan (dry run)");
        for (name, version) in &installed {
            reporter.info(&format!("would rebuild manifest for {name} {version}"));
        }
        reporter.summary_plain(installed.len(), "planned");
        return Ok(summary);
    }

    let staging = ctx.layout.staging_dir();
    ctx.layout
        .prepare_staging()
        .map_err(|source| ReconcileError::Staging {
            path: staging,
            source,
        })?;

    reporter.section("Rebuilding manifests");
    for (name, version) in &installed {
        match regen_one(ctx, &catalog, name, version).await {
            Ok(files) => {
                summary.rebuilt += 1;
                reporter.done(name, version, &format!("{files} files indexed"));
            }
            Err(e) => {
                tracing::warn!(package = %name, error = %e, "manifest rebuild failed");
                reporter.failed(name, version, &e.to_string());
                summary.failed += 1;
            }
        }
    }
    ctx.layout.clean_staging();

    reporter.summary_plain(summary.rebuilt, "reindexed");
    Ok(summary)
}

async fn regen_one(
    ctx: &Context,
    catalog: &Catalog,
    name: &PackageName,
    version: &Version,
) -> Result<usize, PackageError> {
    let owner = catalog.owner(name).ok_or(PackageError::NoOwner)?;

    if ctx.ledger.load_manifest(name.clone()).await?.is_none() {
        ctx.reporter
            .warning(&format!("{name}: no previous manifest, creating one"));
    }

    // The ledger version, not whatever the catalog currently publishes.
    let entry = CatalogEntry::new(name.clone(), version.clone(), Vec::new());
    let archive = download::stage(&ctx.client, &entry, owner, &ctx.layout, &ctx.reporter).await?;

    ctx.reporter.extracting(name, version);
    let staged = ctx.layout.staged_tree(name);
    let paths = tokio::task::spawn_blocking(move || {
        extract::extract(&archive, &staged)?;
        let paths = place::placeable_paths(&staged.tree)?;
        staged.discard();
        Ok::<_, PackageError>(paths)
    })
    .await??;

    let count = paths.len();
    ctx.ledger.save_manifest(name.clone(), paths).await?;
    Ok(count)
}
