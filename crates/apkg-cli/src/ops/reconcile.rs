//! Reconciler
//!
//! One run takes each package through:
//!
//! ```text
//! Desired → Resolved → { AlreadyCurrent | NeedsInstall | NeedsUpgrade }
//!         → Staged → Extracted → Placed → LedgerUpdated
//! ```
//!
//! and every ledger entry outside the resolved set through
//! `Installed → Uninstalling → Removed`.
//!
//! Install failures are isolated to their package. The ledger is saved once
//! after the install batch and once per successful uninstall.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use apkg_core::io::{download, extract};
use apkg_core::place::{self, HookOutcome};
use apkg_core::resolver::{install_order, resolve};
use apkg_core::{Installed, catalog};
use apkg_schema::{Catalog, CatalogEntry, PackageName, Version};

use super::uninstall::{sibling_paths, uninstall};
use super::{Context, PackageError, ReconcileError};
use crate::config::DesiredState;

/// Why a package is in the install batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Install,
    Upgrade { from: Version },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPackage {
    pub entry: CatalogEntry,
    pub change: Change,
}

/// The diff between desired and installed state for one run.
#[derive(Debug, Clone, Default)]
pub struct InstallPlan {
    /// Desired names plus dependencies when expansion is on.
    pub resolved: BTreeSet<PackageName>,
    /// Resolved names already installed at the catalog version.
    pub current: Vec<PackageName>,
    /// Install batch, dependencies first.
    pub to_install: Vec<PlannedPackage>,
    /// Installed names outside the resolved set.
    pub to_uninstall: Vec<(PackageName, Version)>,
    /// Resolved names no repository publishes.
    pub missing: Vec<PackageName>,
}

impl InstallPlan {
    pub fn is_noop(&self) -> bool {
        self.to_install.is_empty() && self.to_uninstall.is_empty()
    }
}

/// Compute the plan. Pure: no I/O.
pub fn plan(desired: &DesiredState, catalog: &Catalog, installed: &Installed) -> InstallPlan {
    let resolved = resolve(&desired.packages, catalog, desired.resolve_deps);

    let mut current = Vec::new();
    let mut missing = Vec::new();
    let mut batch = BTreeSet::new();

    for name in &resolved {
        let Some(entry) = catalog.get(name) else {
            missing.push(name.clone());
            continue;
        };
        match installed.get(name) {
            Some(version) if *version == entry.version => current.push(name.clone()),
            _ => {
                batch.insert(name.clone());
            }
        }
    }

    let to_install = install_order(&batch, catalog)
        .into_iter()
        .filter_map(|name| {
            let entry = catalog.get(&name)?.clone();
            let change = match installed.get(&name) {
                Some(from) => Change::Upgrade { from: from.clone() },
                None => Change::Install,
            };
            Some(PlannedPackage { entry, change })
        })
        .collect();

    let to_uninstall = installed
        .iter()
        .filter(|(name, _)| !resolved.contains(*name))
        .map(|(name, version)| (name.clone(), version.clone()))
        .collect();

    InstallPlan {
        resolved,
        current,
        to_install,
        to_uninstall,
        missing,
    }
}

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub installed: usize,
    pub upgraded: usize,
    pub current: usize,
    /// Extracted but not placed because installation is disabled.
    pub staged: usize,
    pub missing: usize,
    pub failed: usize,
    pub uninstalled: usize,
}

impl ReconcileSummary {
    pub fn changed(&self) -> usize {
        self.installed + self.upgraded + self.uninstalled
    }
}

enum Outcome {
    Placed,
    StagedOnly,
}

/// Converge the target root to `desired`.
///
/// Fatal: empty catalog, unreadable ledger, staging directories that cannot
/// be created, or a failed ledger save. With `dry_run` nothing is written
/// after the plan is computed.
pub async fn reconcile(
    ctx: &Context,
    desired: &DesiredState,
    dry_run: bool,
) -> Result<ReconcileSummary, ReconcileError> {
    let start = Instant::now();
    let reporter = &ctx.reporter;

    reporter.section("Fetching catalog");
    let catalog = catalog::fetch_catalog(&ctx.client, &desired.repos, reporter).await?;
    let installed = ctx.ledger.load().await?;
    let plan = plan(desired, &catalog, &installed);

    tracing::info!(
        resolved = plan.resolved.len(),
        current = plan.current.len(),
        install = plan.to_install.len(),
        uninstall = plan.to_uninstall.len(),
        missing = plan.missing.len(),
        "computed plan"
    );

    let mut summary = ReconcileSummary {
        current: plan.current.len(),
        missing: plan.missing.len(),
        ..ReconcileSummary::default()
    };
    for name in &plan.missing {
        reporter.warning(&format!("{name}: {}", PackageError::NotInCatalog));
    }

    if dry_run {
        report_plan(ctx, &plan);
        return Ok(summary);
    }

    let mut ledger = installed.clone();

    if !plan.to_install.is_empty() {
        let staging = ctx.layout.staging_dir();
        ctx.layout
            .prepare_staging()
            .map_err(|source| ReconcileError::Staging {
                path: staging,
                source,
            })?;

        reporter.section("Installing");
        for planned in &plan.to_install {
            let entry = &planned.entry;
            match install_one(ctx, &catalog, planned, desired, &installed).await {
                Ok(Outcome::Placed) => {
                    ledger.insert(entry.name.clone(), entry.version.clone());
                    match planned.change {
                        Change::Install => summary.installed += 1,
                        Change::Upgrade { .. } => summary.upgraded += 1,
                    }
                }
                Ok(Outcome::StagedOnly) => summary.staged += 1,
                Err(e) => {
                    tracing::warn!(package = %entry.name, error = %e, "package failed");
                    reporter.failed(&entry.name, &entry.version, &e.to_string());
                    summary.failed += 1;
                }
            }
        }

        let saved = if ledger == installed {
            Ok(())
        } else {
            ctx.ledger.save(ledger.clone()).await
        };
        ctx.layout.clean_staging();
        saved?;
    }

    if !plan.to_uninstall.is_empty() {
        reporter.section("Removing");
        for (name, version) in &plan.to_uninstall {
            match uninstall(ctx, name, &mut ledger, &desired.install_dir).await {
                Ok(_) => summary.uninstalled += 1,
                Err(PackageError::ManifestUnknown) => {
                    reporter.warning(&format!(
                        "{name}: {}; leaving it installed",
                        PackageError::ManifestUnknown
                    ));
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(package = %name, error = %e, "uninstall failed");
                    reporter.failed(name, version, &e.to_string());
                    summary.failed += 1;
                }
            }
        }
    }

    report_summary(ctx, &summary, start);
    Ok(summary)
}

/// Stage → extract → place one package and record its manifest.
async fn install_one(
    ctx: &Context,
    catalog: &Catalog,
    planned: &PlannedPackage,
    desired: &DesiredState,
    installed: &Installed,
) -> Result<Outcome, PackageError> {
    let entry = &planned.entry;
    let owner = catalog.owner(&entry.name).ok_or(PackageError::NoOwner)?;

    let archive = download::stage(&ctx.client, entry, owner, &ctx.layout, &ctx.reporter).await?;

    ctx.reporter.extracting(&entry.name, &entry.version);
    let staged = ctx.layout.staged_tree(&entry.name);
    let files = {
        let staged = staged.clone();
        tokio::task::spawn_blocking(move || extract::extract(&archive, &staged)).await??
    };
    tracing::debug!(package = %entry.name, files, "extracted");

    if !desired.install {
        ctx.reporter.done(&entry.name, &entry.version, "staged only");
        return Ok(Outcome::StagedOnly);
    }

    // The old manifest must be read before the new one replaces it.
    let previous = match &planned.change {
        Change::Upgrade { from } => {
            let manifest = ctx.ledger.load_manifest(entry.name.clone()).await?;
            if manifest.is_none() {
                ctx.reporter.warning(&format!(
                    "{}: {}; files from {from} left in place",
                    entry.name,
                    PackageError::ManifestUnknown
                ));
            }
            manifest
        }
        Change::Install => None,
    };

    ctx.reporter.installing(&entry.name, &entry.version);
    let placement = {
        let root = desired.install_dir.clone();
        let run_hooks = desired.run_scripts;
        tokio::task::spawn_blocking(move || place::place(&staged, &root, run_hooks)).await??
    };
    ctx.ledger
        .save_manifest(entry.name.clone(), placement.manifest.clone())
        .await?;

    for hook in &placement.hooks {
        match hook.outcome {
            HookOutcome::NotRun => ctx.reporter.warning(&format!(
                "{}: {} script present but not run (run_scripts = false)",
                entry.name, hook.name
            )),
            HookOutcome::Deferred => ctx.reporter.info(&format!(
                "{}: {} script handed to the script runner",
                entry.name, hook.name
            )),
        }
    }

    if let Some(previous) = previous {
        remove_stale(ctx, entry, &previous, &placement.manifest, installed, desired).await;
    }

    let detail = match &planned.change {
        Change::Install => format!("{} files", placement.manifest.len()),
        Change::Upgrade { from } => format!("upgraded from {from}"),
    };
    ctx.reporter.done(&entry.name, &entry.version, &detail);
    Ok(Outcome::Placed)
}

/// Remove files the previous version owned that the new one does not.
///
/// The package is already placed, so failures here are warnings.
async fn remove_stale(
    ctx: &Context,
    entry: &CatalogEntry,
    previous: &[PathBuf],
    current: &[PathBuf],
    installed: &Installed,
    desired: &DesiredState,
) {
    let keep: BTreeSet<&PathBuf> = current.iter().collect();
    let stale: Vec<PathBuf> = previous
        .iter()
        .filter(|p| !keep.contains(p))
        .cloned()
        .collect();
    if stale.is_empty() {
        return;
    }

    let others = installed.keys().filter(|n| **n != entry.name);
    let mut siblings = match sibling_paths(ctx, others).await {
        Ok(paths) => paths,
        Err(e) => {
            ctx.reporter
                .warning(&format!("{}: skipped stale file cleanup: {e}", entry.name));
            return;
        }
    };
    siblings.extend_from_slice(current);

    let root = desired.install_dir.clone();
    let result =
        tokio::task::spawn_blocking(move || place::remove(&stale, &root, &siblings)).await;
    match result {
        Ok(Ok(report)) => {
            tracing::debug!(package = %entry.name, removed = report.files_removed, "removed stale files");
        }
        Ok(Err(e)) => ctx
            .reporter
            .warning(&format!("{}: stale file cleanup incomplete: {e}", entry.name)),
        Err(e) => ctx
            .reporter
            .warning(&format!("{}: stale file cleanup failed: {e}", entry.name)),
    }
}

fn report_plan(ctx: &Context, plan: &InstallPlan) {
    let reporter = &ctx.reporter;
    reporter.section("Plan (dry run)");

    if plan.is_noop() {
        reporter.success("Nothing to do");
        return;
    }
    for planned in &plan.to_install {
        let entry = &planned.entry;
        match &planned.change {
            Change::Install => {
                reporter.info(&format!("would install {} {}", entry.name, entry.version));
            }
            Change::Upgrade { from } => reporter.info(&format!(
                "would upgrade {} {from} -> {}",
                entry.name, entry.version
            )),
        }
    }
    for (name, version) in &plan.to_uninstall {
        reporter.info(&format!("would remove {name} {version}"));
    }
    reporter.summary_plain(plan.to_install.len() + plan.to_uninstall.len(), "planned");
}

fn report_summary(ctx: &Context, summary: &ReconcileSummary, start: Instant) {
    let reporter = &ctx.reporter;
    if summary.changed() == 0 && summary.failed == 0 && summary.staged == 0 {
        reporter.success(&format!("{} packages up to date", summary.current));
        return;
    }
    reporter.info(&format!(
        "{} installed, {} upgraded, {} current, {} removed, {} failed",
        summary.installed, summary.upgraded, summary.current, summary.uninstalled, summary.failed
    ));
    if summary.staged > 0 {
        reporter.info(&format!(
            "{} packages staged only (install = false)",
            summary.staged
        ));
    }
    reporter.summary(summary.changed(), "changed", start.elapsed().as_secs_f64());
}
