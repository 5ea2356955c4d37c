//! Reinstall command
use std::path::Path;

use anyhow::{Context as _, Result, bail};
use apkg_schema::PackageName;

use crate::config::ConfigDocument;
use crate::ops::reconcile::ReconcileSummary;
use crate::ops::uninstall::uninstall;
use crate::ops::{Context, PackageError};

/// Remove `name`'s files and ledger entry, make sure it is desired, then
/// reconcile so it is installed from scratch.
///
/// A package whose manifest is unknown is dropped from the ledger without
/// touching files; the fresh install overwrites them.
pub async fn reinstall(
    ctx: &Context,
    config: &Path,
    name: &PackageName,
    dry_run: bool,
) -> Result<ReconcileSummary> {
    let mut doc = ConfigDocument::open(config).context("Failed to open config")?;
    let desired = doc.desired()?;

    if dry_run {
        ctx.reporter.info(&format!("would reinstall {name}"));
        if !desired.wants(name) {
            doc.add_package(name)?;
        }
        return super::reconcile::run(ctx, &doc.desired()?, true).await;
    }

    let mut ledger = ctx.ledger.load().await.context("Failed to read ledger")?;
    if ledger.contains_key(name) {
        match uninstall(ctx, name, &mut ledger, &desired.install_dir).await {
            Ok(_) => {}
            Err(PackageError::ManifestUnknown) => {
                ctx.reporter.warning(&format!(
                    "{name}: file manifest unknown; reinstalling over existing files"
                ));
                ledger.remove(name);
                ctx.ledger
                    .save(ledger)
                    .await
                    .context("Failed to update ledger")?;
            }
            Err(e) => bail!("Failed to uninstall {name}: {e}"),
        }
    } else {
        ctx.reporter.info(&format!("{name} is not installed"));
    }

    if doc.add_package(name)? {
        doc.save().context("Failed to save config")?;
        ctx.reporter
            .success(&format!("Added {name} to {}", doc.path().display()));
    }

    let desired = doc.desired()?;
    super::reconcile::run(ctx, &desired, false).await
}
