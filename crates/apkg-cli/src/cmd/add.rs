//! Add command
use std::path::Path;

use anyhow::{Context as _, Result};
use apkg_schema::PackageName;

use crate::config::ConfigDocument;
use crate::ops::Context;
use crate::ops::reconcile::ReconcileSummary;

/// Add `name` to the desired packages, persist the config, then reconcile.
///
/// With `dry_run` the edit is applied in memory only.
pub async fn add(
    ctx: &Context,
    config: &Path,
    name: &PackageName,
    dry_run: bool,
) -> Result<ReconcileSummary> {
    let mut doc = ConfigDocument::open(config).context("Failed to open config")?;

    if doc.add_package(name)? {
        if !dry_run {
            doc.save().context("Failed to save config")?;
        }
        ctx.reporter
            .success(&format!("Added {name} to {}", doc.path().display()));
    } else {
        ctx.reporter.info(&format!("{name} is already in the config"));
    }

    let desired = doc.desired()?;
    super::reconcile::run(ctx, &desired, dry_run).await
}
