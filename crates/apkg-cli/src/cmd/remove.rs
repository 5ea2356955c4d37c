//! Remove command
use std::path::Path;

use anyhow::{Context as _, Result};
use apkg_schema::PackageName;

use crate::config::ConfigDocument;
use crate::ops::Context;
use crate::ops::reconcile::ReconcileSummary;

/// Drop `name` from the desired packages, persist the config, then
/// reconcile so it (and any dependency nothing else needs) is uninstalled.
pub async fn remove(
    ctx: &Context,
    config: &Path,
    name: &PackageName,
    dry_run: bool,
) -> Result<ReconcileSummary> {
    let mut doc = ConfigDocument::open(config).context("Failed to open config")?;

    if doc.remove_package(name)? {
        if !dry_run {
            doc.save().context("Failed to save config")?;
        }
        ctx.reporter
            .success(&format!("Removed {name} from {}", doc.path().display()));
    } else {
        ctx.reporter.info(&format!("{name} is not in the config"));
    }

    let desired = doc.desired()?;
    super::reconcile::run(ctx, &desired, dry_run).await
}
