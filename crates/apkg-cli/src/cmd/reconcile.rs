use std::path::Path;

use anyhow::{Context as _, Result};

use crate::config::DesiredState;
use crate::ops::Context;
use crate::ops::reconcile::ReconcileSummary;

/// Reconcile the target root against the config at `config`.
pub async fn reconcile(ctx: &Context, config: &Path, dry_run: bool) -> Result<ReconcileSummary> {
    let desired = DesiredState::load(config)
        .with_context(|| format!("Failed to load desired state from {}", config.display()))?;
    run(ctx, &desired, dry_run).await
}

pub(crate) async fn run(
    ctx: &Context,
    desired: &DesiredState,
    dry_run: bool,
) -> Result<ReconcileSummary> {
    crate::ops::reconcile::reconcile(ctx, desired, dry_run)
        .await
        .context("Reconciliation failed")
}
