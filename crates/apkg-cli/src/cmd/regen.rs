use std::path::Path;

use anyhow::{Context as _, Result};

use crate::config::DesiredState;
use crate::ops::Context;
use crate::ops::regen::{RegenSummary, regen_indexes};

/// Rebuild every installed package's manifest.
pub async fn regen(ctx: &Context, config: &Path, dry_run: bool) -> Result<RegenSummary> {
    let desired = DesiredState::load(config)
        .with_context(|| format!("Failed to load desired state from {}", config.display()))?;
    regen_indexes(ctx, &desired, dry_run)
        .await
        .context("Manifest regeneration failed")
}
