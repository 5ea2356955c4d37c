use anyhow::{Context as _, Result};

use crate::ops::Context;
use crate::ui::list::print_installed;

/// List installed packages from the ledger.
pub async fn list_installed(ctx: &Context) -> Result<()> {
    let installed = ctx
        .ledger
        .load()
        .await
        .context("Failed to read ledger")?;
    print_installed(&installed);
    Ok(())
}
