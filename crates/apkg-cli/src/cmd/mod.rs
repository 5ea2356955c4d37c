//! Command handlers: one module per [`Operation`] variant.

pub mod add;
pub mod list;
pub mod reconcile;
pub mod regen;
pub mod reinstall;
pub mod remove;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use apkg_core::{Layout, LedgerStore, Reporter};

use crate::ops::{Context, Operation};
use crate::ui::Output;
use crate::{Cli, LedgerHandle};

/// Build the shared services and run the requested operation.
pub async fn run(cli: Cli) -> Result<()> {
    let operation = cli.operation();
    let layout =
        Layout::resolve(cli.state_dir.clone()).context("Failed to determine state directory")?;
    tracing::debug!(state_dir = %layout.root().display(), ?operation, "starting");

    let reporter: Arc<dyn Reporter> = Arc::new(Output::new(cli.quiet));
    let client = Context::http_client().context("Failed to build HTTP client")?;
    let ledger = LedgerHandle::spawn(LedgerStore::new(layout.clone()));
    let ctx = Context::new(ledger, layout, client, reporter);

    let result = dispatch(&ctx, &cli, operation).await;
    ctx.ledger.shutdown();
    result
}

/// Run one operation against an existing context.
pub async fn dispatch(ctx: &Context, cli: &Cli, operation: Operation) -> Result<()> {
    let config = cli.config.as_path();
    let dry_run = cli.dry_run;

    match operation {
        Operation::Reconcile => reconcile::reconcile(ctx, config, dry_run).await.map(drop),
        Operation::Add(name) => add::add(ctx, config, &name, dry_run).await.map(drop),
        Operation::Remove(name) => remove::remove(ctx, config, &name, dry_run).await.map(drop),
        Operation::Reinstall(name) => reinstall::reinstall(ctx, config, &name, dry_run)
            .await
            .map(drop),
        Operation::RegenIndexes => regen::regen(ctx, config, dry_run).await.map(drop),
        Operation::ListInstalled => list::list_installed(ctx).await,
    }
}
