//! `opnsync sync` - reconcile every group of a manifest

use anyhow::{Result, bail};

use crate::Context;
use crate::cli::SyncArgs;
use crate::commands;
use crate::config::Manifest;
use crate::engine::{self, ExecuteOptions, SyncPlan};
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, args: &SyncArgs) -> Result<()> {
    let path = paths::manifest_path(args.path.as_deref().or(ctx.manifest.as_deref()))?;
    if !path.exists() {
        bail!(
            "No manifest at {} (pass a path or set --manifest)",
            path.display()
        );
    }
    let manifest = Manifest::load(&path)?;

    let plan = SyncPlan::from_manifest(&manifest, args.only.as_deref())?;
    if plan.is_empty() {
        ui::info("Nothing to sync");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("opnsync sync");
        ui::kv("Manifest", &path.display().to_string());
        ui::kv(
            "Entries",
            &format!("{} in {} groups", plan.entry_count(), plan.groups.len()),
        );
    }

    let transport = commands::connect(ctx, &manifest)?;
    let summary = engine::execute(
        &transport,
        &plan,
        ExecuteOptions {
            dry_run: args.dry_run,
            yes: args.yes,
            debug: args.debug,
        },
    )?;

    log::info!(
        "Sync done: {} created, {} updated, {} deleted, {} unchanged, {} skipped",
        summary.created,
        summary.updated,
        summary.deleted,
        summary.unchanged,
        summary.skipped
    );
    Ok(())
}
