//! Sync execution - plan in dry run, show the diff, confirm, apply

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use declarative::{
    BulkOutcome, NoProgress, PassContext, PassOptions, PassSummary, ProgressCallback,
    ReconcileOutcome, Transport, reconcile_bulk,
};

use super::differ::{GroupDiff, display_diff};
use super::planner::SyncPlan;

/// Options for a sync run
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Log full diffs of changed entries
    pub debug: bool,
}

/// Run every planned group against the firewall
///
/// Each group is first reconciled in dry run to build the diff. After
/// confirmation the groups with changes are reconciled for real; a failing
/// group stops the run and leaves earlier groups applied.
pub fn execute(
    transport: &dyn Transport,
    plan: &SyncPlan,
    opts: ExecuteOptions,
) -> Result<PassSummary> {
    // 1. Plan every group without mutating anything
    let planned = plan_outcomes(transport, plan, opts)?;

    // 2. Display what will change
    let diffs: Vec<_> = plan
        .groups
        .iter()
        .zip(&planned)
        .map(|(group, outcome)| GroupDiff {
            label: &group.label,
            outcome,
        })
        .collect();
    display_diff(&diffs);

    let mut planned_summary = PassSummary::default();
    for outcome in &planned {
        planned_summary.merge(&outcome.summary);
    }

    if planned_summary.total_changes() == 0 {
        return Ok(planned_summary);
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(planned_summary);
    }

    // 3. Confirm (unless --yes)
    if !opts.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(PassSummary {
            skipped: planned_summary.total(),
            ..Default::default()
        });
    }

    // 4. Apply groups that have changes, in manifest order
    let mut summary = PassSummary::default();
    for (group, outcome) in plan.groups.iter().zip(&planned) {
        if !outcome.changed {
            summary.merge(&outcome.summary);
            continue;
        }

        let ctx = PassContext::new(
            transport,
            PassOptions {
                dry_run: false,
                reload: group.reload,
                debug: opts.debug,
            },
        );
        let mut progress = ConsoleProgress::default();
        let applied = reconcile_bulk(&ctx, group.kind, &group.request, &mut progress)
            .with_context(|| format!("Sync of {} stopped", group.label))?;

        if applied.reloaded {
            println!("    {} Reloaded {}", "✓".green(), group.kind.name());
        }
        summary.merge(&applied.summary);
    }

    // 5. Summary
    print_summary(&summary);

    Ok(summary)
}

fn plan_outcomes(
    transport: &dyn Transport,
    plan: &SyncPlan,
    opts: ExecuteOptions,
) -> Result<Vec<BulkOutcome>> {
    plan.groups
        .iter()
        .map(|group| {
            let ctx = PassContext::new(
                transport,
                PassOptions {
                    dry_run: true,
                    reload: group.reload,
                    debug: opts.debug,
                },
            );
            reconcile_bulk(&ctx, group.kind, &group.request, &mut NoProgress)
                .with_context(|| format!("Planning {} failed", group.label))
        })
        .collect()
}

/// Prints one line per entry as a pass runs
#[derive(Default)]
struct ConsoleProgress {
    kind: String,
}

impl ProgressCallback for ConsoleProgress {
    fn on_pass_start(&mut self, kind: &str, count: usize) {
        self.kind = kind.to_string();
        println!();
        println!("  {} Applying {} {} entries...", "→".cyan(), count, kind);
    }

    fn on_entry_complete(&mut self, name: &str, outcome: &ReconcileOutcome) {
        if outcome.changed {
            println!("    {} {} {}", "✓".green(), outcome.action, name);
        } else {
            log::debug!("{} '{}' unchanged", self.kind, name);
        }
    }

    fn on_entry_skipped(&mut self, name: &str, warning: &str) {
        println!("    {} skipped {}: {}", "⊘".yellow(), name, warning.dimmed());
    }

    fn on_pass_complete(&mut self, summary: &PassSummary) {
        log::debug!(
            "{} pass done: {} changed, {} unchanged, {} skipped",
            self.kind,
            summary.total_changes(),
            summary.unchanged,
            summary.skipped
        );
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
fn print_summary(summary: &PassSummary) {
    println!();
    if summary.skipped == 0 {
        println!("  {} Firewall is in sync!", "✓".green().bold());
    } else {
        println!(
            "  {} Firewall synced with skipped entries",
            "⚠".yellow().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} entries created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} entries updated", summary.updated);
    }
    if summary.deleted > 0 {
        println!("    • {} entries deleted", summary.deleted);
    }
    if summary.skipped > 0 {
        println!("    • {} entries {}", summary.skipped, "skipped".yellow());
    }
}
