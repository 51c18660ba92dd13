//! `opnsync apply` - reconcile a single resource given on the command line

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use declarative::{
    Action, DesiredState, FieldMap, FieldValue, PassContext, PassOptions, ReconcileOutcome,
    ResourceKind, Transport, reconcile_one,
};
use similar::ChangeTag;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::commands;
use crate::engine::differ::field_changes;
use crate::resource;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let kind = resource::lookup(args.kind.as_str())?;
    let config = parse_assignments(&args.set, DesiredState::from(args.state))?;
    let name = config
        .get(kind.key_field())
        .map(FieldValue::normalized)
        .unwrap_or_default();

    let manifest = commands::connection_manifest(ctx)?;
    let transport = commands::connect(ctx, &manifest)?;

    let options = PassOptions {
        dry_run: args.dry_run,
        reload: args.reload,
        debug: args.debug,
    };
    let outcome = apply(&transport, kind, config, options)?;

    if !ctx.quiet {
        print_outcome(kind, &name, &outcome, args.dry_run);
    }
    Ok(())
}

/// Reconcile one resource against a connection
pub fn apply(
    transport: &dyn Transport,
    kind: &dyn ResourceKind,
    config: FieldMap,
    options: PassOptions,
) -> Result<ReconcileOutcome> {
    let ctx = PassContext::new(transport, options);
    reconcile_one(&ctx, kind, config).with_context(|| format!("Could not apply {}", kind.name()))
}

/// Build a config from `key=value` assignments
///
/// Repeating a key collects its values into a list, in order.
pub fn parse_assignments(assignments: &[String], state: DesiredState) -> Result<FieldMap> {
    let mut config = FieldMap::new();

    for assignment in assignments {
        let Some((key, value)) = assignment.split_once('=') else {
            bail!("Expected KEY=VALUE, got '{assignment}'");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Missing field name in '{assignment}'");
        }
        if key == "state" {
            bail!("Use --state instead of --set state=...");
        }

        match config.get_mut(key) {
            Some(FieldValue::List(items)) => items.push(value.to_string()),
            Some(existing) => {
                let first = existing.normalized();
                *existing = FieldValue::List(vec![first, value.to_string()]);
            }
            None => {
                config.insert(key.to_string(), FieldValue::text(value));
            }
        }
    }

    config.insert("state".to_string(), FieldValue::text(state.as_str()));
    Ok(config)
}

fn print_outcome(kind: &dyn ResourceKind, name: &str, outcome: &ReconcileOutcome, dry_run: bool) {
    let label = format!("{} '{}'", kind.name(), name);

    if !outcome.changed {
        println!("  {} {} is up to date", "✓".green(), label);
        return;
    }

    let (symbol, verb) = match (outcome.action, dry_run) {
        (Action::Create, false) => ("+".green(), "created"),
        (Action::Create, true) => ("+".green(), "would be created"),
        (Action::Delete, false) => ("-".red(), "removed"),
        (Action::Delete, true) => ("-".red(), "would be removed"),
        (_, false) => ("~".yellow(), "updated"),
        (_, true) => ("~".yellow(), "would be updated"),
    };
    println!("  {symbol} {label} {verb}");

    for (tag, line) in field_changes(&outcome.diff.before, &outcome.diff.after) {
        match tag {
            ChangeTag::Delete => println!("      {}", format!("- {line}").red()),
            ChangeTag::Insert => println!("      {}", format!("+ {line}").green()),
            ChangeTag::Equal => {}
        }
    }
}
