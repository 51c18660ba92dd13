//! `opnsync list` and `opnsync kinds`

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use declarative::{
    CanonicalExisting, FieldDefault, FieldKind, FieldSpec, PassContext, PassOptions,
    ResourceKind, Transport, read_existing,
};

use crate::Context;
use crate::commands;
use crate::resource;
use crate::ui;

/// Print existing resources of a kind as JSON
pub fn run(ctx: &Context, kind: &str) -> Result<()> {
    let kind = resource::lookup(kind)?;
    let manifest = commands::connection_manifest(ctx)?;
    let transport = commands::connect(ctx, &manifest)?;

    let existing = list(&transport, kind)?;
    log::info!("{} existing {} entries", existing.len(), kind.name());
    println!("{}", serde_json::to_string_pretty(&existing)?);
    Ok(())
}

/// Read the canonical existing entries of a kind
pub fn list(transport: &dyn Transport, kind: &dyn ResourceKind) -> Result<Vec<CanonicalExisting>> {
    let ctx = PassContext::new(
        transport,
        PassOptions {
            dry_run: true,
            ..PassOptions::default()
        },
    );
    read_existing(&ctx, kind).with_context(|| format!("Could not list {} entries", kind.name()))
}

/// Describe every supported kind
pub fn kinds(ctx: &Context) {
    for kind in resource::KINDS {
        ui::header(kind.name());
        let endpoint = kind.endpoint();
        ui::kv(
            "API",
            &format!("{}/{}/{}", endpoint.module, endpoint.controller, endpoint.search),
        );
        ui::kv("Key", kind.key_field());
        ui::kv("Identity", &kind.identity_fields().join(", "));

        println!();
        for spec in kind.fields() {
            println!("  {}", describe_field(spec, ctx.verbose > 0));
        }
    }

    if !ctx.quiet {
        println!();
        ui::dim("Set fields with `opnsync apply <kind> --set key=value` or in manifest groups.");
    }
}

fn describe_field(spec: &FieldSpec, show_remote: bool) -> String {
    let kind = match spec.kind {
        FieldKind::Text => "text".to_string(),
        FieldKind::Bool => "bool".to_string(),
        FieldKind::Int => "int".to_string(),
        FieldKind::Select if spec.choices.is_empty() => "select".to_string(),
        FieldKind::Select => format!("one of {}", spec.choices.join("|")),
        FieldKind::List(_) => "list".to_string(),
    };

    let mut line = format!("{:<18} {}", spec.name.bold(), kind.dimmed());
    if spec.required {
        line.push_str(&format!(" {}", "required".yellow()));
    }
    match spec.default {
        FieldDefault::None => {}
        FieldDefault::Bool(b) => line.push_str(&format!(" (default {b})")),
        FieldDefault::Int(i) => line.push_str(&format!(" (default {i})")),
        FieldDefault::Text(t) => line.push_str(&format!(" (default {t:?})")),
        FieldDefault::EmptyList => line.push_str(" (default empty)"),
    }
    if show_remote && spec.remote != spec.name {
        line.push_str(&format!(" [remote: {}]", spec.remote));
    }
    line
}
