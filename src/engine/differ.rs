//! Diff display - renders planned bulk outcomes

use colored::Colorize;
use declarative::{Action, BulkOutcome, FieldMap, FieldValue};
use similar::{ChangeTag, TextDiff};

/// One planned group as shown to the user
pub struct GroupDiff<'a> {
    pub label: &'a str,
    pub outcome: &'a BulkOutcome,
}

/// Render a field map as `key = value` lines, one line per list item
pub fn render_fields(fields: &FieldMap) -> String {
    let mut out = String::new();
    for (key, value) in fields {
        match value {
            FieldValue::List(items) => {
                for item in items {
                    out.push_str(&format!("{key} = {item}\n"));
                }
            }
            other => out.push_str(&format!("{key} = {other}\n")),
        }
    }
    out
}

/// Changed lines between two field maps
pub fn field_changes(before: &FieldMap, after: &FieldMap) -> Vec<(ChangeTag, String)> {
    let old = render_fields(before);
    let new = render_fields(after);

    TextDiff::from_lines(&old, &new)
        .iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .map(|change| (change.tag(), change.value().trim_end().to_string()))
        .collect()
}

/// Display planned changes of every group
pub fn display_diff(groups: &[GroupDiff<'_>]) {
    let total: usize = groups
        .iter()
        .map(|g| g.outcome.summary.total_changes())
        .sum();

    if total == 0 {
        println!();
        println!("  {} No changes needed", "✓".green());
        print_warnings(groups);
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Firewall Diff".bold()
    );
    println!("│");

    for group in groups {
        if !group.outcome.changed {
            continue;
        }
        println!("│ {}", group.label.bold());

        for (name, outcome) in &group.outcome.outcomes {
            let symbol = match outcome.action {
                Action::Create => "+".green(),
                Action::Delete => "-".red(),
                Action::Update => "~".yellow(),
                Action::NoChange => continue,
            };
            let note = match outcome.action {
                Action::Create => "(will create)",
                Action::Delete => "(will remove)",
                _ => "",
            };
            println!("│   {} {:<30} {}", symbol, name, note.dimmed());

            if outcome.action == Action::Update {
                let diff = outcome.diff.pruned();
                for (tag, line) in field_changes(&diff.before, &diff.after) {
                    match tag {
                        ChangeTag::Delete => println!("│       {}", format!("- {line}").red()),
                        ChangeTag::Insert => println!("│       {}", format!("+ {line}").green()),
                        ChangeTag::Equal => {}
                    }
                }
            }
        }
        println!("│");
    }

    let created: usize = groups.iter().map(|g| g.outcome.summary.created).sum();
    let updated: usize = groups.iter().map(|g| g.outcome.summary.updated).sum();
    let deleted: usize = groups.iter().map(|g| g.outcome.summary.deleted).sum();

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} create, {} update, {} delete)",
        total.to_string().bold(),
        created.to_string().green(),
        updated.to_string().yellow(),
        deleted.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");

    print_warnings(groups);
}

fn print_warnings(groups: &[GroupDiff<'_>]) {
    for warning in groups.iter().flat_map(|g| &g.outcome.warnings) {
        println!("  {} {}", "⚠".yellow(), warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, FieldValue)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_render_lists_one_item_per_line() {
        let rendered = render_fields(&fields(&[
            ("name", FieldValue::text("web")),
            ("content", FieldValue::list(["10.0.0.1", "10.0.0.2"])),
        ]));
        assert_eq!(
            rendered,
            "name = web\ncontent = 10.0.0.1\ncontent = 10.0.0.2\n"
        );
    }

    #[test]
    fn test_field_changes_only_reports_differences() {
        let before = fields(&[
            ("domain", FieldValue::text("example.com")),
            ("port", FieldValue::Int(53)),
        ]);
        let after = fields(&[
            ("domain", FieldValue::text("example.com")),
            ("port", FieldValue::Int(853)),
        ]);

        assert_eq!(
            field_changes(&before, &after),
            vec![
                (ChangeTag::Delete, "port = 53".to_string()),
                (ChangeTag::Insert, "port = 853".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_item_added() {
        let before = fields(&[("content", FieldValue::list(["10.0.0.1"]))]);
        let after = fields(&[("content", FieldValue::list(["10.0.0.1", "10.0.0.2"]))]);

        assert_eq!(
            field_changes(&before, &after),
            vec![(ChangeTag::Insert, "content = 10.0.0.2".to_string())]
        );
    }
}
