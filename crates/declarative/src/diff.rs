//! Diff computation for resources

use crate::types::{CanonicalExisting, DesiredResource, Diff, FieldMap, FieldValue};
use indexmap::IndexMap;
use serde::Serialize;

/// Restrict a field map to the given fields, in that order
pub fn project(fields: &FieldMap, only: &[&str]) -> FieldMap {
    only.iter()
        .map(|field| {
            (
                (*field).to_string(),
                fields.get(*field).cloned().unwrap_or(FieldValue::Null),
            )
        })
        .collect()
}

/// Change-check fields whose values differ
pub fn changed_fields<'f>(
    desired: &DesiredResource,
    existing: &CanonicalExisting,
    change_check: &[&'f str],
) -> Vec<&'f str> {
    change_check
        .iter()
        .copied()
        .filter(|field| !desired.get(field).same_as(existing.get(field)))
        .collect()
}

/// Decide whether a resource changes and compute its before/after diff
///
/// Only `change_check` fields are compared and projected; drift in any
/// other field is accepted until a monitored field also changes.
pub fn compute(
    desired: &DesiredResource,
    existing: Option<&CanonicalExisting>,
    change_check: &[&str],
) -> (bool, Diff) {
    match existing {
        None if desired.state.is_absent() => (false, Diff::default()),
        None => (
            true,
            Diff {
                before: FieldMap::new(),
                after: project(&desired.fields, change_check),
            },
        ),
        Some(item) if desired.state.is_absent() => (
            true,
            Diff {
                before: project(&item.fields, change_check),
                after: FieldMap::new(),
            },
        ),
        Some(item) => {
            if changed_fields(desired, item, change_check).is_empty() {
                (false, Diff::default())
            } else {
                (
                    true,
                    Diff {
                        before: project(&item.fields, change_check),
                        after: project(&desired.fields, change_check),
                    },
                )
            }
        }
    }
}

fn prune_map(fields: &FieldMap) -> FieldMap {
    fields
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

impl Diff {
    /// Copy without empty values, for reporting
    #[must_use]
    pub fn pruned(&self) -> Diff {
        Diff {
            before: prune_map(&self.before),
            after: prune_map(&self.after),
        }
    }
}

/// Diffs of a bulk pass keyed by entry name, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDiff {
    pub before: IndexMap<String, FieldMap>,
    pub after: IndexMap<String, FieldMap>,
}

impl BulkDiff {
    /// Record an entry's diff, dropping empty values and empty sides
    pub fn insert(&mut self, name: &str, diff: &Diff) {
        let pruned = diff.pruned();
        if !pruned.before.is_empty() {
            self.before.insert(name.to_string(), pruned.before);
        }
        if !pruned.after.is_empty() {
            self.after.insert(name.to_string(), pruned.after);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DesiredState;

    const CHECK: &[&str] = &["domain", "target", "port", "verify", "enabled"];

    fn desired(port: i64, state: DesiredState) -> DesiredResource {
        DesiredResource {
            kind: "forward",
            name: "example.com".into(),
            fields: [
                ("domain", FieldValue::text("example.com")),
                ("target", FieldValue::text("1.1.1.1")),
                ("port", FieldValue::Int(port)),
                ("verify", FieldValue::text("")),
                ("enabled", FieldValue::Bool(true)),
                ("description", FieldValue::text("desired")),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            state,
        }
    }

    fn existing(port: i64, description: &str) -> CanonicalExisting {
        CanonicalExisting {
            id: "uuid-1".into(),
            fields: [
                ("domain", FieldValue::text("example.com")),
                ("target", FieldValue::text("1.1.1.1")),
                ("port", FieldValue::Int(port)),
                ("verify", FieldValue::Null),
                ("enabled", FieldValue::Bool(true)),
                ("description", FieldValue::text(description)),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        }
    }

    #[test]
    fn test_create_projects_desired() {
        let (changed, diff) = compute(&desired(853, DesiredState::Present), None, CHECK);
        assert!(changed);
        assert!(diff.before.is_empty());
        assert_eq!(diff.after.len(), CHECK.len());
        assert!(!diff.after.contains_key("description"));
    }

    #[test]
    fn test_absent_and_missing_is_noop() {
        let (changed, diff) = compute(&desired(853, DesiredState::Absent), None, CHECK);
        assert!(!changed);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_delete_empties_after() {
        let item = existing(853, "x");
        let (changed, diff) = compute(&desired(853, DesiredState::Absent), Some(&item), CHECK);
        assert!(changed);
        assert!(diff.after.is_empty());
        assert_eq!(diff.before["port"], FieldValue::Int(853));
    }

    #[test]
    fn test_update_reports_full_projections() {
        let item = existing(53, "x");
        let (changed, diff) = compute(&desired(853, DesiredState::Present), Some(&item), CHECK);
        assert!(changed);
        assert_eq!(diff.before["port"], FieldValue::Int(53));
        assert_eq!(diff.after["port"], FieldValue::Int(853));
        assert_eq!(diff.after["domain"], FieldValue::text("example.com"));
    }

    #[test]
    fn test_drift_outside_change_check_is_ignored() {
        let item = existing(853, "changed remotely");
        let (changed, diff) = compute(&desired(853, DesiredState::Unset), Some(&item), CHECK);
        assert!(!changed);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_null_and_empty_text_are_equal() {
        let item = existing(853, "desired");
        assert!(changed_fields(&desired(853, DesiredState::Present), &item, CHECK).is_empty());
    }

    #[test]
    fn test_pruned_drops_empty_values() {
        let (_, diff) = compute(&desired(853, DesiredState::Present), None, CHECK);
        let pruned = diff.pruned();
        assert!(!pruned.after.contains_key("verify"));
        assert!(pruned.after.contains_key("enabled"));
    }

    #[test]
    fn test_bulk_diff_keeps_input_order() {
        let mut bulk = BulkDiff::default();
        let (_, second) = compute(&desired(853, DesiredState::Present), None, CHECK);
        bulk.insert("zeta", &second);
        bulk.insert("alpha", &second);

        let names: Vec<_> = bulk.after.keys().cloned().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(bulk.before.is_empty());
    }
}
