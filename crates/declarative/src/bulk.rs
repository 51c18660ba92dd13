//! Bulk reconciliation over a map of named entries
//!
//! All entries of a request share one remote snapshot, read once before
//! the first entry. Entries created earlier in the pass are therefore not
//! visible as existing to later entries of the same pass: two entries with
//! the same identity both resolve to "create". Callers must keep identity
//! fields unique within a request.

use crate::context::{PassContext, ProgressCallback};
use crate::diff::BulkDiff;
use crate::error::{Error, Result};
use crate::executor;
use crate::merge::{EntryLayers, GroupOverrides};
use crate::reader::Snapshot;
use crate::reconciler::reconcile;
use crate::resource::ResourceKind;
use crate::types::{FieldMap, PassSummary, ReconcileOutcome};
use indexmap::IndexMap;

/// Input of a bulk pass
#[derive(Debug, Clone, Default)]
pub struct BulkRequest {
    /// Entry name to per-item fields, processed in this order
    pub items: IndexMap<String, FieldMap>,
    /// Group-level defaults, below per-item fields
    pub defaults: FieldMap,
    /// Group-level values forced onto every entry
    pub overrides: GroupOverrides,
    /// Abort on the first invalid entry instead of skipping it
    pub fail_verification: bool,
}

/// Result of a bulk pass
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    /// Whether any entry changed
    pub changed: bool,
    /// Pruned diffs of changed entries keyed by name
    pub diff: BulkDiff,
    /// Outcome of every reconciled entry, in input order
    pub outcomes: IndexMap<String, ReconcileOutcome>,
    /// One message per skipped entry
    pub warnings: Vec<String>,
    /// Whether the reload call was sent
    pub reloaded: bool,
    pub summary: PassSummary,
}

/// Reconcile every entry of a request
///
/// Invalid entries abort the pass when `fail_verification` is set and are
/// skipped with a warning otherwise. Any other error ends the pass; entries
/// applied before it stay applied. The reload runs at most once, after the
/// last entry.
pub fn reconcile_bulk<P>(
    ctx: &PassContext<'_>,
    kind: &dyn ResourceKind,
    request: &BulkRequest,
    progress: &mut P,
) -> Result<BulkOutcome>
where
    P: ProgressCallback + ?Sized,
{
    let mut snapshot = Snapshot::new();
    let existing = snapshot.get_or_fetch(ctx, kind)?;
    log::debug!(
        "Reconciling {} {} entries against one snapshot of {} existing",
        request.items.len(),
        kind.name(),
        existing.len()
    );
    progress.on_pass_start(kind.name(), request.items.len());

    let mut outcome = BulkOutcome::default();

    for (name, item) in &request.items {
        let merged = EntryLayers::new(kind, name, &request.defaults, item, &request.overrides).merge();

        let desired = match kind.prepare(merged) {
            Ok(desired) => desired,
            Err(Error::Validation { message, .. }) if !request.fail_verification => {
                let warning = Error::validation(name.as_str(), message).to_string();
                log::warn!("Skipping {} '{}': {}", kind.name(), name, warning);
                progress.on_entry_skipped(name, &warning);
                outcome.summary.skipped += 1;
                outcome.warnings.push(warning);
                continue;
            }
            Err(Error::Validation { message, .. }) => {
                return Err(Error::validation(name.as_str(), message));
            }
            Err(e) => return Err(e),
        };

        let result = reconcile(ctx, kind, &desired, existing)?;

        if result.changed {
            outcome.changed = true;
            outcome.diff.insert(name, &result.diff);
        }
        outcome.summary.add_action(result.action);
        progress.on_entry_complete(name, &result);
        outcome.outcomes.insert(name.clone(), result);
    }

    if outcome.changed {
        outcome.reloaded = executor::reload(ctx, kind)?;
    }

    progress.on_pass_complete(&outcome.summary);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{NoProgress, PassOptions};
    use crate::testing::{
        FakeFirewall, ForwardKind, FORWARD_ENDPOINT, LabelledForwardKind, forward_config,
    };
    use crate::types::{Action, DesiredState, FieldValue};

    fn item(target: &str, port: Option<i64>) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("target".into(), FieldValue::text(target));
        if let Some(port) = port {
            fields.insert("port".into(), FieldValue::Int(port));
        }
        fields
    }

    fn invalid_item() -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("port".into(), FieldValue::text("not-a-port"));
        fields
    }

    fn options(reload: bool) -> PassOptions {
        PassOptions {
            reload,
            ..PassOptions::default()
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ProgressCallback for Recorder {
        fn on_pass_start(&mut self, kind: &str, count: usize) {
            self.events.push(format!("start {kind} {count}"));
        }
        fn on_entry_complete(&mut self, name: &str, outcome: &ReconcileOutcome) {
            self.events.push(format!("{name} {}", outcome.action));
        }
        fn on_entry_skipped(&mut self, name: &str, _warning: &str) {
            self.events.push(format!("{name} skipped"));
        }
        fn on_pass_complete(&mut self, summary: &PassSummary) {
            self.events.push(format!("done {}", summary.total()));
        }
    }

    #[test]
    fn test_skips_invalid_entries_and_continues() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        let ctx = PassContext::new(&firewall, options(true));

        let mut request = BulkRequest::default();
        request.items.insert("a.example".into(), item("1.1.1.1", None));
        request.items.insert("b.example".into(), invalid_item());

        let mut recorder = Recorder::default();
        let outcome = reconcile_bulk(&ctx, &ForwardKind, &request, &mut recorder).unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("b.example"));
        assert_eq!(outcome.summary.created, 1);
        assert_eq!(outcome.summary.skipped, 1);
        assert!(outcome.diff.after.contains_key("a.example"));
        assert!(!outcome.diff.after.contains_key("b.example"));
        assert!(outcome.reloaded);
        assert_eq!(
            recorder.events,
            vec!["start forward 2", "a.example create", "b.example skipped", "done 2"]
        );
    }

    #[test]
    fn test_fail_verification_aborts() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        let ctx = PassContext::new(&firewall, options(true));

        let mut request = BulkRequest {
            fail_verification: true,
            ..BulkRequest::default()
        };
        request.items.insert("b.example".into(), invalid_item());
        request.items.insert("a.example".into(), item("1.1.1.1", None));

        let err = reconcile_bulk(&ctx, &ForwardKind, &request, &mut NoProgress).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(firewall.post_count(), 0);
    }

    #[test]
    fn test_reloads_once_for_many_changes() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        let ctx = PassContext::new(&firewall, options(true));

        let mut request = BulkRequest::default();
        for name in ["a.example", "b.example", "c.example"] {
            request.items.insert(name.into(), item("1.1.1.1", None));
        }

        let outcome = reconcile_bulk(&ctx, &ForwardKind, &request, &mut NoProgress).unwrap();
        assert_eq!(outcome.summary.created, 3);
        assert_eq!(firewall.calls_to("addForward"), 3);
        assert_eq!(firewall.calls_to("reconfigure"), 1);
        assert_eq!(firewall.calls_to("get"), 1);
    }

    #[test]
    fn test_no_reload_without_changes() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        firewall.insert_forward("uuid-1", "a.example", "1.1.1.1", 853);
        let ctx = PassContext::new(&firewall, options(true));

        let mut request = BulkRequest::default();
        request.items.insert("a.example".into(), item("1.1.1.1", Some(853)));

        let outcome = reconcile_bulk(&ctx, &ForwardKind, &request, &mut NoProgress).unwrap();
        assert!(!outcome.changed);
        assert!(!outcome.reloaded);
        assert!(outcome.diff.is_empty());
        assert_eq!(firewall.post_count(), 0);
    }

    #[test]
    fn test_group_overrides_apply_to_every_entry() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        firewall.insert_forward("uuid-1", "a.example", "1.1.1.1", 853);
        firewall.insert_forward("uuid-2", "b.example", "1.1.1.1", 853);
        let ctx = PassContext::new(&firewall, options(false));

        let mut request = BulkRequest {
            overrides: GroupOverrides::new(DesiredState::Absent, None),
            ..BulkRequest::default()
        };
        let mut present = item("1.1.1.1", None);
        present.insert("state".into(), FieldValue::text("present"));
        request.items.insert("a.example".into(), present);
        request.items.insert("b.example".into(), item("1.1.1.1", None));

        let outcome = reconcile_bulk(&ctx, &ForwardKind, &request, &mut NoProgress).unwrap();
        assert_eq!(outcome.summary.deleted, 2);
        assert!(firewall.raw_rows().is_empty());
        assert!(outcome.diff.after.is_empty());
        assert_eq!(outcome.diff.before.len(), 2);
    }

    #[test]
    fn test_unset_group_state_keeps_item_state() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        firewall.insert_forward("uuid-1", "a.example", "1.1.1.1", 853);
        let ctx = PassContext::new(&firewall, options(false));

        let mut request = BulkRequest {
            overrides: GroupOverrides::new(DesiredState::Unset, None),
            ..BulkRequest::default()
        };
        let mut absent = item("1.1.1.1", None);
        absent.insert("state".into(), FieldValue::text("absent"));
        request.items.insert("a.example".into(), absent);

        let outcome = reconcile_bulk(&ctx, &ForwardKind, &request, &mut NoProgress).unwrap();
        assert_eq!(outcome.outcomes["a.example"].action, Action::Delete);
    }

    #[test]
    fn test_transport_failure_keeps_earlier_entries() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        let ctx = PassContext::new(&firewall, options(true));

        let mut request = BulkRequest::default();
        request.items.insert("a.example".into(), item("1.1.1.1", None));
        request.items.insert("b.example".into(), item("1.1.1.1", None));
        firewall.fail_after("addForward", 1);

        let err = reconcile_bulk(&ctx, &ForwardKind, &request, &mut NoProgress).unwrap_err();
        assert!(err.to_string().contains("b.example"));
        assert_eq!(firewall.raw_rows().len(), 1);
        assert_eq!(firewall.calls_to("reconfigure"), 0);
    }

    #[test]
    fn test_shared_snapshot_creates_duplicate_identities_twice() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        let ctx = PassContext::new(&firewall, options(false));

        // Same identity once normalized: port 853 as int and as text
        let mut request = BulkRequest::default();
        let mut first = forward_config("a.example", "1.1.1.1", 853);
        first.insert("port".into(), FieldValue::text("853"));
        request.items.insert("first".into(), first);
        request
            .items
            .insert("second".into(), forward_config("a.example", "1.1.1.1", 853));

        let outcome =
            reconcile_bulk(&ctx, &LabelledForwardKind, &request, &mut NoProgress).unwrap();

        assert_eq!(outcome.outcomes["first"].action, Action::Create);
        assert_eq!(outcome.outcomes["second"].action, Action::Create);
        assert_eq!(firewall.calls_to("get"), 1);
        assert_eq!(firewall.calls_to("addForward"), 2);
        assert_eq!(firewall.raw_rows().len(), 2);
    }

    #[test]
    fn test_label_only_entry_missing_key_field_is_skipped() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        let ctx = PassContext::new(&firewall, options(false));

        let mut request = BulkRequest::default();
        request
            .items
            .insert("q1".into(), forward_config("a.example", "1.1.1.1", 853));
        request.items.insert("q2".into(), item("1.1.1.1", None));

        let outcome =
            reconcile_bulk(&ctx, &LabelledForwardKind, &request, &mut NoProgress).unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.summary.created, 1);
        assert_eq!(outcome.summary.skipped, 1);
        assert!(outcome.warnings[0].contains("'q2'"));
        assert!(outcome.warnings[0].contains("missing required field 'domain'"));
        assert_eq!(firewall.raw_rows().len(), 1);
    }

    #[test]
    fn test_validation_warning_names_the_entry() {
        let firewall = FakeFirewall::new(&FORWARD_ENDPOINT);
        let ctx = PassContext::new(&firewall, options(false));

        let mut request = BulkRequest::default();
        request.items.insert("b.example".into(), invalid_item());

        let outcome = reconcile_bulk(&ctx, &ForwardKind, &request, &mut NoProgress).unwrap();
        assert!(outcome.warnings[0].starts_with("invalid config for 'b.example'"));
    }
}
