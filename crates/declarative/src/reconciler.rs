//! Single-resource reconciliation
//!
//! | desired state    | matched | fields changed | action    |
//! |------------------|---------|----------------|-----------|
//! | absent           | yes     | -              | delete    |
//! | absent           | no      | -              | no change |
//! | present or unset | no      | -              | create    |
//! | present or unset | yes     | no             | no change |
//! | present or unset | yes     | yes            | update    |
//!
//! An `unset` resource with no match is created: without an existing item
//! there is nothing to leave alone.

use crate::context::PassContext;
use crate::diff;
use crate::error::Result;
use crate::executor;
use crate::matcher::find_match;
use crate::reader::Snapshot;
use crate::resource::ResourceKind;
use crate::types::{Action, CanonicalExisting, DesiredResource, DesiredState, FieldMap, ReconcileOutcome};

/// Pick the action for a desired state and match result
pub fn decide(state: DesiredState, matched: bool, changed: bool) -> Action {
    match (state, matched) {
        (DesiredState::Absent, true) => Action::Delete,
        (DesiredState::Absent, false) => Action::NoChange,
        (DesiredState::Present | DesiredState::Unset, false) => Action::Create,
        (DesiredState::Present | DesiredState::Unset, true) if changed => Action::Update,
        (DesiredState::Present | DesiredState::Unset, true) => Action::NoChange,
    }
}

/// Reconcile one prepared resource against already-read remote state
///
/// Dry run takes the same decision and reports the same outcome; only the
/// remote call is skipped. The returned diff is unpruned.
pub fn reconcile(
    ctx: &PassContext<'_>,
    kind: &dyn ResourceKind,
    desired: &DesiredResource,
    existing: &[CanonicalExisting],
) -> Result<ReconcileOutcome> {
    let matched = find_match(desired, existing, kind.identity_fields())
        .map_err(|e| e.in_entry(&desired.name, Action::NoChange))?;
    let (changed, diff) = diff::compute(desired, matched, kind.change_check_fields());
    let action = decide(desired.state, matched.is_some(), changed);

    if let Some(item) = matched
        && action == Action::Update
    {
        log::debug!(
            "{} '{}' differs in {:?}",
            kind.name(),
            desired.name,
            diff::changed_fields(desired, item, kind.change_check_fields())
        );
    }

    if ctx.options.debug && action.is_change() {
        log::warn!("{} '{}' {}: {:?}", kind.name(), desired.name, action, diff.pruned());
    }

    executor::apply(ctx, kind, action, desired, matched.map(|item| item.id.as_str()))
        .map_err(|e| e.in_entry(&desired.name, action))?;

    Ok(ReconcileOutcome {
        changed: action.is_change(),
        diff,
        action,
    })
}

/// Single-resource pass
///
/// Validation failures are fatal here. Remote state is read fresh, the
/// resource is reconciled, and the kind is reloaded if requested and
/// something changed. The returned diff is pruned for reporting.
pub fn reconcile_one(
    ctx: &PassContext<'_>,
    kind: &dyn ResourceKind,
    config: FieldMap,
) -> Result<ReconcileOutcome> {
    let mut merged = kind.defaults();
    merged.extend(config);
    let desired = kind.prepare(merged)?;

    let mut snapshot = Snapshot::new();
    let existing = snapshot.get_or_fetch(ctx, kind)?;

    let mut outcome = reconcile(ctx, kind, &desired, existing)?;
    if outcome.changed {
        executor::reload(ctx, kind)?;
    }

    outcome.diff = outcome.diff.pruned();
    Ok(outcome)
}
