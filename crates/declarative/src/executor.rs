//! Apply executor - issues create/update/delete calls and the post-pass reload

use crate::context::{ApiCall, PassContext};
use crate::error::{Error, Result, TransportError};
use crate::resource::ResourceKind;
use crate::types::{Action, DesiredResource};
use serde_json::Value;

/// Apply a decided action for one resource
///
/// Update and delete target `existing_id`; create and update send the full
/// payload rebuilt from the desired state, never just the changed fields.
/// In dry run nothing is sent and the call succeeds.
pub fn apply(
    ctx: &PassContext<'_>,
    kind: &dyn ResourceKind,
    action: Action,
    desired: &DesiredResource,
    existing_id: Option<&str>,
) -> Result<()> {
    if !action.is_change() {
        return Ok(());
    }

    if ctx.dry_run() {
        log::debug!("Dry run: would {} {} '{}'", action, kind.name(), desired.name);
        return Ok(());
    }

    let endpoint = kind.endpoint();
    let call = match action {
        Action::Create => endpoint
            .call(endpoint.add)
            .with_data(kind.build_payload(desired)),
        Action::Update => endpoint
            .call(endpoint.set)
            .with_param(require_id(desired, existing_id)?)
            .with_data(kind.build_payload(desired)),
        Action::Delete => endpoint
            .call(endpoint.delete)
            .with_param(require_id(desired, existing_id)?),
        Action::NoChange => return Ok(()),
    };

    let response = ctx.transport().post(&call)?;
    check_response(&call, &response)?;

    if let Some(uuid) = response.get("uuid").and_then(Value::as_str) {
        log::debug!("Remote assigned id {uuid} to {} '{}'", kind.name(), desired.name);
    }
    log::info!("Applied {} of {} '{}'", action, kind.name(), desired.name);
    Ok(())
}

/// Trigger the kind's reload call
///
/// Returns whether a reload was actually sent. Skipped when the pass did not
/// ask for one, in dry run, or when the kind has no reload call.
pub fn reload(ctx: &PassContext<'_>, kind: &dyn ResourceKind) -> Result<bool> {
    if !ctx.options.reload {
        return Ok(false);
    }

    let Some(call) = kind.endpoint().reload_call() else {
        log::debug!("{} has no reload call", kind.name());
        return Ok(false);
    };

    if ctx.dry_run() {
        log::debug!("Dry run: would call {}", call.path());
        return Ok(false);
    }

    let response = ctx.transport().post(&call)?;
    check_response(&call, &response)?;
    log::info!("Reloaded {} configuration", kind.name());
    Ok(true)
}

fn require_id<'i>(desired: &DesiredResource, existing_id: Option<&'i str>) -> Result<&'i str> {
    existing_id.ok_or_else(|| Error::MissingId {
        entry: desired.name.clone(),
    })
}

/// The remote reports refused payloads in-band with `"result": "failed"`
fn check_response(call: &ApiCall, response: &Value) -> std::result::Result<(), TransportError> {
    let result = response.get("result").and_then(Value::as_str);
    if result.is_some_and(|r| r.eq_ignore_ascii_case("failed")) {
        let message = response
            .get("validations")
            .map_or_else(|| "no details".to_string(), Value::to_string);
        return Err(TransportError::Rejected {
            path: call.path(),
            message,
        });
    }
    Ok(())
}
