//! Resource kind trait for declarative reconciliation
//!
//! A ResourceKind describes one family of remote configuration items
//! (aliases, DNS forwards, shaper queues): where they live in the API,
//! which fields they carry, and which of those fields identify an item
//! or trigger an update. The reconciliation algorithm itself is shared.

use crate::codec;
use crate::context::ApiCall;
use crate::error::{Error, Result, TransportError};
use crate::types::{CanonicalExisting, DesiredResource, DesiredState, FieldMap, FieldValue};
use serde_json::{Map, Value};
use std::fmt;

/// Canonical shape of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Boolean, "0"/"1" on the wire
    Bool,
    /// Integer, numeric string on the wire
    Int,
    /// Single choice, option map on the wire
    Select,
    /// Multiple values, joined with the separator on the wire
    List(char),
}

/// Default applied when the caller does not set a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    None,
    Bool(bool),
    Int(i64),
    Text(&'static str),
    EmptyList,
}

impl FieldDefault {
    fn value(self) -> Option<FieldValue> {
        match self {
            Self::None => None,
            Self::Bool(b) => Some(FieldValue::Bool(b)),
            Self::Int(i) => Some(FieldValue::Int(i)),
            Self::Text(s) => Some(FieldValue::text(s)),
            Self::EmptyList => Some(FieldValue::List(Vec::new())),
        }
    }
}

/// Schema entry for one field of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Canonical (caller-facing) name
    pub name: &'static str,
    /// Name in the remote API, if different
    pub remote: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: FieldDefault,
    /// Allowed values; empty means unrestricted
    pub choices: &'static [&'static str],
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            remote: name,
            kind,
            required: false,
            default: FieldDefault::None,
            choices: &[],
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub const fn select(name: &'static str, choices: &'static [&'static str]) -> Self {
        let mut spec = Self::new(name, FieldKind::Select);
        spec.choices = choices;
        spec
    }

    pub const fn list(name: &'static str, separator: char) -> Self {
        let mut spec = Self::new(name, FieldKind::List(separator));
        spec.default = FieldDefault::EmptyList;
        spec
    }

    pub const fn remote(mut self, remote: &'static str) -> Self {
        self.remote = remote;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }
}

/// Discriminator for remote listings that multiplex several sub-kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSelector {
    /// Raw field holding the discriminator
    pub field: &'static str,
    /// Value selecting this kind
    pub value: &'static str,
}

/// Post-apply reactivation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadCall {
    pub controller: &'static str,
    pub command: &'static str,
}

/// Remote API location of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub module: &'static str,
    pub controller: &'static str,
    pub search: &'static str,
    pub add: &'static str,
    pub set: &'static str,
    pub delete: &'static str,
    /// Keys leading from the search response to the rows keyed by id
    pub response_path: &'static [&'static str],
    /// Key wrapping the fields in add/set payloads
    pub payload_key: &'static str,
    pub selector: Option<KindSelector>,
    pub reload: Option<ReloadCall>,
}

impl Endpoint {
    /// Build a call against this endpoint's controller
    pub fn call(&self, command: &str) -> ApiCall {
        ApiCall::new(self.module, self.controller, command)
    }

    /// Build the reload call, if the kind has one
    pub fn reload_call(&self) -> Option<ApiCall> {
        self.reload
            .map(|reload| ApiCall::new(self.module, reload.controller, reload.command))
    }
}

/// Core trait for reconcilable resource kinds
///
/// Implementors only describe data; the provided methods handle input
/// preparation, remote decoding and payload building from that description.
pub trait ResourceKind: Send + Sync + fmt::Debug {
    /// Kind name, e.g. "alias"
    fn name(&self) -> &'static str;

    /// Where the kind lives in the remote API
    fn endpoint(&self) -> &'static Endpoint;

    /// Field schema, in payload order
    fn fields(&self) -> &'static [FieldSpec];

    /// Field that names an entry in bulk mappings
    fn key_field(&self) -> &'static str;

    /// Whether a bulk entry name is written into the key field
    ///
    /// When false, entry names only label entries and the key field must
    /// be set like any other field.
    fn key_from_entry_name(&self) -> bool {
        true
    }

    /// Fields used to match a desired resource to an existing one
    fn identity_fields(&self) -> &'static [&'static str];

    /// Fields whose inequality triggers an update
    fn change_check_fields(&self) -> &'static [&'static str];

    /// Kind-specific checks on coerced fields
    ///
    /// Called after required/choice/type checks passed.
    fn validate(&self, _fields: &FieldMap) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Look up a field spec by canonical name
    fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }

    /// Schema defaults as a config layer
    fn defaults(&self) -> FieldMap {
        self.fields()
            .iter()
            .filter_map(|spec| spec.default.value().map(|v| (spec.name.to_string(), v)))
            .collect()
    }

    /// Turn a merged config into a validated desired resource
    ///
    /// `state` is read from the config (default present). Unknown fields,
    /// missing required fields, bad types and values outside the choice
    /// list are validation errors.
    fn prepare(&self, config: FieldMap) -> Result<DesiredResource> {
        let entry = config
            .get(self.key_field())
            .map(FieldValue::normalized)
            .unwrap_or_default();

        let mut state = DesiredState::Present;
        let mut fields = FieldMap::new();
        let mut problems = Vec::new();

        for (key, value) in &config {
            if key == "state" {
                match value.normalized().parse::<DesiredState>() {
                    Ok(parsed) => state = parsed,
                    Err(e) => problems.push(e),
                }
                continue;
            }
            if self.field(key).is_none() {
                problems.push(format!("unsupported field '{key}'"));
            }
        }

        for spec in self.fields() {
            let raw = config.get(spec.name).cloned().unwrap_or(FieldValue::Null);
            let value = match codec::coerce(spec.kind, &raw) {
                Ok(value) => value,
                Err(e) => {
                    problems.push(format!("{}: {e}", spec.name));
                    continue;
                }
            };

            if spec.required && value.is_empty() {
                problems.push(format!("missing required field '{}'", spec.name));
            }
            if !spec.choices.is_empty()
                && !value.is_empty()
                && !spec.choices.contains(&value.normalized().as_str())
            {
                problems.push(format!(
                    "{}: '{}' is not one of {}",
                    spec.name,
                    value,
                    spec.choices.join(", ")
                ));
            }
            fields.insert(spec.name.to_string(), value);
        }

        if problems.is_empty()
            && let Err(e) = self.validate(&fields)
        {
            problems.push(e);
        }

        if !problems.is_empty() {
            return Err(Error::validation(entry, problems.join("; ")));
        }

        Ok(DesiredResource {
            kind: self.name(),
            name: entry,
            fields,
            state,
        })
    }

    /// Full add/set payload reflecting the desired state
    fn build_payload(&self, desired: &DesiredResource) -> Value {
        let endpoint = self.endpoint();
        let mut body = Map::new();

        if let Some(selector) = endpoint.selector {
            body.insert(
                selector.field.to_string(),
                Value::String(selector.value.to_string()),
            );
        }
        for spec in self.fields() {
            body.insert(
                spec.remote.to_string(),
                codec::encode(spec.kind, desired.get(spec.name)),
            );
        }

        let mut payload = Map::new();
        payload.insert(endpoint.payload_key.to_string(), Value::Object(body));
        Value::Object(payload)
    }

    /// Decode one raw remote row into canonical form
    fn canonicalize(
        &self,
        id: &str,
        raw: &Map<String, Value>,
    ) -> std::result::Result<CanonicalExisting, TransportError> {
        let mut fields = FieldMap::new();
        for spec in self.fields() {
            let value = raw.get(spec.remote).unwrap_or(&Value::Null);
            let decoded = codec::decode(spec.kind, value).map_err(|message| {
                TransportError::Malformed {
                    path: self.endpoint().call(self.endpoint().search).path(),
                    message: format!("{} '{id}', field {}: {message}", self.name(), spec.remote),
                }
            })?;
            fields.insert(spec.name.to_string(), decoded);
        }

        Ok(CanonicalExisting {
            id: id.to_string(),
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ForwardKind;
    use serde_json::json;

    fn config(pairs: &[(&str, FieldValue)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_prepare_coerces_and_defaults() {
        let kind = ForwardKind;
        let mut merged = kind.defaults();
        merged.extend(config(&[
            ("domain", FieldValue::text("example.com")),
            ("target", FieldValue::text("1.1.1.1")),
            ("port", FieldValue::text("853")),
        ]));

        let desired = kind.prepare(merged).unwrap();
        assert_eq!(desired.name, "example.com");
        assert_eq!(desired.state, DesiredState::Present);
        assert_eq!(desired.get("port"), &FieldValue::Int(853));
        assert_eq!(desired.get("enabled"), &FieldValue::Bool(true));
    }

    #[test]
    fn test_prepare_rejects_unknown_and_missing() {
        let kind = ForwardKind;
        let err = kind
            .prepare(config(&[
                ("domain", FieldValue::text("example.com")),
                ("colour", FieldValue::text("blue")),
            ]))
            .unwrap_err();

        let message = err.to_string();
        assert!(err.is_validation());
        assert!(message.contains("unsupported field 'colour'"));
        assert!(message.contains("missing required field 'target'"));
    }

    #[test]
    fn test_prepare_reads_state() {
        let kind = ForwardKind;
        let mut merged = kind.defaults();
        merged.extend(config(&[
            ("domain", FieldValue::text("example.com")),
            ("target", FieldValue::text("1.1.1.1")),
            ("state", FieldValue::text("absent")),
        ]));

        let desired = kind.prepare(merged).unwrap();
        assert_eq!(desired.state, DesiredState::Absent);
        assert!(!desired.fields.contains_key("state"));
    }

    #[test]
    fn test_build_payload_is_full_and_encoded() {
        let kind = ForwardKind;
        let mut merged = kind.defaults();
        merged.extend(config(&[
            ("domain", FieldValue::text("example.com")),
            ("target", FieldValue::text("1.1.1.1")),
        ]));
        let desired = kind.prepare(merged).unwrap();

        assert_eq!(
            kind.build_payload(&desired),
            json!({
                "dot": {
                    "type": "dot",
                    "domain": "example.com",
                    "server": "1.1.1.1",
                    "port": "853",
                    "verify": "",
                    "enabled": "1",
                    "description": "",
                }
            })
        );
    }

    #[test]
    fn test_canonicalize_decodes_wire_values() {
        let kind = ForwardKind;
        let raw = json!({
            "domain": "example.com",
            "server": "1.1.1.1",
            "port": "53",
            "verify": "",
            "enabled": "0",
            "description": "old",
        });

        let existing = kind
            .canonicalize("uuid-1", raw.as_object().unwrap())
            .unwrap();
        assert_eq!(existing.id, "uuid-1");
        assert_eq!(existing.get("target"), &FieldValue::text("1.1.1.1"));
        assert_eq!(existing.get("port"), &FieldValue::Int(53));
        assert_eq!(existing.get("enabled"), &FieldValue::Bool(false));
    }
}
