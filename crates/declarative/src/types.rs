//! Core types for declarative resource reconciliation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Insertion-ordered map of field name to canonical value
pub type FieldMap = IndexMap<String, FieldValue>;

/// A field value in canonical form
///
/// Remote wire encodings ("0"/"1" booleans, numeric strings, option maps)
/// never appear here; they are decoded in [`crate::codec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Build a text value
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Build a list value
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    /// String-normalized form used for every comparison
    ///
    /// `Int(853)` and `Text("853")` normalize identically, as do `Null`
    /// and an empty text.
    pub fn normalized(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(","),
        }
    }

    /// Compare two values after normalization
    pub fn same_as(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }

    /// Whether the value is pruned from reported diffs
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Bool(_) | Self::Int(_) => false,
        }
    }

    /// Convert a loosely typed JSON/TOML value as supplied by a caller
    ///
    /// Kind-specific coercion happens later, in [`crate::resource::ResourceKind::prepare`].
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Text(n.to_string()), Self::Int),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Convert a JSON object into a field map, keeping key order
pub fn field_map_from_json(map: &IndexMap<String, serde_json::Value>) -> FieldMap {
    map.iter()
        .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
        .collect()
}

/// Whether presence of a resource is managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Resource must exist
    #[default]
    Present,
    /// Resource must not exist
    Absent,
    /// Presence is not managed; fields are managed if the resource exists
    Unset,
}

impl DesiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Unset => "unset",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DesiredState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "unset" => Ok(Self::Unset),
            other => Err(format!(
                "invalid state '{other}' (expected present, absent or unset)"
            )),
        }
    }
}

/// Caller-declared intent for one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredResource {
    /// Resource kind name, e.g. "alias"
    pub kind: &'static str,
    /// Human-facing entry name (the kind's key field value)
    pub name: String,
    /// Coerced fields, including `enabled`
    pub fields: FieldMap,
    pub state: DesiredState,
}

impl DesiredResource {
    pub fn get(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&FieldValue::Null)
    }
}

/// A remote resource normalized into canonical fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalExisting {
    /// Opaque handle assigned by the remote system
    pub id: String,
    pub fields: FieldMap,
}

impl CanonicalExisting {
    pub fn get(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&FieldValue::Null)
    }
}

/// Before/after projection of a resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub before: FieldMap,
    pub after: FieldMap,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// Action decided for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NoChange,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Check if the action mutates remote state
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoChange => "check",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of reconciling one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub changed: bool,
    pub diff: Diff,
    pub action: Action,
}

/// Per-action counters for a pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl PassSummary {
    /// Total number of actual changes
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Total number of entries seen
    pub fn total(&self) -> usize {
        self.total_changes() + self.unchanged + self.skipped
    }

    /// Count an action
    pub fn add_action(&mut self, action: Action) {
        match action {
            Action::NoChange => self.unchanged += 1,
            Action::Create => self.created += 1,
            Action::Update => self.updated += 1,
            Action::Delete => self.deleted += 1,
        }
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &PassSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }
}
