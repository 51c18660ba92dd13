//! Canonical state reader - fetches and normalizes remote collections

use crate::codec;
use crate::context::PassContext;
use crate::error::{Result, TransportError};
use crate::resource::{KindSelector, ResourceKind};
use crate::types::CanonicalExisting;
use serde_json::{Map, Value};

/// Fetch every existing item of a kind in canonical form
///
/// Issues exactly one search call. Rows are returned in the order the
/// remote listed them; rows belonging to another sub-kind of a
/// multiplexed listing are dropped.
pub fn read_existing(ctx: &PassContext<'_>, kind: &dyn ResourceKind) -> Result<Vec<CanonicalExisting>> {
    let endpoint = kind.endpoint();
    let call = endpoint.call(endpoint.search);
    let path = call.path();

    log::debug!("Reading existing {} entries from {}", kind.name(), path);
    let response = ctx.transport().get(&call)?;

    let Some(rows) = locate_rows(&response, endpoint.response_path) else {
        return Err(TransportError::Malformed {
            path,
            message: format!("no collection at '{}'", endpoint.response_path.join(".")),
        }
        .into());
    };

    let mut existing = Vec::with_capacity(rows.len());
    for (id, row) in rows {
        let Value::Object(raw) = row else {
            return Err(TransportError::Malformed {
                path,
                message: format!("entry '{id}' is not an object"),
            }
            .into());
        };

        if let Some(selector) = endpoint.selector
            && !selects(raw, selector)
        {
            continue;
        }

        existing.push(kind.canonicalize(id, raw)?);
    }

    log::debug!("Found {} existing {} entries", existing.len(), kind.name());
    Ok(existing)
}

/// Follow the response path down to the id-keyed rows
///
/// The remote serializes an empty collection as `[]` instead of `{}`.
fn locate_rows<'v>(response: &'v Value, path: &[&str]) -> Option<Vec<(&'v String, &'v Value)>> {
    let mut node = response;
    for key in path {
        node = node.get(*key)?;
    }

    match node {
        Value::Object(rows) => Some(rows.iter().collect()),
        Value::Array(items) if items.is_empty() => Some(Vec::new()),
        _ => None,
    }
}

/// Whether a raw row belongs to the selected sub-kind
fn selects(raw: &Map<String, Value>, selector: KindSelector) -> bool {
    match raw.get(selector.field) {
        Some(Value::String(value)) => value == selector.value,
        Some(Value::Object(options)) => codec::selected_keys(options)
            .iter()
            .any(|key| key == selector.value),
        _ => false,
    }
}

/// Remote state cached for the duration of one pass
///
/// Populated at most once through [`Snapshot::get_or_fetch`] and
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct Snapshot {
    existing: Option<Vec<CanonicalExisting>>,
}

impl Snapshot {
    /// Create an empty, not yet fetched snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the remote has been read already
    pub fn is_fetched(&self) -> bool {
        self.existing.is_some()
    }

    /// Return the cached state, reading it from the remote on first use
    pub fn get_or_fetch(
        &mut self,
        ctx: &PassContext<'_>,
        kind: &dyn ResourceKind,
    ) -> Result<&[CanonicalExisting]> {
        if self.existing.is_none() {
            self.existing = Some(read_existing(ctx, kind)?);
        }
        Ok(self.existing.as_deref().unwrap_or_default())
    }
}
