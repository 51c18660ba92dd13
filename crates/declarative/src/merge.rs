//! Layered config merging
//!
//! Entry configs are assembled from several named layers. Later layers
//! win; every overwrite is logged at trace level so clashes are visible.

use crate::resource::ResourceKind;
use crate::types::{DesiredState, FieldMap, FieldValue};

/// One named source of field values
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub name: &'static str,
    pub fields: &'a FieldMap,
}

impl<'a> Layer<'a> {
    pub fn new(name: &'static str, fields: &'a FieldMap) -> Self {
        Self { name, fields }
    }
}

/// Merge layers in order; a key in a later layer replaces earlier ones
pub fn merge_layers(layers: &[Layer<'_>]) -> FieldMap {
    let mut merged = FieldMap::new();
    let mut origin: Vec<(String, &'static str)> = Vec::new();

    for layer in layers {
        for (key, value) in layer.fields {
            if let Some(previous) = merged.insert(key.clone(), value.clone()) {
                let from = origin
                    .iter()
                    .rev()
                    .find(|(k, _)| k == key)
                    .map_or("?", |(_, name)| *name);
                if !previous.same_as(value) {
                    log::trace!("'{}' from {} overrides {}: {} -> {}", key, layer.name, from, previous, value);
                }
            }
            origin.push((key.clone(), layer.name));
        }
    }

    merged
}

/// Group-level values forced onto every entry
///
/// Only explicitly set values are applied; `state = unset` counts as not set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupOverrides {
    pub state: Option<DesiredState>,
    pub enabled: Option<bool>,
}

impl GroupOverrides {
    /// Build overrides from raw group settings
    pub fn new(state: DesiredState, enabled: Option<bool>) -> Self {
        Self {
            state: (state != DesiredState::Unset).then_some(state),
            enabled,
        }
    }

    /// Overrides as a config layer
    pub fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        if let Some(state) = self.state {
            fields.insert("state".to_string(), FieldValue::text(state.as_str()));
        }
        if let Some(enabled) = self.enabled {
            fields.insert("enabled".to_string(), FieldValue::Bool(enabled));
        }
        fields
    }
}

/// The layers of one bulk entry, lowest precedence first
///
/// `kind defaults < group defaults < item fields < identity < group overrides`
pub struct EntryLayers<'a> {
    pub kind_defaults: FieldMap,
    pub group_defaults: &'a FieldMap,
    pub item: &'a FieldMap,
    pub identity: FieldMap,
    pub overrides: FieldMap,
}

impl<'a> EntryLayers<'a> {
    /// Assemble the layers for the entry called `name`
    ///
    /// The identity layer is empty for kinds whose entry names are labels only.
    pub fn new(
        kind: &dyn ResourceKind,
        name: &str,
        group_defaults: &'a FieldMap,
        item: &'a FieldMap,
        overrides: &GroupOverrides,
    ) -> Self {
        let mut identity = FieldMap::new();
        if kind.key_from_entry_name() {
            identity.insert(kind.key_field().to_string(), FieldValue::text(name));
        }

        Self {
            kind_defaults: kind.defaults(),
            group_defaults,
            item,
            identity,
            overrides: overrides.to_fields(),
        }
    }

    pub fn merge(&self) -> FieldMap {
        merge_layers(&[
            Layer::new("kind defaults", &self.kind_defaults),
            Layer::new("group defaults", self.group_defaults),
            Layer::new("item", self.item),
            Layer::new("identity", &self.identity),
            Layer::new("overrides", &self.overrides),
        ])
    }
}
