//! Sync planner - turns manifest groups into bulk passes

use anyhow::{Context, Result};
use declarative::{BulkRequest, ResourceKind};

use crate::config::{GroupConfig, Manifest};
use crate::resource;

/// One bulk pass to run
#[derive(Debug)]
pub struct PlannedGroup {
    pub kind: &'static dyn ResourceKind,
    pub label: String,
    pub reload: bool,
    pub request: BulkRequest,
}

/// Ordered passes of a sync run
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub groups: Vec<PlannedGroup>,
}

impl SyncPlan {
    /// Build the plan for a manifest, optionally restricted to a target
    pub fn from_manifest(manifest: &Manifest, target: Option<&str>) -> Result<Self> {
        let (kind_filter, name_filter) = target.map(parse_target).unwrap_or_default();
        let mut groups = Vec::new();

        for (index, group) in manifest.groups.iter().enumerate() {
            let kind = resource::lookup(&group.kind)
                .with_context(|| format!("In group #{}", index + 1))?;

            if let Some(filter) = &kind_filter
                && filter != kind.name()
            {
                continue;
            }

            let planned = plan_group(kind, group, name_filter.as_deref());
            if planned.request.items.is_empty() {
                log::debug!("Group #{} ({}) has nothing to do", index + 1, kind.name());
                continue;
            }
            groups.push(planned);
        }

        Ok(Self { groups })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of entries over all groups
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.request.items.len()).sum()
    }
}

fn plan_group(
    kind: &'static dyn ResourceKind,
    group: &GroupConfig,
    name_filter: Option<&str>,
) -> PlannedGroup {
    let mut request = group.to_request();
    if let Some(name) = name_filter {
        request.items.retain(|entry, _| entry == name);
    }

    PlannedGroup {
        kind,
        label: group.label(),
        reload: group.reload,
        request,
    }
}

/// Parse a target string like "alias.web_servers" into (kind, entry name)
pub fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        Some((kind, name)) => (Some(kind.to_string()), Some(name.to_string())),
        None => (Some(target.to_string()), None),
    }
}
