//! Identity matching between desired and existing resources

use crate::error::{Error, Result};
use crate::types::{CanonicalExisting, DesiredResource};

/// Find the existing item matching the desired resource's identity fields
///
/// Items are scanned in remote order and compared after normalization.
/// More than one match is an [`Error::AmbiguousMatch`]: picking one would
/// silently update or delete an arbitrary duplicate.
pub fn find_match<'e>(
    desired: &DesiredResource,
    existing: &'e [CanonicalExisting],
    identity_fields: &[&str],
) -> Result<Option<&'e CanonicalExisting>> {
    let mut matches = existing.iter().filter(|item| {
        identity_fields
            .iter()
            .all(|field| desired.get(field).same_as(item.get(field)))
    });

    let first = matches.next();
    let others = matches.count();

    if others > 0 {
        return Err(Error::AmbiguousMatch {
            kind: desired.kind.to_string(),
            entry: desired.name.clone(),
            count: others + 1,
        });
    }

    if let Some(item) = first {
        log::debug!("{} '{}' matches existing {}", desired.kind, desired.name, item.id);
    }
    Ok(first)
}
