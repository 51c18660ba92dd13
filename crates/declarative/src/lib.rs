//! # Declarative
//!
//! Idempotent reconciliation of remote firewall configuration.
//!
//! Callers declare the desired state of resources (aliases, DNS forwards,
//! shaper queues); the crate reads what exists remotely, decides per
//! resource whether to create, update, delete or leave it alone, and
//! issues only the calls needed to converge.
//!
//! ## Core Concepts
//!
//! - **ResourceKind**: Describes one family of remote items: endpoint, field schema,
//!   identity fields and change-check fields
//! - **DesiredResource**: A validated, coerced config for one item
//! - **CanonicalExisting**: A remote item decoded into the same canonical form
//! - **Reconciler**: Decides and applies the action for one resource
//! - **BulkReconciler**: Runs many named entries against one shared snapshot
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{PassContext, PassOptions, reconcile_one};
//!
//! let transport = MyHttpTransport::connect(&settings)?;
//! let ctx = PassContext::new(&transport, PassOptions { reload: true, ..Default::default() });
//!
//! let outcome = reconcile_one(&ctx, &DotKind, config)?;
//! if outcome.changed {
//!     println!("{}: {:?}", outcome.action, outcome.diff);
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`Transport`]: Performs authenticated API calls
//! - [`ProgressCallback`]: Receives progress updates during bulk passes
//!
//! This keeps the crate free of any HTTP client or terminal UI.

pub mod bulk;
pub mod codec;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod matcher;
pub mod merge;
pub mod reader;
pub mod reconciler;
pub mod resource;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

// Re-export main types at crate root
pub use bulk::{BulkOutcome, BulkRequest, reconcile_bulk};
pub use context::{ApiCall, NoProgress, PassContext, PassOptions, ProgressCallback, Transport};
pub use diff::BulkDiff;
pub use error::{Error, Result, TransportError};
pub use merge::GroupOverrides;
pub use reader::{Snapshot, read_existing};
pub use reconciler::{reconcile, reconcile_one};
pub use resource::{
    Endpoint, FieldDefault, FieldKind, FieldSpec, KindSelector, ReloadCall, ResourceKind,
};
pub use types::{
    Action, CanonicalExisting, DesiredResource, DesiredState, Diff, FieldMap, FieldValue,
    PassSummary, ReconcileOutcome,
};
