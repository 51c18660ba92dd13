//! Pass context and provider traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific HTTP client or UI.

use crate::error::TransportError;
use crate::types::{PassSummary, ReconcileOutcome};
use serde_json::Value;

/// One remote API request
///
/// Resource-agnostic shape: `{module, controller, command, params, data}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    /// Resource area, e.g. "unbound"
    pub module: String,
    /// Controller scope, e.g. "settings"
    pub controller: String,
    /// Command, e.g. "addForward"
    pub command: String,
    /// Positional parameters (the remote id for set/delete)
    pub params: Vec<String>,
    /// JSON payload for add/set
    pub data: Option<Value>,
}

impl ApiCall {
    /// Create a call without params or payload
    pub fn new(module: &str, controller: &str, command: &str) -> Self {
        Self {
            module: module.to_string(),
            controller: controller.to_string(),
            command: command.to_string(),
            params: Vec::new(),
            data: None,
        }
    }

    /// Add a positional parameter
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Attach a payload
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Relative API path: `module/controller/command[/param...]`
    pub fn path(&self) -> String {
        let mut path = format!("{}/{}/{}", self.module, self.controller, self.command);
        for param in &self.params {
            path.push('/');
            path.push_str(param);
        }
        path
    }
}

/// Provider for authenticated remote calls
///
/// One handle is used sequentially for a whole pass. Implementations
/// map every failure to a [`TransportError`]; nothing is retried.
pub trait Transport {
    /// Read-only call (search/list)
    fn get(&self, call: &ApiCall) -> Result<Value, TransportError>;

    /// Mutating call (add, set, delete, reload)
    fn post(&self, call: &ApiCall) -> Result<Value, TransportError>;
}

/// Flags for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOptions {
    /// Decide and diff, but issue no mutating calls
    pub dry_run: bool,
    /// Trigger the kind's reload once if anything changed
    pub reload: bool,
    /// Log full diffs of changed entries
    pub debug: bool,
}

/// Context shared by every component of a pass
pub struct PassContext<'a> {
    transport: &'a dyn Transport,
    pub options: PassOptions,
}

impl<'a> PassContext<'a> {
    /// Create a new pass context
    pub fn new(transport: &'a dyn Transport, options: PassOptions) -> Self {
        Self { transport, options }
    }

    /// The connection handle for this pass
    pub fn transport(&self) -> &'a dyn Transport {
        self.transport
    }

    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }
}

/// Progress callback for bulk passes
///
/// Implement this trait to receive progress updates during a pass.
pub trait ProgressCallback {
    /// Called once the shared snapshot is loaded
    fn on_pass_start(&mut self, kind: &str, count: usize);

    /// Called when an entry has been reconciled
    fn on_entry_complete(&mut self, name: &str, outcome: &ReconcileOutcome);

    /// Called when an entry is skipped after failing validation
    fn on_entry_skipped(&mut self, name: &str, warning: &str);

    /// Called after the last entry (and the reload, if any)
    fn on_pass_complete(&mut self, summary: &PassSummary);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_pass_start(&mut self, _kind: &str, _count: usize) {}
    fn on_entry_complete(&mut self, _name: &str, _outcome: &ReconcileOutcome) {}
    fn on_entry_skipped(&mut self, _name: &str, _warning: &str) {}
    fn on_pass_complete(&mut self, _summary: &PassSummary) {}
}
