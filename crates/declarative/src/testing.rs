//! In-memory firewall for tests
//!
//! [`FakeFirewall`] implements [`Transport`] for a single endpoint: it
//! stores add/set payloads as raw rows, serves them back from the search
//! call in the remote's wire shape, and records every call so tests can
//! assert on what was sent.

use crate::context::{ApiCall, Transport};
use crate::error::TransportError;
use crate::resource::{Endpoint, FieldDefault, FieldSpec, KindSelector, ReloadCall, ResourceKind};
use crate::types::{DesiredResource, DesiredState, FieldMap, FieldValue};
use indexmap::IndexMap;
use serde_json::{Value, json};
use std::cell::RefCell;

#[derive(Debug, Default)]
struct State {
    rows: IndexMap<String, Value>,
    calls: Vec<(&'static str, String)>,
    next_id: usize,
    search_override: Option<Value>,
    /// Command (or method) and number of calls still allowed to succeed
    failures: Vec<(String, usize)>,
    reject: Option<Value>,
}

/// Transport double backed by an in-memory row table
#[derive(Debug)]
pub struct FakeFirewall {
    endpoint: &'static Endpoint,
    state: RefCell<State>,
}

impl FakeFirewall {
    pub fn new(endpoint: &'static Endpoint) -> Self {
        Self {
            endpoint,
            state: RefCell::new(State::default()),
        }
    }

    /// Seed a raw row as the remote would store it
    pub fn insert_raw(&self, id: &str, row: Value) {
        self.state.borrow_mut().rows.insert(id.to_string(), row);
    }

    /// Seed a DNS-over-TLS row for [`ForwardKind`]
    pub fn insert_forward(&self, id: &str, domain: &str, target: &str, port: i64) {
        self.insert_raw(
            id,
            json!({
                "type": "dot",
                "domain": domain,
                "server": target,
                "port": port.to_string(),
                "verify": "",
                "enabled": "1",
                "description": "",
            }),
        );
    }

    /// Replace the search response verbatim
    pub fn respond_to_search(&self, response: Value) {
        self.state.borrow_mut().search_override = Some(response);
    }

    /// Fail every call to a command ("get" and "post" match all of a method)
    pub fn fail_on(&self, command: &str) {
        self.fail_after(command, 0);
    }

    /// Let `successes` calls to a command through, then fail
    pub fn fail_after(&self, command: &str, successes: usize) {
        self.state
            .borrow_mut()
            .failures
            .push((command.to_string(), successes));
    }

    /// Answer the next post with an in-band validation failure
    pub fn reject_next(&self, validations: Value) {
        self.state.borrow_mut().reject = Some(validations);
    }

    /// Number of calls made with a method ("get"/"post") or command
    pub fn calls_to(&self, command: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|(method, cmd)| *method == command || cmd == command)
            .count()
    }

    pub fn post_count(&self) -> usize {
        self.calls_to("post")
    }

    /// Current rows in insertion order
    pub fn raw_rows(&self) -> Vec<(String, Value)> {
        self.state
            .borrow()
            .rows
            .iter()
            .map(|(id, row)| (id.clone(), row.clone()))
            .collect()
    }

    fn record(&self, method: &'static str, call: &ApiCall) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        state.calls.push((method, call.command.clone()));

        for (command, successes) in &mut state.failures {
            if command == method || *command == call.command {
                if *successes == 0 {
                    return Err(TransportError::Network {
                        path: call.path(),
                        message: "connection reset by peer".to_string(),
                    });
                }
                *successes -= 1;
            }
        }
        Ok(())
    }

    fn search_response(&self) -> Value {
        let state = self.state.borrow();
        if let Some(response) = &state.search_override {
            return response.clone();
        }

        let mut node = if state.rows.is_empty() {
            json!([])
        } else {
            Value::Object(
                state
                    .rows
                    .iter()
                    .map(|(id, row)| (id.clone(), row.clone()))
                    .collect(),
            )
        };
        for key in self.endpoint.response_path.iter().rev() {
            node = json!({ *key: node });
        }
        node
    }
}

impl Transport for FakeFirewall {
    fn get(&self, call: &ApiCall) -> Result<Value, TransportError> {
        self.record("get", call)?;
        Ok(self.search_response())
    }

    fn post(&self, call: &ApiCall) -> Result<Value, TransportError> {
        self.record("post", call)?;

        let mut state = self.state.borrow_mut();
        if let Some(validations) = state.reject.take() {
            return Ok(json!({"result": "failed", "validations": validations}));
        }

        let endpoint = self.endpoint;
        let row = call
            .data
            .as_ref()
            .and_then(|data| data.get(endpoint.payload_key))
            .cloned();
        let id = call.params.first().cloned();
        let command = call.command.as_str();

        match (command, id, row) {
            (c, None, Some(row)) if c == endpoint.add => {
                state.next_id += 1;
                let id = format!("uuid-{}", state.next_id);
                state.rows.insert(id.clone(), row);
                Ok(json!({"result": "saved", "uuid": id}))
            }
            (c, Some(id), Some(row)) if c == endpoint.set && state.rows.contains_key(&id) => {
                state.rows.insert(id, row);
                Ok(json!({"result": "saved"}))
            }
            (c, Some(id), None) if c == endpoint.delete => {
                if state.rows.shift_remove(&id).is_some() {
                    Ok(json!({"result": "deleted"}))
                } else {
                    Ok(json!({"result": "not found"}))
                }
            }
            (c, None, None) if endpoint.reload.is_some_and(|r| r.command == c) => {
                Ok(json!({"status": "ok"}))
            }
            _ => Ok(json!({"result": "failed", "validations": {"call": call.path()}})),
        }
    }
}

/// Endpoint of the DNS-over-TLS style test kind
pub static FORWARD_ENDPOINT: Endpoint = Endpoint {
    module: "unbound",
    controller: "settings",
    search: "get",
    add: "addForward",
    set: "setForward",
    delete: "delForward",
    response_path: &["unbound", "dots", "dot"],
    payload_key: "dot",
    selector: Some(KindSelector {
        field: "type",
        value: "dot",
    }),
    reload: Some(ReloadCall {
        controller: "service",
        command: "reconfigure",
    }),
};

static FORWARD_FIELDS: [FieldSpec; 6] = [
    FieldSpec::text("domain").required(),
    FieldSpec::text("target").remote("server").required(),
    FieldSpec::int("port").default(FieldDefault::Int(853)),
    FieldSpec::text("verify").default(FieldDefault::Text("")),
    FieldSpec::boolean("enabled").default(FieldDefault::Bool(true)),
    FieldSpec::text("description").default(FieldDefault::Text("")),
];

/// Minimal resource kind for engine tests
///
/// `description` is deliberately outside the change-check fields.
#[derive(Debug, Clone, Copy)]
pub struct ForwardKind;

impl ResourceKind for ForwardKind {
    fn name(&self) -> &'static str {
        "forward"
    }

    fn endpoint(&self) -> &'static Endpoint {
        &FORWARD_ENDPOINT
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &FORWARD_FIELDS
    }

    fn key_field(&self) -> &'static str {
        "domain"
    }

    fn identity_fields(&self) -> &'static [&'static str] {
        &["domain", "target"]
    }

    fn change_check_fields(&self) -> &'static [&'static str] {
        &["domain", "target", "enabled", "port", "verify"]
    }
}

/// Forward kind whose bulk entry names are labels only
///
/// The domain must be set in each entry, so two entries can share an identity.
#[derive(Debug, Clone, Copy)]
pub struct LabelledForwardKind;

impl ResourceKind for LabelledForwardKind {
    fn name(&self) -> &'static str {
        "labelled_forward"
    }

    fn endpoint(&self) -> &'static Endpoint {
        &FORWARD_ENDPOINT
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &FORWARD_FIELDS
    }

    fn key_field(&self) -> &'static str {
        "domain"
    }

    fn key_from_entry_name(&self) -> bool {
        false
    }

    fn identity_fields(&self) -> &'static [&'static str] {
        ForwardKind.identity_fields()
    }

    fn change_check_fields(&self) -> &'static [&'static str] {
        ForwardKind.change_check_fields()
    }
}

/// Caller config for a forward entry
pub fn forward_config(domain: &str, target: &str, port: i64) -> FieldMap {
    let mut config = FieldMap::new();
    config.insert("domain".into(), FieldValue::text(domain));
    config.insert("target".into(), FieldValue::text(target));
    config.insert("port".into(), FieldValue::Int(port));
    config
}

/// Prepared forward entry with defaults applied
pub fn forward(domain: &str, target: &str, port: i64, state: DesiredState) -> DesiredResource {
    let mut config = ForwardKind.defaults();
    config.extend(forward_config(domain, target, port));
    config.insert("state".into(), FieldValue::text(state.as_str()));
    ForwardKind
        .prepare(config)
        .expect("forward test config is valid")
}
