//! Unbound DNS-over-TLS forwarding rule
//!
//! DoT servers share the Unbound forward listing with plain forwards; rows
//! are told apart by their `type` option.

use super::{is_hostname, is_ip, validate_port};
use declarative::{
    Endpoint, FieldDefault, FieldMap, FieldSpec, FieldValue, KindSelector, ReloadCall,
    ResourceKind,
};

static ENDPOINT: Endpoint = Endpoint {
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

static FIELDS: [FieldSpec; 5] = [
    FieldSpec::text("domain").required(),
    FieldSpec::text("target").remote("server").required(),
    FieldSpec::int("port").default(FieldDefault::Int(853)),
    FieldSpec::text("verify").default(FieldDefault::Text("")),
    FieldSpec::boolean("enabled").default(FieldDefault::Bool(true)),
];

/// Domain forwarded to a DNS-over-TLS server
#[derive(Debug, Clone, Copy)]
pub struct DnsOverTls;

impl ResourceKind for DnsOverTls {
    fn name(&self) -> &'static str {
        "unbound_dot"
    }

    fn endpoint(&self) -> &'static Endpoint {
        &ENDPOINT
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &FIELDS
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

    fn validate(&self, fields: &FieldMap) -> Result<(), String> {
        let domain = fields.get("domain").map(ToString::to_string).unwrap_or_default();
        if !is_hostname(&domain) {
            return Err(format!("domain '{domain}' is not a valid domain name"));
        }

        if let Some(FieldValue::Int(port)) = fields.get("port") {
            validate_port(*port)?;
        }

        let verify = fields.get("verify").map(ToString::to_string).unwrap_or_default();
        if !verify.is_empty() && !is_ip(&verify) && !is_hostname(&verify) {
            return Err(format!(
                "verify value '{verify}' is neither a valid IP address nor a valid hostname"
            ));
        }
        Ok(())
    }
}
