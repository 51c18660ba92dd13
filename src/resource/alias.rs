//! Firewall alias

use super::validate_port;
use declarative::{
    Endpoint, FieldDefault, FieldMap, FieldSpec, FieldValue, ReloadCall, ResourceKind,
};
use regex::Regex;
use std::sync::LazyLock;

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z_]{1,32}$").expect("Invalid alias name regex"));

pub const TYPES: &[&str] = &[
    "host",
    "network",
    "port",
    "url",
    "urltable",
    "geoip",
    "networkgroup",
    "mac",
    "asn",
    "dynipv6host",
    "internal",
    "external",
];

static ENDPOINT: Endpoint = Endpoint {
    module: "firewall",
    controller: "alias",
    search: "get",
    add: "addItem",
    set: "setItem",
    delete: "delItem",
    response_path: &["alias", "aliases", "alias"],
    payload_key: "alias",
    selector: None,
    reload: Some(ReloadCall {
        controller: "alias",
        command: "reconfigure",
    }),
};

static FIELDS: [FieldSpec; 6] = [
    FieldSpec::text("name").required(),
    FieldSpec::select("type", TYPES).default(FieldDefault::Text("host")),
    FieldSpec::list("content", '\n'),
    FieldSpec::text("description").default(FieldDefault::Text("")),
    FieldSpec::text("updatefreq_days")
        .remote("updatefreq")
        .default(FieldDefault::Text("")),
    FieldSpec::boolean("enabled").default(FieldDefault::Bool(true)),
];

/// Named set of hosts, networks, ports or URLs
#[derive(Debug, Clone, Copy)]
pub struct Alias;

impl ResourceKind for Alias {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn endpoint(&self) -> &'static Endpoint {
        &ENDPOINT
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &FIELDS
    }

    fn key_field(&self) -> &'static str {
        "name"
    }

    fn identity_fields(&self) -> &'static [&'static str] {
        &["name"]
    }

    fn change_check_fields(&self) -> &'static [&'static str] {
        &[
            "name",
            "type",
            "content",
            "description",
            "updatefreq_days",
            "enabled",
        ]
    }

    fn validate(&self, fields: &FieldMap) -> Result<(), String> {
        let name = fields.get("name").map(ToString::to_string).unwrap_or_default();
        if !NAME_REGEX.is_match(&name) {
            return Err(format!(
                "alias name '{name}' must be 1-32 characters of letters, digits and '_'"
            ));
        }

        let alias_type = fields.get("type").map(ToString::to_string).unwrap_or_default();
        let content = fields
            .get("content")
            .and_then(|v| match v {
                FieldValue::List(items) => Some(items.as_slice()),
                _ => None,
            })
            .unwrap_or_default();

        match alias_type.as_str() {
            "port" => content
                .iter()
                .try_for_each(|entry| validate_port_entry(entry)),
            "urltable" => {
                let freq = fields
                    .get("updatefreq_days")
                    .map(ToString::to_string)
                    .unwrap_or_default();
                if !freq.is_empty() && !freq.parse::<f64>().is_ok_and(|days| days >= 0.0) {
                    return Err(format!("updatefreq_days '{freq}' is not a positive number"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// A port alias entry is a port, a `from:to` range or another alias name
fn validate_port_entry(entry: &str) -> Result<(), String> {
    if NAME_REGEX.is_match(entry) && !entry.chars().all(|c| c.is_ascii_digit()) {
        return Ok(());
    }

    for part in entry.split(':') {
        let port = part
            .parse::<i64>()
            .map_err(|_| format!("'{entry}' is not a port or port range"))?;
        validate_port(port)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::DesiredState;
    use serde_json::json;

    fn config(name: &str, alias_type: &str, content: &[&str]) -> FieldMap {
        let mut fields = Alias.defaults();
        fields.insert("name".into(), FieldValue::text(name));
        fields.insert("type".into(), FieldValue::text(alias_type));
        fields.insert("content".into(), FieldValue::list(content.iter().copied()));
        fields
    }

    #[test]
    fn test_prepare_valid_host_alias() {
        let desired = Alias
            .prepare(config("web_servers", "host", &["10.0.0.1", "10.0.0.2"]))
            .unwrap();
        assert_eq!(desired.name, "web_servers");
        assert_eq!(desired.state, DesiredState::Present);
        assert_eq!(desired.get("enabled"), &FieldValue::Bool(true));
    }

    #[test]
    fn test_name_pattern() {
        let err = Alias
            .prepare(config("web-servers", "host", &["10.0.0.1"]))
            .unwrap_err();
        assert!(err.to_string().contains("letters, digits and '_'"));

        let long = "a".repeat(33);
        assert!(Alias.prepare(config(&long, "host", &[])).is_err());
    }

    #[test]
    fn test_type_must_be_known() {
        let err = Alias
            .prepare(config("web", "hosts", &["10.0.0.1"]))
            .unwrap_err();
        assert!(err.to_string().contains("'hosts' is not one of"));
    }

    #[test]
    fn test_port_content() {
        assert!(Alias.prepare(config("ports", "port", &["443", "8000:8080", "other_ports"])).is_ok());
        assert!(Alias.prepare(config("ports", "port", &["70000"])).is_err());
        assert!(Alias.prepare(config("ports", "port", &["80-90"])).is_err());
    }

    #[test]
    fn test_single_content_value_becomes_list() {
        let mut fields = config("web", "host", &[]);
        fields.insert("content".into(), FieldValue::text("10.0.0.1"));
        let desired = Alias.prepare(fields).unwrap();
        assert_eq!(desired.get("content"), &FieldValue::list(["10.0.0.1"]));
    }

    #[test]
    fn test_payload_joins_content_with_newlines() {
        let desired = Alias
            .prepare(config("web", "network", &["10.0.0.0/24", "10.1.0.0/24"]))
            .unwrap();
        let payload = Alias.build_payload(&desired);
        assert_eq!(payload["alias"]["content"], json!("10.0.0.0/24\n10.1.0.0/24"));
        assert_eq!(payload["alias"]["type"], json!("network"));
        assert_eq!(payload["alias"]["updatefreq"], json!(""));
    }

    #[test]
    fn test_canonicalize_option_maps() {
        let raw = json!({
            "name": "web",
            "type": {
                "host": {"value": "Host(s)", "selected": 1},
                "network": {"value": "Network(s)", "selected": 0},
            },
            "content": {
                "10.0.0.1": {"value": "10.0.0.1", "selected": 1},
            },
            "description": "",
            "updatefreq": "",
            "enabled": "1",
        });
        let existing = Alias.canonicalize("uuid-1", raw.as_object().unwrap()).unwrap();
        assert_eq!(existing.get("type"), &FieldValue::text("host"));
        assert_eq!(existing.get("content"), &FieldValue::list(["10.0.0.1"]));
        assert_eq!(existing.get("enabled"), &FieldValue::Bool(true));
    }
}
