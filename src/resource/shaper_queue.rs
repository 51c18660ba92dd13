//! Traffic shaper queue

use declarative::{Endpoint, FieldDefault, FieldMap, FieldSpec, ReloadCall, ResourceKind};

pub const MASKS: &[&str] = &["none", "src-ip", "dst-ip"];

static ENDPOINT: Endpoint = Endpoint {
    module: "trafficshaper",
    controller: "settings",
    search: "get",
    add: "addQueue",
    set: "setQueue",
    delete: "delQueue",
    response_path: &["ts", "queues", "queue"],
    payload_key: "queue",
    selector: None,
    reload: Some(ReloadCall {
        controller: "service",
        command: "reconfigure",
    }),
};

static FIELDS: [FieldSpec; 11] = [
    FieldSpec::select("pipe", &[]).default(FieldDefault::Text("")),
    FieldSpec::select("mask", MASKS).default(FieldDefault::Text("none")),
    FieldSpec::text("weight").default(FieldDefault::Text("")),
    FieldSpec::text("buckets").default(FieldDefault::Text("")),
    FieldSpec::boolean("pie_enable").default(FieldDefault::Bool(false)),
    FieldSpec::boolean("codel_enable").default(FieldDefault::Bool(false)),
    FieldSpec::boolean("codel_ecn_enable").default(FieldDefault::Bool(false)),
    FieldSpec::text("codel_target").default(FieldDefault::Text("")),
    FieldSpec::text("codel_interval").default(FieldDefault::Text("")),
    FieldSpec::text("description").required(),
    FieldSpec::boolean("enabled").default(FieldDefault::Bool(true)),
];

/// Weighted queue attached to a shaper pipe
///
/// Queues carry no name of their own, so the description identifies them.
/// `pipe` is the remote id of the parent pipe.
#[derive(Debug, Clone, Copy)]
pub struct ShaperQueue;

impl ResourceKind for ShaperQueue {
    fn name(&self) -> &'static str {
        "shaper_queue"
    }

    fn endpoint(&self) -> &'static Endpoint {
        &ENDPOINT
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &FIELDS
    }

    fn key_field(&self) -> &'static str {
        "description"
    }

    fn key_from_entry_name(&self) -> bool {
        false
    }

    fn identity_fields(&self) -> &'static [&'static str] {
        &["description"]
    }

    fn change_check_fields(&self) -> &'static [&'static str] {
        &[
            "pipe",
            "mask",
            "weight",
            "buckets",
            "pie_enable",
            "codel_enable",
            "codel_ecn_enable",
            "codel_target",
            "codel_interval",
            "description",
            "enabled",
        ]
    }

    fn validate(&self, fields: &FieldMap) -> Result<(), String> {
        for (field, max) in [("weight", 100), ("buckets", 65535)] {
            let value = fields.get(field).map(ToString::to_string).unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            match value.parse::<u32>() {
                Ok(n) if (1..=max).contains(&n) => {}
                _ => return Err(format!("{field} '{value}' must be a number in 1-{max}")),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::FieldValue;
    use serde_json::json;

    fn config(description: &str) -> FieldMap {
        let mut fields = ShaperQueue.defaults();
        fields.insert("pipe".into(), FieldValue::text("pipe-uuid"));
        fields.insert("description".into(), FieldValue::text(description));
        fields
    }

    #[test]
    fn test_description_is_required() {
        let mut fields = ShaperQueue.defaults();
        fields.insert("pipe".into(), FieldValue::text("pipe-uuid"));
        let err = ShaperQueue.prepare(fields).unwrap_err();
        assert!(err.to_string().contains("missing required field 'description'"));
    }

    #[test]
    fn test_weight_range() {
        let mut fields = config("voip");
        fields.insert("weight".into(), FieldValue::Int(50));
        assert!(ShaperQueue.prepare(fields.clone()).is_ok());

        fields.insert("weight".into(), FieldValue::Int(500));
        assert!(ShaperQueue.prepare(fields).is_err());
    }

    #[test]
    fn test_mask_choices() {
        let mut fields = config("voip");
        fields.insert("mask".into(), FieldValue::text("both"));
        assert!(ShaperQueue.prepare(fields).is_err());
    }

    #[test]
    fn test_canonicalize_selected_pipe() {
        let raw = json!({
            "pipe": {
                "pipe-uuid": {"value": "Upload", "selected": 1},
                "other-uuid": {"value": "Download", "selected": 0},
            },
            "mask": {
                "none": {"value": "none", "selected": 0},
                "src-ip": {"value": "source", "selected": 1},
                "dst-ip": {"value": "destination", "selected": 0},
            },
            "weight": "50",
            "buckets": "",
            "pie_enable": "0",
            "codel_enable": "1",
            "codel_ecn_enable": "0",
            "codel_target": "",
            "codel_interval": "",
            "description": "voip",
            "enabled": "1",
        });

        let existing = ShaperQueue
            .canonicalize("uuid-1", raw.as_object().unwrap())
            .unwrap();
        assert_eq!(existing.get("pipe"), &FieldValue::text("pipe-uuid"));
        assert_eq!(existing.get("mask"), &FieldValue::text("src-ip"));
        assert_eq!(existing.get("codel_enable"), &FieldValue::Bool(true));

        let mut desired = config("voip");
        desired.insert("mask".into(), FieldValue::text("src-ip"));
        desired.insert("weight".into(), FieldValue::text("50"));
        desired.insert("codel_enable".into(), FieldValue::Bool(true));
        let desired = ShaperQueue.prepare(desired).unwrap();
        assert!(
            declarative::diff::changed_fields(&desired, &existing, ShaperQueue.change_check_fields())
                .is_empty()
        );
    }
}
