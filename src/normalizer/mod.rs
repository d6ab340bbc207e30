pub mod response;

use serde_json::Value;
use tracing::debug;

use crate::record::{
    CanonicalRecord, Field, FieldSource, FieldSpec, FieldValue, LookupResult, RecordType,
    ValueRule, Verdict,
};

pub use response::clean_raw_response;

/// Maps a raw service response onto canonical records.
///
/// Non-JSON responses never produce records: they are `NotFound` when they
/// carry a negative marker and `Malformed` otherwise. JSON responses are
/// `Found` only when extraction yields at least one populated record and no
/// negative marker is present (see [`response::STRONG_MARKERS`] and
/// [`response::WEAK_MARKERS`] for where each kind is searched).
pub fn normalize(raw: &str, record_type: RecordType, identifier: &str) -> LookupResult {
    let mut result = LookupResult {
        record_type,
        identifier: identifier.to_string(),
        records: Vec::new(),
        violations: Vec::new(),
        raw: raw.to_string(),
        verdict: Verdict::Malformed,
        transport_error: None,
    };

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            debug!(%record_type, identifier, error = %e, "response is not JSON");
            if response::contains_any_marker(raw) {
                result.verdict = Verdict::NotFound;
            }
            return result;
        }
    };

    if response::contains_marker(raw, &response::STRONG_MARKERS) {
        result.verdict = Verdict::NotFound;
        return result;
    }

    let mut envelope_strings = Vec::new();
    response::string_values(&envelope(&parsed, record_type), &mut envelope_strings);
    if envelope_strings
        .iter()
        .any(|s| response::contains_marker(s, &response::WEAK_MARKERS))
    {
        result.verdict = Verdict::NotFound;
        return result;
    }

    result.records = primary_items(&parsed, record_type)
        .into_iter()
        .filter_map(|item| build_record(item, record_type, record_type.fields()))
        .collect();

    if result.records.is_empty() {
        result.verdict = Verdict::NotFound;
        return result;
    }

    result.violations = violation_items(&parsed, record_type)
        .into_iter()
        .filter_map(|item| build_record(item, record_type, record_type.violation_fields()))
        .collect();
    result.verdict = Verdict::Found;
    result
}

fn primary_items(parsed: &Value, record_type: RecordType) -> Vec<&Value> {
    match record_type {
        RecordType::Mobile | RecordType::NationalId => parsed
            .get("data")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter(|v| v.is_object()).collect())
            .unwrap_or_default(),
        RecordType::TaxRegistration | RecordType::Messaging => {
            parsed.get("data").filter(|v| v.is_object()).into_iter().collect()
        }
        RecordType::Vehicle => parsed
            .pointer("/result/vehicle_response")
            .filter(|v| v.is_object())
            .into_iter()
            .collect(),
        RecordType::BankCode => Some(parsed).filter(|v| v.is_object()).into_iter().collect(),
    }
}

fn violation_items(parsed: &Value, record_type: RecordType) -> Vec<&Value> {
    match record_type {
        RecordType::Vehicle => parsed
            .pointer("/result/challan_response/data")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter(|v| v.is_object()).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// The response with every record-bearing subtree removed.
fn envelope(parsed: &Value, record_type: RecordType) -> Value {
    let mut envelope = parsed.clone();
    match record_type {
        RecordType::Mobile
        | RecordType::NationalId
        | RecordType::TaxRegistration
        | RecordType::Messaging => {
            if let Some(map) = envelope.as_object_mut() {
                map.remove("data");
            }
        }
        RecordType::Vehicle => {
            if let Some(result) = envelope.get_mut("result").and_then(Value::as_object_mut) {
                result.remove("vehicle_response");
                if let Some(challans) = result
                    .get_mut("challan_response")
                    .and_then(Value::as_object_mut)
                {
                    challans.remove("data");
                }
            }
        }
        // the whole object is the record
        RecordType::BankCode => envelope = Value::Null,
    }
    envelope
}

fn build_record(
    item: &Value,
    record_type: RecordType,
    specs: &[FieldSpec],
) -> Option<CanonicalRecord> {
    let fields: Vec<Field> = specs
        .iter()
        .filter_map(|spec| {
            extract_field(item, spec).map(|value| Field {
                label: spec.label,
                rule: spec.rule,
                value,
            })
        })
        .collect();
    if fields.is_empty() {
        return None;
    }
    Some(CanonicalRecord {
        record_type,
        fields,
    })
}

fn walk<'a>(item: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(item, |node, key| node.get(key))
}

fn extract_field(item: &Value, spec: &FieldSpec) -> Option<FieldValue> {
    match spec.source {
        FieldSource::Key(key) => scalar(item.get(key), spec.rule),
        FieldSource::Path(path) => scalar(walk(item, path), spec.rule),
        FieldSource::Joined(keys) => {
            let parts: Vec<String> = keys
                .iter()
                .filter_map(|k| scalar_text(item.get(*k)))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(FieldValue::Text(spec.rule.apply(&parts.join(", "))))
            }
        }
        FieldSource::Prefixed { object, prefix } => {
            let map = walk(item, object)?.as_object()?;
            let items: Vec<String> = map
                .iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .filter_map(|(_, v)| scalar_text(Some(v)))
                .map(|s| s.replace('\n', " ").trim().to_string())
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(FieldValue::List(items))
            }
        }
    }
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar(value: Option<&Value>, rule: ValueRule) -> Option<FieldValue> {
    let value = value?;
    if rule == ValueRule::Flag {
        return match value {
            Value::Bool(b) => Some(FieldValue::Flag(*b)),
            Value::Number(n) => Some(FieldValue::Flag(n.as_f64().unwrap_or(0.0) != 0.0)),
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => {
                let s = s.trim().to_lowercase();
                Some(FieldValue::Flag(!matches!(s.as_str(), "false" | "0" | "no")))
            }
            _ => None,
        };
    }
    match (value, rule) {
        (Value::Number(n), ValueRule::Verbatim) => Some(FieldValue::Number(n.clone())),
        _ => scalar_text(Some(value)).map(|s| FieldValue::Text(rule.apply(&s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use rstest::rstest;
    use serde_json::json;

    fn text(record: &CanonicalRecord, label: &str) -> Option<String> {
        record.get(label).map(|v| v.to_string())
    }

    #[test]
    fn person_fields_follow_case_rules() {
        let raw = r#"{"data":[{"name":"john doe","fname":"richard roe","address":"12 main st!delhi","mobile":"9044192030","email":"A@B.com","circle":"up east","id":"123412341234"}]}"#;
        let result = normalize(raw, RecordType::Mobile, "9044192030");
        assert_eq!(result.verdict, Verdict::Found);
        assert_eq!(result.records.len(), 1);
        let r = &result.records[0];
        assert_eq!(text(r, "Name").as_deref(), Some("JOHN DOE"));
        assert_eq!(text(r, "Father's Name").as_deref(), Some("RICHARD ROE"));
        assert_eq!(text(r, "Address").as_deref(), Some("12 MAIN ST, DELHI"));
        assert_eq!(text(r, "Email").as_deref(), Some("a@b.com"));
        assert_eq!(text(r, "Circle").as_deref(), Some("UP EAST"));
        assert_eq!(text(r, "Aadhaar").as_deref(), Some("123412341234"));
    }

    #[test]
    fn empty_and_null_fields_are_omitted() {
        let raw = r#"{"data":[{"name":"a","fname":"","alt":null}]}"#;
        let result = normalize(raw, RecordType::Mobile, "9044192030");
        let r = &result.records[0];
        assert_eq!(r.fields.len(), 1);
        assert!(r.get("Father's Name").is_none());
        assert!(r.get("Alternative Number").is_none());
    }

    #[test]
    fn records_keep_source_order() {
        let raw = r#"{"data":[{"name":"first"},{},{"name":"second"}]}"#;
        let result = normalize(raw, RecordType::NationalId, "123412341234");
        let names: Vec<_> = result.records.iter().filter_map(|r| text(r, "Name")).collect();
        assert_eq!(names, vec!["FIRST".to_string(), "SECOND".to_string()]);
    }

    #[test]
    fn empty_data_list_is_not_found() {
        let result = normalize(r#"{"data":[]}"#, RecordType::Mobile, "9044192030");
        assert_eq!(result.verdict, Verdict::NotFound);
    }

    #[test]
    fn strong_marker_beats_records() {
        let raw = r#"{"message":"Data Not Found","data":[{"name":"x"}]}"#;
        let result = normalize(raw, RecordType::Mobile, "9044192030");
        assert_eq!(result.verdict, Verdict::NotFound);
        assert!(result.records.is_empty());
    }

    fn record_payload(record_type: RecordType) -> Value {
        match record_type {
            RecordType::Mobile | RecordType::NationalId => {
                json!({"data":[{"name":"john doe","id":"123412341234"}]})
            }
            RecordType::TaxRegistration => {
                json!({"data":{"Gstin":"09AAACR5055K1Z5","TradeName":"acme traders"}})
            }
            RecordType::Messaging => json!({"data":{"first_name":"ann","id":12345}}),
            RecordType::Vehicle => json!({"result":{"vehicle_response":{
                "asset_number":"UP32AB1234","owner_name":"john doe"
            }}}),
            RecordType::BankCode => json!({"IFSC":"SBIN0001234","BANK":"state bank of india"}),
        }
    }

    #[rstest]
    fn not_found_message_wins_for_every_type(
        #[values(
            RecordType::Mobile,
            RecordType::NationalId,
            RecordType::TaxRegistration,
            RecordType::Messaging,
            RecordType::Vehicle,
            RecordType::BankCode
        )]
        record_type: RecordType,
    ) {
        let mut payload = record_payload(record_type);
        let found = normalize(&payload.to_string(), record_type, "x");
        assert_eq!(found.verdict, Verdict::Found);

        payload["message"] = json!("Not Found");
        let result = normalize(&payload.to_string(), record_type, "x");
        assert_ne!(result.verdict, Verdict::Found);
        assert!(result.records.is_empty());
    }

    #[test]
    fn weak_marker_inside_record_does_not_flip_verdict() {
        let raw = r#"{"data":[{"name":"x","address":"near error bridge"}]}"#;
        let result = normalize(raw, RecordType::Mobile, "9044192030");
        assert_eq!(result.verdict, Verdict::Found);
    }

    #[test]
    fn weak_marker_in_envelope_is_not_found() {
        let raw = r#"{"status":"failed","data":[{"name":"x"}]}"#;
        let result = normalize(raw, RecordType::Mobile, "9044192030");
        assert_eq!(result.verdict, Verdict::NotFound);
    }

    #[test]
    fn non_json_without_markers_is_malformed() {
        let result = normalize("<html>gateway</html>", RecordType::Mobile, "9044192030");
        assert_eq!(result.verdict, Verdict::Malformed);
        let result = normalize("Invalid number", RecordType::Mobile, "9044192030");
        assert_eq!(result.verdict, Verdict::NotFound);
    }

    #[test]
    fn tax_address_is_assembled_from_parts() {
        let raw = r#"{"data":{"Gstin":"27AAPFU0939F1ZV","TradeName":"acme traders","AddrBno":"12","AddrFlno":"","AddrSt":"mg road","AddrBnm":null,"AddrLoc":"pune","Status":"Active"}}"#;
        let result = normalize(raw, RecordType::TaxRegistration, "27AAPFU0939F1ZV");
        assert_eq!(result.verdict, Verdict::Found);
        let r = &result.records[0];
        assert_eq!(text(r, "Address").as_deref(), Some("12, MG ROAD, PUNE"));
        assert_eq!(text(r, "Trade Name").as_deref(), Some("ACME TRADERS"));
        assert_eq!(text(r, "Status").as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn messaging_booleans_render_yes_no() {
        let raw = r#"{"data":{"first_name":"ann","id":12345,"is_active":true,"is_bot":false,"total_groups":4}}"#;
        let result = normalize(raw, RecordType::Messaging, "ann");
        let r = &result.records[0];
        assert_eq!(text(r, "Is Active").as_deref(), Some("Yes"));
        assert_eq!(text(r, "Is Bot").as_deref(), Some("No"));
        assert_eq!(text(r, "ID").as_deref(), Some("12345"));
        assert_eq!(text(r, "Total Groups").as_deref(), Some("4"));
    }

    #[test]
    fn vehicle_surfaces_challans() {
        let raw = r#"{"result":{"vehicle_response":{"asset_number":"up32ab1234","owner_name":"sam","is_commercial":false},
            "challan_response":{"data":[{"number":"CH1","amount":{"total":500},"challan_status":"pending",
            "violations":{"details":{"offence_1":"Over\nspeeding","offence_2":"","note":"skip"}}}]}}}"#;
        let result = normalize(raw, RecordType::Vehicle, "UP32AB1234");
        assert_eq!(result.verdict, Verdict::Found);
        assert_eq!(text(&result.records[0], "Asset Number").as_deref(), Some("UP32AB1234"));
        assert_eq!(text(&result.records[0], "Is Commercial").as_deref(), Some("No"));
        assert_eq!(result.violations.len(), 1);
        let c = &result.violations[0];
        assert_eq!(text(c, "Total Amount").as_deref(), Some("500"));
        assert_eq!(text(c, "Status").as_deref(), Some("PENDING"));
        assert_eq!(
            c.get("Violations"),
            Some(&FieldValue::List(vec!["Over speeding".to_string()]))
        );
    }

    #[test]
    fn bank_code_uses_top_level_object() {
        let raw = r#"{"IFSC":"SBIN0000001","BANK":"State Bank of India","UPI":true,"NEFT":false,"ADDRESS":"line one\nline two"}"#;
        let result = normalize(raw, RecordType::BankCode, "SBIN0000001");
        let r = &result.records[0];
        assert_eq!(text(r, "Bank").as_deref(), Some("STATE BANK OF INDIA"));
        assert_eq!(text(r, "Address").as_deref(), Some("LINE ONE, LINE TWO"));
        assert_eq!(text(r, "UPI").as_deref(), Some("Yes"));
        assert_eq!(text(r, "NEFT").as_deref(), Some("No"));
    }

    #[test]
    fn bank_code_error_object_is_not_found() {
        let result = normalize(r#"{"detail":"bad code"}"#, RecordType::BankCode, "XXXX0000000");
        assert_eq!(result.verdict, Verdict::NotFound);
    }
}
