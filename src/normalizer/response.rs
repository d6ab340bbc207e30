use serde_json::Value;

/// Phrases that always mark a response as negative, wherever they appear.
pub const STRONG_MARKERS: [&str; 2] = ["not found", "no data"];

/// Single words that only count outside the record-bearing part of a
/// structured response, so an address containing "error" is not misread.
pub const WEAK_MARKERS: [&str; 3] = ["error", "invalid", "failed"];

pub fn contains_marker(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

pub fn contains_any_marker(text: &str) -> bool {
    contains_marker(text, &STRONG_MARKERS) || contains_marker(text, &WEAK_MARKERS)
}

/// Collects every string value (not key) in a JSON tree.
pub(crate) fn string_values(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| string_values(v, out)),
        Value::Object(map) => map.values().for_each(|v| string_values(v, out)),
        _ => {}
    }
}

fn strip_punctuation(text: &str) -> Vec<String> {
    text.replace(['{', '}', '[', ']', '"'], "")
        .replace(',', "\n")
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Best-effort readable form of a response that could not be turned into
/// records: one token per line, bracket and quote punctuation removed.
pub fn clean_raw_response(raw: &str) -> Vec<String> {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return strip_punctuation(raw),
    };

    if let Some(items) = parsed.get("data").and_then(Value::as_array) {
        if !items.is_empty() {
            return vec!["Server returned valid data".to_string()];
        }
    }

    for key in ["message", "error"] {
        match parsed.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return vec![s.trim().to_string()],
            Some(Value::Null) | None => {}
            Some(Value::Bool(false)) => {}
            Some(_) if key == "error" => {
                return vec!["Server returned error response".to_string()];
            }
            Some(_) => {}
        }
    }

    let pretty = serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| raw.to_string());
    strip_punctuation(&pretty)
}
