pub mod schema;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use schema::{FieldSource, FieldSpec, ValueRule};

/// One of the six lookup services the console knows how to normalize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Mobile,
    #[serde(rename = "aadhaar", alias = "national_id")]
    NationalId,
    #[serde(rename = "gst", alias = "tax_registration")]
    TaxRegistration,
    #[serde(rename = "tg", alias = "messaging")]
    Messaging,
    Vehicle,
    #[serde(rename = "ifsc", alias = "bank_code")]
    BankCode,
}

impl RecordType {
    pub const ALL: [RecordType; 6] = [
        RecordType::Mobile,
        RecordType::NationalId,
        RecordType::TaxRegistration,
        RecordType::Messaging,
        RecordType::Vehicle,
        RecordType::BankCode,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mobile" | "phone" => Some(Self::Mobile),
            "aadhaar" | "aadhar" | "national-id" | "nid" => Some(Self::NationalId),
            "gst" | "gstin" | "tax" => Some(Self::TaxRegistration),
            "tg" | "telegram" | "messaging" => Some(Self::Messaging),
            "vehicle" | "rc" => Some(Self::Vehicle),
            "ifsc" | "bank" | "bank-code" => Some(Self::BankCode),
            _ => None,
        }
    }

    /// Short key used in history entries, file names and config.
    pub fn key(self) -> &'static str {
        match self {
            RecordType::Mobile => "mobile",
            RecordType::NationalId => "aadhaar",
            RecordType::TaxRegistration => "gst",
            RecordType::Messaging => "tg",
            RecordType::Vehicle => "vehicle",
            RecordType::BankCode => "ifsc",
        }
    }

    pub fn report_title(self) -> &'static str {
        match self {
            RecordType::Mobile => "MOBILE NUMBER ANALYSIS REPORT",
            RecordType::NationalId => "AADHAAR ANALYSIS REPORT",
            RecordType::TaxRegistration => "GST NUMBER ANALYSIS REPORT",
            RecordType::Messaging => "TELEGRAM USER ANALYSIS REPORT",
            RecordType::Vehicle => "VEHICLE RC ANALYSIS REPORT",
            RecordType::BankCode => "IFSC CODE ANALYSIS REPORT",
        }
    }

    pub fn batch_title(self) -> String {
        format!("BULK {} SEARCH REPORT", self.key().to_uppercase())
    }

    /// Resolves a report banner back to its record type. The flag is `true`
    /// for batch banners.
    pub fn from_title(title: &str) -> Option<(Self, bool)> {
        let title = title.trim();
        Self::ALL.into_iter().find_map(|rt| {
            if title == rt.report_title() {
                Some((rt, false))
            } else if title == rt.batch_title() {
                Some((rt, true))
            } else {
                None
            }
        })
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        schema::fields_for(self)
    }

    pub fn violation_fields(self) -> &'static [FieldSpec] {
        schema::violation_fields_for(self)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Number(serde_json::Number),
    List(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Flag(true) => write!(f, "Yes"),
            FieldValue::Flag(false) => write!(f, "No"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::List(items) => write!(f, "{}", items.join("; ")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Field {
    pub label: &'static str,
    #[serde(skip)]
    pub rule: ValueRule,
    pub value: FieldValue,
}

/// A record normalized out of one source object. Only populated fields are
/// present, in schema order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub record_type: RecordType,
    pub fields: Vec<Field>,
}

impl CanonicalRecord {
    pub fn get(&self, label: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| &f.value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Found,
    NotFound,
    Malformed,
    TransportError,
}

impl Verdict {
    pub fn is_found(self) -> bool {
        matches!(self, Verdict::Found)
    }
}

/// The outcome of one lookup call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LookupResult {
    pub record_type: RecordType,
    pub identifier: String,
    pub records: Vec<CanonicalRecord>,
    /// Secondary records (vehicle challans); empty for every other type.
    pub violations: Vec<CanonicalRecord>,
    pub raw: String,
    pub verdict: Verdict,
    pub transport_error: Option<String>,
}

impl LookupResult {
    pub fn transport_failure(record_type: RecordType, identifier: &str, message: String) -> Self {
        Self {
            record_type,
            identifier: identifier.to_string(),
            records: Vec::new(),
            violations: Vec::new(),
            raw: String::new(),
            verdict: Verdict::TransportError,
            transport_error: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_round_trip_through_from_title() {
        for rt in RecordType::ALL {
            assert_eq!(RecordType::from_title(rt.report_title()), Some((rt, false)));
            assert_eq!(RecordType::from_title(&rt.batch_title()), Some((rt, true)));
        }
        assert_eq!(RecordType::from_title("CHALLAN DETAILS"), None);
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(RecordType::parse("Aadhaar"), Some(RecordType::NationalId));
        assert_eq!(RecordType::parse(" rc "), Some(RecordType::Vehicle));
        assert_eq!(RecordType::parse("ifsc"), Some(RecordType::BankCode));
        assert_eq!(RecordType::parse("passport"), None);
    }

    #[test]
    fn flags_display_as_yes_no() {
        assert_eq!(FieldValue::Flag(true).to_string(), "Yes");
        assert_eq!(FieldValue::Flag(false).to_string(), "No");
    }
}
