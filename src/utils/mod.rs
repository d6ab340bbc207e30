use thiserror::Error;

use crate::record::RecordType;

/// Length constraint an identifier must satisfy before it is sent anywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentifierRule {
    Exact(usize),
    AtLeast(usize),
    NonEmpty,
}

impl IdentifierRule {
    pub fn accepts(self, value: &str) -> bool {
        let len = value.chars().count();
        match self {
            IdentifierRule::Exact(n) => len == n,
            IdentifierRule::AtLeast(n) => len >= n,
            IdentifierRule::NonEmpty => len > 0,
        }
    }

    /// Chunk size used when splitting a run of digits into identifiers.
    pub fn chunk_len(self) -> Option<usize> {
        match self {
            IdentifierRule::Exact(n) => Some(n),
            _ => None,
        }
    }
}

pub fn identifier_rule(record_type: RecordType) -> IdentifierRule {
    match record_type {
        RecordType::Mobile => IdentifierRule::Exact(10),
        RecordType::NationalId => IdentifierRule::Exact(12),
        RecordType::TaxRegistration => IdentifierRule::Exact(15),
        RecordType::BankCode => IdentifierRule::Exact(11),
        RecordType::Vehicle => IdentifierRule::AtLeast(10),
        RecordType::Messaging => IdentifierRule::NonEmpty,
    }
}

/// Human readable expectation, e.g. `10 digits` or `15 characters`.
pub fn expectation(record_type: RecordType) -> String {
    let unit = if is_numeric(record_type) {
        "digits"
    } else {
        "characters"
    };
    match identifier_rule(record_type) {
        IdentifierRule::Exact(n) => format!("{n} {unit}"),
        IdentifierRule::AtLeast(n) => format!("at least {n} {unit}"),
        IdentifierRule::NonEmpty => "a non-empty value".to_string(),
    }
}

pub fn is_numeric(record_type: RecordType) -> bool {
    matches!(record_type, RecordType::Mobile | RecordType::NationalId)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty {record_type} identifier")]
    Empty { record_type: RecordType },

    #[error("invalid {record_type} identifier '{value}', expected {expected}")]
    Length {
        record_type: RecordType,
        value: String,
        expected: String,
    },
}

/// Strips characters the record type never contains.
pub fn clean_identifier(record_type: RecordType, value: &str) -> String {
    let value = value.trim();
    match record_type {
        RecordType::Mobile | RecordType::NationalId => {
            value.chars().filter(|c| c.is_ascii_digit()).collect()
        }
        RecordType::TaxRegistration | RecordType::Vehicle | RecordType::BankCode => value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase(),
        RecordType::Messaging => value.to_string(),
    }
}

/// Cleans an identifier and trims it to its canonical length.
///
/// Mobile numbers lose a leading `91` or `0` country/trunk prefix when they
/// are longer than ten digits.
pub fn format_identifier(record_type: RecordType, value: &str) -> String {
    let mut cleaned = clean_identifier(record_type, value);
    if record_type == RecordType::Mobile && cleaned.len() > 10 {
        if let Some(rest) = cleaned.strip_prefix("91") {
            cleaned = rest.to_string();
        } else if let Some(rest) = cleaned.strip_prefix('0') {
            cleaned = rest.to_string();
        }
    }
    if let Some(max) = identifier_rule(record_type).chunk_len() {
        cleaned.truncate(max);
    }
    cleaned
}

pub fn validate_identifier(record_type: RecordType, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { record_type });
    }
    if !identifier_rule(record_type).accepts(value) {
        return Err(ValidationError::Length {
            record_type,
            value: value.to_string(),
            expected: expectation(record_type),
        });
    }
    Ok(())
}

/// Splits batch input into identifiers: one per line, trimmed, empty lines
/// dropped. Numeric types lose non-digit characters and a line that holds a
/// run of several identifiers back to back is chunked.
pub fn parse_batch_identifiers(record_type: RecordType, input: &str) -> Vec<String> {
    let mut out = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !is_numeric(record_type) {
            out.push(line.to_string());
            continue;
        }
        let digits = clean_identifier(record_type, line);
        if digits.is_empty() {
            continue;
        }
        match identifier_rule(record_type).chunk_len() {
            Some(n) if digits.len() > n && digits.len() % n == 0 => {
                out.extend(chunk_digits(&digits, n));
            }
            _ => out.push(digits),
        }
    }
    out
}

pub fn chunk_digits(digits: &str, size: usize) -> Vec<String> {
    if size == 0 {
        return vec![digits.to_string()];
    }
    digits
        .as_bytes()
        .chunks(size)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect()
}
