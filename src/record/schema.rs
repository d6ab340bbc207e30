use super::RecordType;

/// How a source value is turned into its canonical text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueRule {
    /// Free text, upper-cased.
    Upper,
    /// Lower-cased (email addresses).
    Lower,
    /// Numbers, identifiers and dates, copied unchanged.
    Verbatim,
    /// Separator characters become ", " before upper-casing.
    Address,
    /// Booleans rendered as "Yes" / "No".
    Flag,
}

impl ValueRule {
    pub fn apply(self, value: &str) -> String {
        match self {
            ValueRule::Upper => value.to_uppercase(),
            ValueRule::Lower => value.to_lowercase(),
            ValueRule::Verbatim | ValueRule::Flag => value.to_string(),
            ValueRule::Address => value
                .replace("\r\n", ", ")
                .replace(['!', '\n'], ", ")
                .to_uppercase(),
        }
    }
}

/// Where a field's value lives in the source object.
#[derive(Clone, Copy, Debug)]
pub enum FieldSource {
    Key(&'static str),
    /// Nested object path, e.g. `amount.total`.
    Path(&'static [&'static str]),
    /// Several optional keys joined with ", ", absent parts omitted.
    Joined(&'static [&'static str]),
    /// Every string entry of the object at `object` whose key starts with `prefix`.
    Prefixed {
        object: &'static [&'static str],
        prefix: &'static str,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub source: FieldSource,
    pub label: &'static str,
    pub rule: ValueRule,
}

const fn key(source: &'static str, label: &'static str, rule: ValueRule) -> FieldSpec {
    FieldSpec {
        source: FieldSource::Key(source),
        label,
        rule,
    }
}

use ValueRule::{Address, Flag, Lower, Upper, Verbatim};

// mobile and national-ID services share one person schema
pub const PERSON_FIELDS: &[FieldSpec] = &[
    key("name", "Name", Upper),
    key("fname", "Father's Name", Upper),
    key("address", "Address", Address),
    key("mobile", "Phone Number", Verbatim),
    key("alt", "Alternative Number", Verbatim),
    key("circle", "Circle", Upper),
    key("email", "Email", Lower),
    key("id", "Aadhaar", Verbatim),
];

pub const TAX_FIELDS: &[FieldSpec] = &[
    key("Gstin", "GSTIN", Verbatim),
    key("TradeName", "Trade Name", Upper),
    key("LegalName", "Legal Name", Upper),
    FieldSpec {
        source: FieldSource::Joined(&["AddrBno", "AddrFlno", "AddrSt", "AddrBnm", "AddrLoc"]),
        label: "Address",
        rule: Upper,
    },
    key("StateCode", "State Code", Verbatim),
    key("AddrPncd", "Pincode", Verbatim),
    key("TxpType", "Taxpayer Type", Verbatim),
    key("Status", "Status", Upper),
    key("BlkStatus", "Block Status", Upper),
    key("DtReg", "Registration Date", Verbatim),
    key("DtDReg", "Deregistration Date", Verbatim),
];

pub const MESSAGING_FIELDS: &[FieldSpec] = &[
    key("first_name", "First Name", Upper),
    key("last_name", "Last Name", Upper),
    key("id", "ID", Verbatim),
    key("is_active", "Is Active", Flag),
    key("is_bot", "Is Bot", Flag),
    key("first_msg_date", "First Message Date", Verbatim),
    key("last_msg_date", "Last Message Date", Verbatim),
    key("adm_in_groups", "Admin in Groups", Verbatim),
    key("msg_in_groups_count", "Messages in Groups", Verbatim),
    key("names_count", "Names Count", Verbatim),
    key("total_groups", "Total Groups", Verbatim),
    key("total_msg_count", "Total Messages", Verbatim),
    key("usernames_count", "Usernames Count", Verbatim),
];

pub const VEHICLE_FIELDS: &[FieldSpec] = &[
    key("asset_number", "Asset Number", Upper),
    key("asset_type", "Asset Type", Upper),
    key("registration_year", "Registration Year", Verbatim),
    key("registration_month", "Registration Month", Verbatim),
    key("make_model", "Make Model", Upper),
    key("vehicle_type", "Vehicle Type", Upper),
    key("make_name", "Make Name", Upper),
    key("fuel_type", "Fuel Type", Upper),
    key("engine_number", "Engine Number", Verbatim),
    key("owner_name", "Owner Name", Upper),
    key("chassis_number", "Chassis Number", Verbatim),
    key("previous_insurer", "Previous Insurer", Upper),
    key(
        "previous_policy_expiry_date",
        "Previous Policy Expiry Date",
        Verbatim,
    ),
    key("is_commercial", "Is Commercial", Flag),
    key("vehicle_type_v2", "Vehicle Type V2", Upper),
    key("vehicle_type_processed", "Vehicle Type Processed", Upper),
    key("permanent_address", "Permanent Address", Address),
    key("present_address", "Present Address", Address),
    key("registration_date", "Registration Date", Verbatim),
    key("registration_address", "Registration Address", Address),
    key("model_name", "Model Name", Upper),
    key("make_name2", "Make Name 2", Upper),
    key("model_name2", "Model Name 2", Upper),
    key("variant_id", "Variant ID", Verbatim),
    key("variant_id_0", "Variant ID 0", Verbatim),
    key("previous_policy_expired", "Previous Policy Expired", Flag),
];

pub const CHALLAN_FIELDS: &[FieldSpec] = &[
    key("number", "Challan Number", Verbatim),
    FieldSpec {
        source: FieldSource::Path(&["amount", "total"]),
        label: "Total Amount",
        rule: Verbatim,
    },
    key("state", "State", Verbatim),
    key("challan_status", "Status", Upper),
    key("date", "Date", Verbatim),
    key("name", "Name", Upper),
    key("location", "Location", Upper),
    FieldSpec {
        source: FieldSource::Prefixed {
            object: &["violations", "details"],
            prefix: "offence",
        },
        label: "Violations",
        rule: Verbatim,
    },
];

pub const BANK_FIELDS: &[FieldSpec] = &[
    key("IFSC", "IFSC", Verbatim),
    key("BANK", "Bank", Upper),
    key("BANKCODE", "Bank Code", Verbatim),
    key("BRANCH", "Branch", Upper),
    key("ADDRESS", "Address", Address),
    key("CITY", "City", Upper),
    key("DISTRICT", "District", Upper),
    key("STATE", "State", Upper),
    key("CENTRE", "Centre", Upper),
    key("MICR", "MICR", Verbatim),
    key("CONTACT", "Contact", Verbatim),
    key("UPI", "UPI", Flag),
    key("RTGS", "RTGS", Flag),
    key("NEFT", "NEFT", Flag),
    key("IMPS", "IMPS", Flag),
    key("SWIFT", "SWIFT", Verbatim),
    key("ISO3166", "ISO3166", Verbatim),
];

pub fn fields_for(record_type: RecordType) -> &'static [FieldSpec] {
    match record_type {
        RecordType::Mobile | RecordType::NationalId => PERSON_FIELDS,
        RecordType::TaxRegistration => TAX_FIELDS,
        RecordType::Messaging => MESSAGING_FIELDS,
        RecordType::Vehicle => VEHICLE_FIELDS,
        RecordType::BankCode => BANK_FIELDS,
    }
}

pub fn violation_fields_for(record_type: RecordType) -> &'static [FieldSpec] {
    match record_type {
        RecordType::Vehicle => CHALLAN_FIELDS,
        _ => &[],
    }
}

/// Casing rule for a rendered `Label: VALUE` line.
///
/// Looks the label up in the record type's primary and secondary schemas.
/// Labels that belong to neither (batch status lines, raw response dumps)
/// fall back to lower case for anything mentioning email and upper case for
/// everything else.
pub fn rule_for_label(record_type: Option<RecordType>, label: &str) -> ValueRule {
    if let Some(rt) = record_type {
        let found = fields_for(rt)
            .iter()
            .chain(violation_fields_for(rt).iter())
            .find(|spec| spec.label == label);
        if let Some(spec) = found {
            return spec.rule;
        }
    }
    if label.to_lowercase().contains("email") {
        ValueRule::Lower
    } else {
        ValueRule::Upper
    }
}
