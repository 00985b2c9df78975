use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::Deed;
use crate::utils::json::{classify_nullable, NullableValue};

pub const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Keys every analysis payload must carry, in wire order.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "document_type",
    "has_inquiry_history",
    "inquiry_date",
    "deed_date",
    "uses_tashil_law",
    "inquiry_response_has_issue",
    "text",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Booklet,
    Electronic,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [
        DocumentType::Booklet,
        DocumentType::Electronic,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Booklet => "booklet",
            DocumentType::Electronic => "electronic",
            DocumentType::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ValidationError;

    /// Exact, case-sensitive match on the wire name.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| {
                ValidationError::invalid(
                    "document_type",
                    format!("'{value}' is not one of booklet, electronic, other"),
                )
            })
    }
}

/// The seven deed attributes the rule engine reads. Serializes to the flat
/// payload shared by every evaluator, with dates as `YYYY-MM-DD` or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub document_type: DocumentType,
    pub has_inquiry_history: bool,
    pub inquiry_date: Option<NaiveDate>,
    pub deed_date: Option<NaiveDate>,
    pub uses_tashil_law: bool,
    pub inquiry_response_has_issue: bool,
    pub text: String,
}

impl AnalysisInput {
    /// Like [`from_payload`](Self::from_payload), but `null` counts as
    /// missing for every key, the dates included. Used by the public
    /// stateless analysis endpoint.
    pub fn from_complete_payload(body: &Value) -> Result<Self, ValidationError> {
        for field in REQUIRED_FIELDS {
            if matches!(body.get(field), None | Some(Value::Null)) {
                return Err(ValidationError::MissingField(field));
            }
        }
        Self::from_payload(body)
    }

    /// Validates a raw JSON payload. Every key in [`REQUIRED_FIELDS`] must be
    /// present; only the two date fields may be `null`.
    pub fn from_payload(body: &Value) -> Result<Self, ValidationError> {
        for field in REQUIRED_FIELDS {
            match body.get(field) {
                None => return Err(ValidationError::MissingField(field)),
                Some(Value::Null) if !matches!(field, "inquiry_date" | "deed_date") => {
                    return Err(ValidationError::MissingField(field))
                }
                _ => {}
            }
        }

        let document_type = match body.get("document_type") {
            Some(Value::String(value)) => value.parse()?,
            _ => return Err(ValidationError::invalid("document_type", "expected string")),
        };

        let text = match body.get("text") {
            Some(Value::String(value)) if !value.trim().is_empty() => value.clone(),
            Some(Value::String(_)) => {
                return Err(ValidationError::invalid("text", "must not be empty"))
            }
            _ => return Err(ValidationError::invalid("text", "expected string")),
        };

        Ok(Self {
            document_type,
            has_inquiry_history: required_bool(body, "has_inquiry_history")?,
            inquiry_date: nullable_date(body, "inquiry_date")?,
            deed_date: nullable_date(body, "deed_date")?,
            uses_tashil_law: required_bool(body, "uses_tashil_law")?,
            inquiry_response_has_issue: required_bool(body, "inquiry_response_has_issue")?,
            text,
        })
    }
}

impl TryFrom<&Deed> for AnalysisInput {
    type Error = ValidationError;

    fn try_from(deed: &Deed) -> Result<Self, Self::Error> {
        if deed.text.trim().is_empty() {
            return Err(ValidationError::invalid("text", "must not be empty"));
        }
        Ok(Self {
            document_type: deed.document_type.parse()?,
            has_inquiry_history: deed.has_inquiry_history,
            inquiry_date: deed.inquiry_date,
            deed_date: deed.deed_date,
            uses_tashil_law: deed.uses_tashil_law,
            inquiry_response_has_issue: deed.inquiry_response_has_issue,
            text: deed.text.clone(),
        })
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the date.
/// Blank input means "no date".
pub fn parse_calendar_date(
    field: &'static str,
    raw: &str,
) -> Result<Option<NaiveDate>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, CALENDAR_DATE_FORMAT) {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|timestamp| Some(timestamp.date_naive()))
        .map_err(|_| ValidationError::invalid(field, format!("'{raw}' is not a YYYY-MM-DD date")))
}

/// Reads a date field that may be omitted, `null` or a date string.
/// `Ok(None)` means omitted; `Ok(Some(None))` means explicitly cleared.
pub fn patch_date(
    body: &Value,
    field: &'static str,
) -> Result<Option<Option<NaiveDate>>, ValidationError> {
    match classify_nullable(body.get(field)).map_err(|reason| ValidationError::invalid(field, reason))? {
        NullableValue::Omitted => Ok(None),
        NullableValue::Null => Ok(Some(None)),
        NullableValue::String(raw) => parse_calendar_date(field, &raw).map(Some),
    }
}

fn nullable_date(body: &Value, field: &'static str) -> Result<Option<NaiveDate>, ValidationError> {
    Ok(patch_date(body, field)?.flatten())
}

fn required_bool(body: &Value, field: &'static str) -> Result<bool, ValidationError> {
    match body.get(field) {
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(ValidationError::invalid(field, "expected boolean")),
        None => Err(ValidationError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload() -> Value {
        json!({
            "document_type": "booklet",
            "has_inquiry_history": true,
            "inquiry_date": "2025-07-20",
            "deed_date": null,
            "uses_tashil_law": false,
            "inquiry_response_has_issue": false,
            "text": "متن سند"
        })
    }

    #[test]
    fn parses_complete_payload() {
        let input = AnalysisInput::from_payload(&payload()).unwrap();
        assert_eq!(input.document_type, DocumentType::Booklet);
        assert!(input.has_inquiry_history);
        assert_eq!(input.inquiry_date, NaiveDate::from_ymd_opt(2025, 7, 20));
        assert_eq!(input.deed_date, None);
    }

    #[test]
    fn reports_first_missing_field() {
        let mut body = payload();
        body.as_object_mut().unwrap().remove("uses_tashil_law");
        assert_eq!(
            AnalysisInput::from_payload(&body),
            Err(ValidationError::MissingField("uses_tashil_law"))
        );
        assert_eq!(
            ValidationError::MissingField("uses_tashil_law").to_string(),
            "Missing required field: uses_tashil_law"
        );
    }

    #[test]
    fn null_is_missing_except_for_dates() {
        let mut body = payload();
        body["text"] = Value::Null;
        assert_eq!(
            AnalysisInput::from_payload(&body),
            Err(ValidationError::MissingField("text"))
        );

        let mut body = payload();
        body["inquiry_date"] = Value::Null;
        assert!(AnalysisInput::from_payload(&body).is_ok());
    }

    #[test]
    fn rejects_wrong_types_and_unknown_document_type() {
        let mut body = payload();
        body["has_inquiry_history"] = json!("yes");
        assert!(matches!(
            AnalysisInput::from_payload(&body),
            Err(ValidationError::InvalidField {
                field: "has_inquiry_history",
                ..
            })
        ));

        let mut body = payload();
        body["document_type"] = json!("scroll");
        assert!(matches!(
            AnalysisInput::from_payload(&body),
            Err(ValidationError::InvalidField {
                field: "document_type",
                ..
            })
        ));

        let mut body = payload();
        body["deed_date"] = json!("20/07/2025");
        assert!(matches!(
            AnalysisInput::from_payload(&body),
            Err(ValidationError::InvalidField {
                field: "deed_date",
                ..
            })
        ));
    }

    #[test]
    fn parses_plain_and_timestamp_dates() {
        assert_eq!(
            parse_calendar_date("deed_date", "2025-08-15").unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 15)
        );
        assert_eq!(
            parse_calendar_date("deed_date", "2025-08-15T00:00:00.000Z").unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 15)
        );
        assert_eq!(parse_calendar_date("deed_date", "  ").unwrap(), None);
    }

    #[test]
    fn serializes_flat_payload_with_calendar_dates() {
        let input = AnalysisInput::from_payload(&payload()).unwrap();
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["document_type"], "booklet");
        assert_eq!(value["inquiry_date"], "2025-07-20");
        assert_eq!(value["deed_date"], Value::Null);
        assert_eq!(value.as_object().unwrap().len(), REQUIRED_FIELDS.len());
    }

    #[test]
    fn document_type_parsing_is_exact() {
        assert_eq!(
            "electronic".parse::<DocumentType>(),
            Ok(DocumentType::Electronic)
        );
        for raw in ["Booklet", "BOOKLET", " booklet", ""] {
            assert!(raw.parse::<DocumentType>().is_err(), "{raw:?}");
        }
    }

    #[test]
    fn complete_payload_treats_null_dates_as_missing() {
        let body = payload();
        assert_eq!(
            AnalysisInput::from_complete_payload(&body),
            Err(ValidationError::MissingField("deed_date"))
        );

        let mut body = payload();
        body["deed_date"] = json!("2025-08-15");
        let input = AnalysisInput::from_complete_payload(&body).unwrap();
        assert_eq!(input.deed_date, NaiveDate::from_ymd_opt(2025, 8, 15));

        body["inquiry_date"] = Value::Null;
        assert_eq!(
            AnalysisInput::from_complete_payload(&body),
            Err(ValidationError::MissingField("inquiry_date"))
        );
    }
}
