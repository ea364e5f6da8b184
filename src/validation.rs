//! Field-level validation of request payloads.

use bson::oid::ObjectId;
use bookreview_http::error::AppError;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};
use serde_json::json;

use crate::catalog::parse_id;

pub const REQUIRED: &str = "required";
pub const EMPTY: &str = "empty";
pub const OUT_OF_RANGE: &str = "out_of_range";
pub const INVALID_ID: &str = "invalid_id";
pub const NOT_FOUND: &str = "not_found";
pub const DUPLICATE: &str = "duplicate";

/// Collects every rule a payload breaks, then fails once with all of them.
#[derive(Debug, Default)]
pub struct FieldErrors {
    details: Vec<serde_json::Value>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, error: &str) {
        self.details.push(json!({ "field": field, "error": error }));
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Value of a required field, recording `required` when it is absent.
    pub fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(field, REQUIRED);
        }
        value
    }

    /// Required text must be present and not blank.
    pub fn required_text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = self.required(field, value)?;
        self.text(field, value)
    }

    /// Text that is being changed must not be blank.
    pub fn text(&mut self, field: &str, value: String) -> Option<String> {
        if value.trim().is_empty() {
            self.push(field, EMPTY);
            return None;
        }
        Some(value)
    }

    pub fn at_least(&mut self, field: &str, value: i64, min: i64) -> Option<i64> {
        if value < min {
            self.push(field, OUT_OF_RANGE);
            return None;
        }
        Some(value)
    }

    pub fn within(&mut self, field: &str, value: i64, min: i64, max: i64) -> Option<i64> {
        if !(min..=max).contains(&value) {
            self.push(field, OUT_OF_RANGE);
            return None;
        }
        Some(value)
    }

    /// A reference id must at least be a well-formed ObjectId; whether it
    /// resolves is checked against the store afterwards.
    pub fn reference(&mut self, field: &str, value: &str) -> Option<ObjectId> {
        let id = parse_id(value);
        if id.is_none() {
            self.push(field, INVALID_ID);
        }
        id
    }

    pub fn finish(self, message: &str) -> Result<(), AppError> {
        if self.details.is_empty() {
            Ok(())
        } else {
            Err(self.into_error(message))
        }
    }

    pub fn into_error(self, message: &str) -> AppError {
        AppError::validation(self.details, message)
    }
}

/// A well-formed reference that does not resolve to a stored record.
pub fn dangling_reference(field: &str, message: &str) -> AppError {
    let mut errors = FieldErrors::new();
    errors.push(field, NOT_FOUND);
    errors.into_error(message)
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the date.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_date(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Dated {
        #[serde(default, deserialize_with = "lenient_date")]
        date: Option<NaiveDate>,
    }

    #[test]
    fn dates_accept_plain_and_timestamp_forms() {
        let plain: Dated = serde_json::from_str(r#"{"date": "1970-01-01"}"#).unwrap();
        let stamped: Dated = serde_json::from_str(r#"{"date": "1970-01-01T12:30:00Z"}"#).unwrap();
        let missing: Dated = serde_json::from_str("{}").unwrap();

        let expected = NaiveDate::from_ymd_opt(1970, 1, 1);
        assert_eq!(plain.date, expected);
        assert_eq!(stamped.date, expected);
        assert_eq!(missing.date, None);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(serde_json::from_str::<Dated>(r#"{"date": "01/01/1970"}"#).is_err());
        assert!(serde_json::from_str::<Dated>(r#"{"date": 1970}"#).is_err());
    }

    #[test]
    fn collects_every_broken_rule() {
        let mut errors = FieldErrors::new();
        assert!(errors.required_text("name", None).is_none());
        assert!(errors.required_text("country", Some("  ".to_string())).is_none());
        assert!(errors.within("score", 6, 1, 5).is_none());
        assert_eq!(errors.at_least("sales", 0, 0), Some(0));
        assert!(errors.reference("book", "not-an-id").is_none());

        match errors.finish("Invalid payload").unwrap_err() {
            AppError::Validation { details, .. } => {
                let fields: Vec<&str> = details
                    .iter()
                    .map(|detail| detail["field"].as_str().unwrap())
                    .collect();
                assert_eq!(fields, vec!["name", "country", "score", "book"]);
                assert_eq!(details[1]["error"], EMPTY);
                assert_eq!(details[2]["error"], OUT_OF_RANGE);
                assert_eq!(details[3]["error"], INVALID_ID);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn no_errors_means_ok() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.within("score", 5, 1, 5), Some(5));
        assert!(errors.is_empty());
        assert!(errors.finish("unused").is_ok());
    }
}
