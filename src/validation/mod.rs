//! Declarative form validation.
//!
//! Every writable entity has a create command whose fields carry
//! `validator` rules. [`FormSchema::check`] normalizes the payload, runs
//! those rules and returns either the typed, normalized value or a
//! [`ValidationReport`] listing each offending field. Nothing here touches
//! the row store.

use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::common::parse_calendar_date;
use crate::models::Gender;

lazy_static! {
    pub static ref PINCODE_RE: Regex = Regex::new(r"^\d{6}$").expect("pincode pattern compiles");
}

/// One rule a submitted field broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Every violation found in one payload, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    violations: Vec<FieldViolation>,
}

impl ValidationReport {
    pub fn from_violations(mut violations: Vec<FieldViolation>) -> Self {
        violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
        Self { violations }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.violations.iter().map(|v| v.field.as_str()).collect();
        fields.dedup();
        fields
    }

    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl From<ValidationErrors> for ValidationReport {
    fn from(errors: ValidationErrors) -> Self {
        let violations = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    FieldViolation::new(field, err.code.to_string(), message)
                })
            })
            .collect();
        ValidationReport::from_violations(violations)
    }
}

/// A payload with declarative field rules and a normalized output shape.
pub trait FormSchema: Validate + Sized {
    type Output;

    /// Trims strings and drops empty optional fields.
    fn normalized(self) -> Self;

    /// Builds the typed value from an already validated payload.
    fn into_output(self) -> Result<Self::Output, ValidationReport>;

    fn check(self) -> Result<Self::Output, ValidationReport> {
        let normalized = self.normalized();
        normalized.validate().map_err(ValidationReport::from)?;
        normalized.into_output()
    }
}

/// Trims a required field.
pub fn trimmed(value: String) -> String {
    value.trim().to_string()
}

/// Trims an optional field, treating blank input as absent.
pub fn trimmed_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn validate_pincode(value: &str) -> Result<(), ValidationError> {
    if PINCODE_RE.is_match(value) {
        Ok(())
    } else {
        Err(violation("pincode", "Pincode must be exactly 6 digits"))
    }
}

pub fn validate_calendar_date(value: &str) -> Result<(), ValidationError> {
    match parse_calendar_date(value) {
        Some(_) => Ok(()),
        None => Err(violation("date", "Invalid date format")),
    }
}

pub fn validate_gender(value: &str) -> Result<(), ValidationError> {
    match value.parse::<Gender>() {
        Ok(_) => Ok(()),
        Err(_) => Err(violation("gender", "Gender must be one of male, female, other")),
    }
}

pub fn validate_clock_time(value: &str) -> Result<(), ValidationError> {
    match parse_clock_time(value) {
        Some(_) => Ok(()),
        None => Err(violation("time", "Time must be in HH:MM format")),
    }
}

pub fn validate_non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(violation("amount_negative", "Amount cannot be negative"))
    } else {
        Ok(())
    }
}

pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
        .ok()
}

/// Re-parses a date field for the typed output, reporting the field on failure.
pub(crate) fn require_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationReport> {
    parse_calendar_date(value).ok_or_else(|| {
        ValidationReport::from_violations(vec![FieldViolation::new(field, "date", "Invalid date format")])
    })
}

pub(crate) fn require_gender(field: &'static str, value: &str) -> Result<Gender, ValidationReport> {
    value.parse::<Gender>().map_err(|_| {
        ValidationReport::from_violations(vec![FieldViolation::new(
            field,
            "gender",
            "Gender must be one of male, female, other",
        )])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case("123456", true ; "six digits")]
    #[test_case("12345", false ; "five digits")]
    #[test_case("1234567", false ; "seven digits")]
    #[test_case("12a456", false ; "letter inside")]
    #[test_case("", false ; "empty")]
    fn pincode_rule(input: &str, ok: bool) {
        assert_eq!(validate_pincode(input).is_ok(), ok);
    }

    #[test_case("09:30", true)]
    #[test_case("21:05:00", true)]
    #[test_case("9.30", false)]
    #[test_case("25:00", false)]
    fn clock_time_rule(input: &str, ok: bool) {
        assert_eq!(validate_clock_time(input).is_ok(), ok);
    }

    #[test]
    fn gender_is_case_insensitive() {
        assert!(validate_gender("Female").is_ok());
        assert!(validate_gender("unknown").is_err());
    }

    #[test]
    fn negative_amounts_rejected() {
        assert!(validate_non_negative_amount(&dec!(0)).is_ok());
        assert!(validate_non_negative_amount(&dec!(250.50)).is_ok());
        assert!(validate_non_negative_amount(&dec!(-1)).is_err());
    }

    #[test]
    fn report_is_sorted_and_displayable() {
        let report = ValidationReport::from_violations(vec![
            FieldViolation::new("pincode", "pincode", "Pincode must be exactly 6 digits"),
            FieldViolation::new("email", "email", "Please enter a valid email address."),
        ]);
        assert_eq!(report.fields(), vec!["email", "pincode"]);
        assert_eq!(
            report.to_string(),
            "email: Please enter a valid email address.; pincode: Pincode must be exactly 6 digits"
        );
        assert!(report.clone().into_result().is_err());
        assert!(ValidationReport::default().into_result().is_ok());
    }

    #[test]
    fn blank_optionals_become_absent() {
        assert_eq!(trimmed_optional(Some("   ".into())), None);
        assert_eq!(trimmed_optional(Some(" 9876543210 ".into())), Some("9876543210".into()));
        assert_eq!(trimmed("  Asha  ".into()), "Asha");
    }
}
