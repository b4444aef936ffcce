//! Input validation shared by the registry, catalog and access gate.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::models::{NewPatient, NewPrescription, NewStaffMember};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// ICD-10 shape: letter, two digits, optional dotted suffix (e.g. `I10`, `J06.9`).
static ICD10_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][0-9]{2}(\.[0-9A-Z]{1,4})?$").unwrap());

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TEXT_LEN: usize = 10_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub fn require_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(field, format!("longer than {MAX_NAME_LEN} characters")));
    }
    Ok(())
}

pub fn optional_email(value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(email) if !EMAIL_PATTERN.is_match(email.trim()) => {
            Err(ValidationError::new("email", format!("'{email}' is not a valid address")))
        }
        _ => Ok(()),
    }
}

pub fn diagnosis_code(code: &str) -> Result<(), ValidationError> {
    if ICD10_PATTERN.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::new("code", format!("'{code}' is not an ICD-10 code")))
    }
}

pub fn free_text(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.len() > MAX_TEXT_LEN => {
            Err(ValidationError::new(field, format!("longer than {MAX_TEXT_LEN} bytes")))
        }
        _ => Ok(()),
    }
}

pub fn new_patient(patient: &NewPatient, today: NaiveDate) -> Result<(), ValidationError> {
    require_name("last_name", &patient.last_name)?;
    require_name("first_name", &patient.first_name)?;
    match patient.birth_date {
        None => return Err(ValidationError::new("birth_date", "is required")),
        Some(born) if born > today => {
            return Err(ValidationError::new("birth_date", "is in the future"));
        }
        Some(_) => {}
    }
    optional_email(patient.email.as_deref())
}

pub fn new_staff(staff: &NewStaffMember, today: NaiveDate) -> Result<(), ValidationError> {
    require_name("last_name", &staff.last_name)?;
    require_name("first_name", &staff.first_name)?;
    if staff.birth_date.is_some_and(|born| born > today) {
        return Err(ValidationError::new("birth_date", "is in the future"));
    }
    optional_email(staff.email.as_deref())
}

pub fn new_prescription(rx: &NewPrescription) -> Result<(), ValidationError> {
    require_name("medication_name", &rx.medication_name)?;
    if let (Some(start), Some(end)) = (rx.start_date, rx.end_date) {
        if start > end {
            return Err(ValidationError::new("end_date", "is before start_date"));
        }
    }
    free_text("instructions", rx.instructions.as_deref())
}
