//! Party registry commands: patients and the doctor directory.

use crate::auth::Session;
use crate::core_state::CoreState;
use crate::db::{repository, DatabaseError};
use crate::models::{NewPatient, Patient, StaffTitle};
use crate::validation;

use super::{guard, CommandError, ANY_ROLE, FRONT_DESK, REPORT_READERS};

pub fn register_patient(
    state: &CoreState,
    session: &Session,
    patient: &NewPatient,
) -> Result<i64, CommandError> {
    guard(session, FRONT_DESK)?;
    validation::new_patient(patient, state.today())?;

    let conn = state.open_db()?;
    let id = repository::insert_patient(&conn, patient)?;
    tracing::info!(patient_id = id, "Patient registered");
    Ok(id)
}

/// Front desk may edit anyone's contact details; a patient only their own.
pub fn update_patient_contact(
    state: &CoreState,
    session: &Session,
    patient_id: i64,
    phone: Option<&str>,
    email: Option<&str>,
    address: Option<&str>,
) -> Result<(), CommandError> {
    if session.patient_id != Some(patient_id) {
        guard(session, FRONT_DESK)?;
    }
    validation::optional_email(email)?;
    validation::free_text("address", address)?;

    let conn = state.open_db()?;
    repository::update_patient_contact(&conn, patient_id, phone, email, address)?;
    Ok(())
}

pub fn get_patient(state: &CoreState, session: &Session, patient_id: i64) -> Result<Patient, CommandError> {
    if session.patient_id != Some(patient_id) {
        guard(session, REPORT_READERS)?;
    }
    let conn = state.open_db()?;
    repository::get_patient(&conn, patient_id)?
        .ok_or_else(|| DatabaseError::not_found("Patient", patient_id).into())
}

/// Patients whose last, first or middle name contains `fragment`.
pub fn search_patients(state: &CoreState, session: &Session, fragment: &str) -> Result<Vec<Patient>, CommandError> {
    guard(session, REPORT_READERS)?;
    let conn = state.open_db()?;
    Ok(repository::search_patients(&conn, fragment.trim())?)
}

pub fn list_doctors(state: &CoreState, session: &Session) -> Result<Vec<StaffTitle>, CommandError> {
    guard(session, ANY_ROLE)?;
    let conn = state.open_db()?;
    Ok(repository::list_doctors(&conn)?)
}
