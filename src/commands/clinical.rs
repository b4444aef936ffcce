//! Clinical record commands. Clinicians write; a patient may read their own.

use crate::auth::{self, Session};
use crate::clinical::{self, ClinicalError};
use crate::core_state::CoreState;
use crate::models::{ClinicalRecord, NewClinicalRecord, NewPrescription, RecordDetail};

use super::{forbidden, guard, CommandError, CLINICIANS};

pub fn attach_record(
    state: &CoreState,
    session: &Session,
    booking_id: i64,
    record: &NewClinicalRecord,
) -> Result<i64, CommandError> {
    guard(session, CLINICIANS)?;
    let conn = state.open_db()?;
    Ok(clinical::attach_record(&conn, booking_id, record)?)
}

pub fn add_prescription(
    state: &CoreState,
    session: &Session,
    record_id: i64,
    prescription: &NewPrescription,
) -> Result<i64, CommandError> {
    guard(session, CLINICIANS)?;
    let conn = state.open_db()?;
    Ok(clinical::add_prescription(&conn, record_id, prescription)?)
}

pub fn complete_prescription(
    state: &CoreState,
    session: &Session,
    prescription_id: i64,
) -> Result<(), CommandError> {
    guard(session, CLINICIANS)?;
    let conn = state.open_db()?;
    Ok(clinical::complete_prescription(&conn, prescription_id)?)
}

/// Clinicians read any record. A patient reads their own, and gets the same
/// `Forbidden` for a missing record as for someone else's.
pub fn get_record(state: &CoreState, session: &Session, record_id: i64) -> Result<RecordDetail, CommandError> {
    let clinician = auth::authorize(session.role, CLINICIANS);
    if !clinician && session.patient_id.is_none() {
        return Err(forbidden(session, CLINICIANS));
    }
    let conn = state.open_db()?;
    let result = clinical::get_record(&conn, record_id);
    if clinician {
        return Ok(result?);
    }
    match result {
        Ok(detail) if session.patient_id == Some(detail.record.patient_id) => Ok(detail),
        Ok(_) | Err(ClinicalError::NotFound { .. }) => Err(forbidden(session, CLINICIANS)),
        Err(e) => Err(e.into()),
    }
}

pub fn records_for_patient(
    state: &CoreState,
    session: &Session,
    patient_id: i64,
) -> Result<Vec<ClinicalRecord>, CommandError> {
    guard_reader(session, patient_id)?;
    let conn = state.open_db()?;
    Ok(clinical::records_for_patient(&conn, patient_id)?)
}

/// The caller's own records. Only meaningful for patient accounts.
pub fn my_records(state: &CoreState, session: &Session) -> Result<Vec<ClinicalRecord>, CommandError> {
    match session.patient_id {
        Some(patient_id) => records_for_patient(state, session, patient_id),
        None => Ok(Vec::new()),
    }
}

fn guard_reader(session: &Session, patient_id: i64) -> Result<(), CommandError> {
    if session.patient_id == Some(patient_id) {
        return Ok(());
    }
    guard(session, CLINICIANS)
}
