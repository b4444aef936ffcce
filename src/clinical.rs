//! Clinical record store: notes and prescriptions attached to completed
//! bookings. One record per booking.

use rusqlite::Connection;
use thiserror::Error;

use crate::db::{self, repository, DatabaseError};
use crate::models::*;
use crate::validation::{self, ValidationError};

#[derive(Error, Debug)]
pub enum ClinicalError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Booking {booking_id} is {status}; records attach to completed bookings only")]
    InvalidTransition {
        booking_id: i64,
        status: AppointmentStatus,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl From<rusqlite::Error> for ClinicalError {
    fn from(e: rusqlite::Error) -> Self {
        ClinicalError::Storage(DatabaseError::Sqlite(e))
    }
}

/// Creates the record of a COMPLETED booking.
pub fn attach_record(
    conn: &Connection,
    booking_id: i64,
    record: &NewClinicalRecord,
) -> Result<i64, ClinicalError> {
    validation::free_text("complaints", record.complaints.as_deref())?;
    validation::free_text("examination_results", record.examination_results.as_deref())?;
    validation::free_text("recommendations", record.recommendations.as_deref())?;

    let tx = db::begin_immediate(conn)?;

    let booking = repository::get_booking(&tx, booking_id)?
        .ok_or(ClinicalError::NotFound { entity: "Booking", id: booking_id })?;
    if booking.status != AppointmentStatus::Completed {
        tracing::warn!(booking_id, status = %booking.status, "Record refused for unfinished booking");
        return Err(ClinicalError::InvalidTransition {
            booking_id,
            status: booking.status,
        });
    }
    if let Some(diagnosis_id) = record.diagnosis_id {
        if repository::get_diagnosis(&tx, diagnosis_id)?.is_none() {
            return Err(ClinicalError::NotFound { entity: "Diagnosis", id: diagnosis_id });
        }
    }
    if let Some(existing) = repository::get_record_for_booking(&tx, booking_id)? {
        return Err(duplicate(booking_id, Some(existing.id)));
    }

    let now = chrono::Local::now().naive_local();
    let id = repository::insert_record(&tx, &booking, record, now).map_err(|e| {
        if e.is_constraint_violation() {
            duplicate(booking_id, None)
        } else {
            e.into()
        }
    })?;
    tx.commit()?;

    tracing::info!(record_id = id, booking_id, emergency = record.is_emergency, "Clinical record attached");
    Ok(id)
}

fn duplicate(booking_id: i64, existing: Option<i64>) -> ClinicalError {
    match existing {
        Some(id) => ClinicalError::Conflict(format!("booking {booking_id} already has record {id}")),
        None => ClinicalError::Conflict(format!("booking {booking_id} already has a record")),
    }
}

pub fn add_prescription(
    conn: &Connection,
    record_id: i64,
    prescription: &NewPrescription,
) -> Result<i64, ClinicalError> {
    validation::new_prescription(prescription)?;
    if repository::get_record(conn, record_id)?.is_none() {
        return Err(ClinicalError::NotFound { entity: "Clinical record", id: record_id });
    }
    let id = repository::insert_prescription(conn, record_id, prescription)?;
    tracing::info!(prescription_id = id, record_id, "Prescription added");
    Ok(id)
}

pub fn complete_prescription(conn: &Connection, prescription_id: i64) -> Result<(), ClinicalError> {
    repository::mark_prescription_completed(conn, prescription_id).map_err(|e| match e {
        DatabaseError::NotFound { .. } => ClinicalError::NotFound {
            entity: "Prescription",
            id: prescription_id,
        },
        other => other.into(),
    })
}

pub fn get_record(conn: &Connection, record_id: i64) -> Result<RecordDetail, ClinicalError> {
    let record = repository::get_record(conn, record_id)?
        .ok_or(ClinicalError::NotFound { entity: "Clinical record", id: record_id })?;
    let prescriptions = repository::list_prescriptions(conn, record_id)?;
    Ok(RecordDetail { record, prescriptions })
}

/// The record of a booking, if one has been written.
pub fn record_for_booking(conn: &Connection, booking_id: i64) -> Result<Option<RecordDetail>, ClinicalError> {
    match repository::get_record_for_booking(conn, booking_id)? {
        Some(record) => {
            let prescriptions = repository::list_prescriptions(conn, record.id)?;
            Ok(Some(RecordDetail { record, prescriptions }))
        }
        None => Ok(None),
    }
}

pub fn records_for_patient(conn: &Connection, patient_id: i64) -> Result<Vec<ClinicalRecord>, ClinicalError> {
    if !repository::patient_exists(conn, patient_id)? {
        return Err(ClinicalError::NotFound { entity: "Patient", id: patient_id });
    }
    Ok(repository::list_records_for_patient(conn, patient_id)?)
}
