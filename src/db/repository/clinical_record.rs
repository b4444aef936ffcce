use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const RECORD_COLUMNS: &str = "id, appointment_id, patient_id, doctor_id, complaints, diagnosis_id,
     examination_results, recommendations, record_date, next_visit_date, is_emergency";

const PRESCRIPTION_COLUMNS: &str = "id, medical_record_id, medication_name, dosage, frequency,
     duration, instructions, start_date, end_date, is_completed";

/// Inserts a record for `booking`, duplicating its patient and doctor references.
pub(crate) fn insert_record(
    conn: &Connection,
    booking: &Booking,
    record: &NewClinicalRecord,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO medical_records (appointment_id, patient_id, doctor_id, complaints, diagnosis_id,
                                      examination_results, recommendations, record_date,
                                      next_visit_date, is_emergency)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.patient_id,
            booking.staff_id,
            record.complaints,
            record.diagnosis_id,
            record.examination_results,
            record.recommendations,
            now,
            record.next_visit_date,
            record.is_emergency,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_record(conn: &Connection, id: i64) -> Result<Option<ClinicalRecord>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = ?1"),
        params![id],
        record_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn get_record_for_booking(
    conn: &Connection,
    booking_id: i64,
) -> Result<Option<ClinicalRecord>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE appointment_id = ?1"),
        params![booking_id],
        record_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Records for a patient, newest first.
pub fn list_records_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<ClinicalRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM medical_records
         WHERE patient_id = ?1 ORDER BY record_date DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id], record_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn count_records(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM medical_records", [], |row| row.get(0))?)
}

pub(crate) fn insert_prescription(
    conn: &Connection,
    record_id: i64,
    rx: &NewPrescription,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (medical_record_id, medication_name, dosage, frequency, duration,
                                    instructions, start_date, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record_id,
            rx.medication_name.trim(),
            rx.dosage,
            rx.frequency,
            rx.duration,
            rx.instructions,
            rx.start_date,
            rx.end_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_prescription(conn: &Connection, id: i64) -> Result<Option<Prescription>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"),
        params![id],
        prescription_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_prescriptions(conn: &Connection, record_id: i64) -> Result<Vec<Prescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE medical_record_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![record_id], prescription_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub(crate) fn mark_prescription_completed(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE prescriptions SET is_completed = 1 WHERE id = ?1",
        params![id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Prescription", id));
    }
    Ok(())
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClinicalRecord> {
    Ok(ClinicalRecord {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        patient_id: row.get(2)?,
        staff_id: row.get(3)?,
        complaints: row.get(4)?,
        diagnosis_id: row.get(5)?,
        examination_results: row.get(6)?,
        recommendations: row.get(7)?,
        record_date: row.get(8)?,
        next_visit_date: row.get(9)?,
        is_emergency: row.get(10)?,
    })
}

fn prescription_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        record_id: row.get(1)?,
        medication_name: row.get(2)?,
        dosage: row.get(3)?,
        frequency: row.get(4)?,
        duration: row.get(5)?,
        instructions: row.get(6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        is_completed: row.get(9)?,
    })
}
