use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, last_name, first_name, patronymic, birth_date, gender, phone,
     address, passport_series, passport_number, email, registration_date";

pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<i64, DatabaseError> {
    let birth_date = patient.birth_date.ok_or_else(|| DatabaseError::InvalidValue {
        field: "birth_date".into(),
        value: "missing".into(),
    })?;
    let registration_date = patient
        .registration_date
        .unwrap_or_else(|| Local::now().date_naive());

    conn.execute(
        "INSERT INTO patients (last_name, first_name, patronymic, birth_date, gender, phone,
                               address, passport_series, passport_number, email, registration_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            patient.last_name,
            patient.first_name,
            patient.patronymic,
            birth_date,
            patient.gender,
            patient.phone,
            patient.address,
            patient.passport_series,
            patient.passport_number,
            patient.email,
            registration_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
        params![id],
        patient_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn patient_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM patients WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// All patients ordered by last name, then first name.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY last_name, first_name, id"
    ))?;
    let rows = stmt.query_map([], patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Case-insensitive substring match on any name part.
pub fn search_patients(conn: &Connection, fragment: &str) -> Result<Vec<Patient>, DatabaseError> {
    let pattern = format!("%{}%", fragment.trim());
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE last_name LIKE ?1 OR first_name LIKE ?1 OR IFNULL(patronymic, '') LIKE ?1
         ORDER BY last_name, first_name, id"
    ))?;
    let rows = stmt.query_map(params![pattern], patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_patient_contact(
    conn: &Connection,
    id: i64,
    phone: Option<&str>,
    email: Option<&str>,
    address: Option<&str>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET phone = ?1, email = ?2, address = ?3 WHERE id = ?4",
        params![phone, email, address, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
}

fn patient_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        patronymic: row.get(3)?,
        birth_date: row.get(4)?,
        gender: row.get(5)?,
        phone: row.get(6)?,
        address: row.get(7)?,
        passport_series: row.get(8)?,
        passport_number: row.get(9)?,
        email: row.get(10)?,
        registration_date: row.get(11)?,
    })
}
