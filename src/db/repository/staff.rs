use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const STAFF_COLUMNS: &str = "id, last_name, first_name, patronymic, birth_date, phone, email,
     hire_date, cabinet_number, position_id, specialization_id";

pub fn insert_staff(conn: &Connection, staff: &NewStaffMember) -> Result<i64, DatabaseError> {
    let hire_date = staff.hire_date.unwrap_or_else(|| Local::now().date_naive());
    conn.execute(
        "INSERT INTO employees (last_name, first_name, patronymic, birth_date, phone, email,
                                hire_date, cabinet_number, position_id, specialization_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            staff.last_name,
            staff.first_name,
            staff.patronymic,
            staff.birth_date,
            staff.phone,
            staff.email,
            hire_date,
            staff.cabinet_number,
            staff.position_id,
            staff.specialization_id,
        ],
    )
    .map_err(|e| {
        let err = DatabaseError::from(e);
        if err.is_constraint_violation() {
            DatabaseError::ConstraintViolation(format!(
                "unknown position {} or specialization {:?}",
                staff.position_id, staff.specialization_id
            ))
        } else {
            err
        }
    })?;
    Ok(conn.last_insert_rowid())
}

pub fn get_staff(conn: &Connection, id: i64) -> Result<Option<StaffMember>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {STAFF_COLUMNS} FROM employees WHERE id = ?1"),
        params![id],
        staff_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn staff_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM employees WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub fn list_staff(conn: &Connection) -> Result<Vec<StaffMember>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STAFF_COLUMNS} FROM employees ORDER BY last_name, first_name, id"
    ))?;
    let rows = stmt.query_map([], staff_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Staff members who practise a specialization.
pub fn list_doctors(conn: &Connection) -> Result<Vec<StaffTitle>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.last_name, e.first_name, e.patronymic, p.name, s.name
         FROM employees e
         JOIN positions p ON p.id = e.position_id
         JOIN specializations s ON s.id = e.specialization_id
         ORDER BY e.last_name, e.first_name, e.id",
    )?;
    let rows = stmt.query_map([], title_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn count_doctors(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM employees WHERE specialization_id IS NOT NULL",
        [],
        |row| row.get(0),
    )?)
}

pub fn get_staff_title(conn: &Connection, id: i64) -> Result<Option<StaffTitle>, DatabaseError> {
    conn.query_row(
        "SELECT e.id, e.last_name, e.first_name, e.patronymic, p.name, s.name
         FROM employees e
         JOIN positions p ON p.id = e.position_id
         LEFT JOIN specializations s ON s.id = e.specialization_id
         WHERE e.id = ?1",
        params![id],
        title_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

fn title_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StaffTitle> {
    let last: String = row.get(1)?;
    let first: String = row.get(2)?;
    let patronymic: Option<String> = row.get(3)?;
    Ok(StaffTitle {
        staff_id: row.get(0)?,
        full_name: join_full_name(&last, &first, patronymic.as_deref()),
        position: row.get(4)?,
        specialization: row.get(5)?,
    })
}

fn staff_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StaffMember> {
    Ok(StaffMember {
        id: row.get(0)?,
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        patronymic: row.get(3)?,
        birth_date: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        hire_date: row.get(7)?,
        cabinet_number: row.get(8)?,
        position_id: row.get(9)?,
        specialization_id: row.get(10)?,
    })
}
