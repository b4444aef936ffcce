use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

fn map_insert_error(e: rusqlite::Error, what: &str, key: &str) -> DatabaseError {
    let err = DatabaseError::from(e);
    if err.is_constraint_violation() {
        DatabaseError::ConstraintViolation(format!("{what} '{key}' already exists"))
    } else {
        err
    }
}

// ── Positions ───────────────────────────────────────────────

pub fn insert_position(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    min_salary: Option<f64>,
    max_salary: Option<f64>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO positions (name, description, min_salary, max_salary) VALUES (?1, ?2, ?3, ?4)",
        params![name, description, min_salary, max_salary],
    )
    .map_err(|e| map_insert_error(e, "Position", name))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_position(conn: &Connection, id: i64) -> Result<Option<Position>, DatabaseError> {
    conn.query_row(
        "SELECT id, name, description, min_salary, max_salary FROM positions WHERE id = ?1",
        params![id],
        position_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_positions(conn: &Connection) -> Result<Vec<Position>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, min_salary, max_salary FROM positions ORDER BY id",
    )?;
    let rows = stmt.query_map([], position_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

fn position_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Position> {
    Ok(Position {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        min_salary: row.get(3)?,
        max_salary: row.get(4)?,
    })
}

// ── Specializations ─────────────────────────────────────────

pub fn insert_specialization(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    category: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO specializations (name, description, category) VALUES (?1, ?2, ?3)",
        params![name, description, category],
    )
    .map_err(|e| map_insert_error(e, "Specialization", name))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_specialization(conn: &Connection, id: i64) -> Result<Option<Specialization>, DatabaseError> {
    conn.query_row(
        "SELECT id, name, description, category FROM specializations WHERE id = ?1",
        params![id],
        specialization_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_specializations(conn: &Connection) -> Result<Vec<Specialization>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, category FROM specializations ORDER BY name",
    )?;
    let rows = stmt.query_map([], specialization_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

fn specialization_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Specialization> {
    Ok(Specialization {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
    })
}

// ── Diagnoses ───────────────────────────────────────────────

pub fn insert_diagnosis(
    conn: &Connection,
    code: &str,
    name: &str,
    description: Option<&str>,
    category: Option<&str>,
    is_chronic: bool,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO diagnoses (code, name, description, category, is_chronic)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![code, name, description, category, is_chronic],
    )
    .map_err(|e| map_insert_error(e, "Diagnosis", code))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_diagnosis(conn: &Connection, id: i64) -> Result<Option<Diagnosis>, DatabaseError> {
    conn.query_row(
        "SELECT id, code, name, description, category, is_chronic FROM diagnoses WHERE id = ?1",
        params![id],
        diagnosis_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn get_diagnosis_by_code(conn: &Connection, code: &str) -> Result<Option<Diagnosis>, DatabaseError> {
    conn.query_row(
        "SELECT id, code, name, description, category, is_chronic FROM diagnoses WHERE code = ?1",
        params![code],
        diagnosis_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_diagnoses(conn: &Connection) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, code, name, description, category, is_chronic FROM diagnoses ORDER BY code",
    )?;
    let rows = stmt.query_map([], diagnosis_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

fn diagnosis_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Diagnosis> {
    Ok(Diagnosis {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        is_chronic: row.get(5)?,
    })
}

// ── Services ────────────────────────────────────────────────

pub fn insert_service(
    conn: &Connection,
    code: &str,
    name: &str,
    description: Option<&str>,
    price: f64,
    duration_minutes: u32,
    category: Option<&str>,
) -> Result<i64, DatabaseError> {
    if price < 0.0 {
        return Err(DatabaseError::InvalidValue {
            field: "price".into(),
            value: price.to_string(),
        });
    }
    conn.execute(
        "INSERT INTO services (code, name, description, price, duration_minutes, category)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![code, name, description, price, duration_minutes, category],
    )
    .map_err(|e| map_insert_error(e, "Service", code))?;
    Ok(conn.last_insert_rowid())
}

pub fn set_service_available(conn: &Connection, id: i64, available: bool) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE services SET is_available = ?1 WHERE id = ?2",
        params![available, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Service", id));
    }
    Ok(())
}

/// Lists services ordered by category then name; `only_available` hides withdrawn ones.
pub fn list_services(conn: &Connection, only_available: bool) -> Result<Vec<Service>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, code, name, description, price, duration_minutes, category, is_available
         FROM services
         WHERE (?1 = 0 OR is_available = 1)
         ORDER BY category, name",
    )?;
    let rows = stmt.query_map(params![only_available], |row| {
        Ok(Service {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            price: row.get(4)?,
            duration_minutes: row.get(5)?,
            category: row.get(6)?,
            is_available: row.get(7)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
