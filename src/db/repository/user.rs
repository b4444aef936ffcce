use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str =
    "id, username, password_hash, role, email, created_at, is_active, employee_id, patient_id";

/// Stores an account with an already-hashed password.
pub(crate) fn insert_user(
    conn: &Connection,
    user: &NewUser,
    password_hash: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, password_hash, role, email, created_at, is_active,
                            employee_id, patient_id)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
        params![
            user.username,
            password_hash,
            user.role,
            user.email,
            chrono::Local::now().naive_local(),
            user.staff_id,
            user.patient_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        params![username],
        user_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
    let rows = stmt.query_map([], user_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub(crate) fn update_password_hash(conn: &Connection, id: i64, hash: &str) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![hash, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("User", id));
    }
    Ok(())
}

pub(crate) fn set_user_active(conn: &Connection, id: i64, active: bool) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET is_active = ?1 WHERE id = ?2",
        params![active, id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("User", id));
    }
    Ok(())
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        email: row.get(4)?,
        created_at: row.get(5)?,
        is_active: row.get(6)?,
        staff_id: row.get(7)?,
        patient_id: row.get(8)?,
    })
}
