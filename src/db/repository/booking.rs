use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const BOOKING_COLUMNS: &str = "id, patient_id, doctor_id, schedule_id, appointment_date,
     appointment_time, status, reason, created_at, updated_at";

/// Inserts a SCHEDULED booking. Only the scheduler calls this, inside its
/// capacity-checking transaction.
pub(crate) fn insert_scheduled_booking(
    conn: &Connection,
    request: &BookingRequest,
    slot_id: i64,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (patient_id, doctor_id, schedule_id, appointment_date,
                                   appointment_time, status, reason, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            request.patient_id,
            request.staff_id,
            slot_id,
            request.date,
            request.time,
            AppointmentStatus::Scheduled,
            request.reason,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Compare-and-set status update. Returns false when the stored status was
/// not `from` (a concurrent writer got there first).
pub(crate) fn update_booking_status(
    conn: &Connection,
    booking_id: i64,
    from: AppointmentStatus,
    to: AppointmentStatus,
    now: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to, now, booking_id, from],
    )?;
    Ok(updated == 1)
}

pub fn get_booking(conn: &Connection, id: i64) -> Result<Option<Booking>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM appointments WHERE id = ?1"),
        params![id],
        booking_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Bookings matching the filter, ordered by date, time, id.
pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> Result<Vec<Booking>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM appointments
         WHERE (?1 IS NULL OR appointment_date >= ?1)
           AND (?2 IS NULL OR appointment_date <= ?2)
           AND (?3 IS NULL OR doctor_id = ?3)
           AND (?4 IS NULL OR patient_id = ?4)
           AND (?5 IS NULL OR status = ?5)
         ORDER BY appointment_date, appointment_time, id
         LIMIT ?6"
    ))?;
    let limit = filter.limit.map_or(-1, i64::from);
    let rows = stmt.query_map(
        params![filter.from, filter.to, filter.staff_id, filter.patient_id, filter.status, limit],
        booking_from_row,
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Most recently created bookings first.
pub fn list_recent_bookings(conn: &Connection, limit: u32) -> Result<Vec<Booking>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM appointments ORDER BY created_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], booking_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn count_bookings(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?)
}

/// Booking counts per status; statuses with no bookings are omitted.
pub fn count_bookings_by_status(
    conn: &Connection,
) -> Result<Vec<(AppointmentStatus, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM appointments GROUP BY status ORDER BY status",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

fn booking_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        staff_id: row.get(2)?,
        slot_id: row.get(3)?,
        date: row.get(4)?,
        time: row.get(5)?,
        status: row.get(6)?,
        reason: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
