use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

/// Slots joined with their live remaining capacity. Never cached: every read
/// recounts SCHEDULED bookings.
const SLOT_AVAILABILITY_CTE: &str = "WITH live AS (
        SELECT s.id, s.employee_id, s.work_date, s.start_time, s.end_time, s.cabinet_number,
               s.max_patients, s.notes, s.created_at,
               s.max_patients - (
                   SELECT COUNT(*) FROM appointments a
                   WHERE a.schedule_id = s.id AND a.status = 'scheduled'
               ) AS remaining
        FROM schedules s
    )";

pub fn insert_slot(conn: &Connection, slot: &NewSlot) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO schedules (employee_id, work_date, start_time, end_time, cabinet_number,
                                max_patients, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            slot.staff_id,
            slot.work_date,
            slot.start_time,
            slot.end_time,
            slot.room,
            slot.capacity,
            slot.notes,
            chrono::Local::now().naive_local(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_slot(conn: &Connection, id: i64) -> Result<Option<AvailabilitySlot>, DatabaseError> {
    conn.query_row(
        "SELECT id, employee_id, work_date, start_time, end_time, cabinet_number,
                max_patients, notes, created_at
         FROM schedules WHERE id = ?1",
        params![id],
        slot_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Number of SCHEDULED bookings currently holding capacity on the slot.
pub fn count_scheduled_on_slot(conn: &Connection, slot_id: i64) -> Result<u32, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE schedule_id = ?1 AND status = 'scheduled'",
        params![slot_id],
        |row| row.get(0),
    )?)
}

/// First slot of `staff_id` on `date` whose `[start, end)` window holds `time`
/// and has remaining capacity. Ties break on earliest start, then lowest id.
pub fn find_open_slot(
    conn: &Connection,
    staff_id: i64,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<Option<SlotAvailability>, DatabaseError> {
    conn.query_row(
        &format!(
            "{SLOT_AVAILABILITY_CTE}
             SELECT id, employee_id, work_date, start_time, end_time, cabinet_number,
                    max_patients, notes, created_at, remaining
             FROM live
             WHERE employee_id = ?1 AND work_date = ?2
               AND start_time <= ?3 AND end_time > ?3
               AND remaining > 0
             ORDER BY start_time, id
             LIMIT 1"
        ),
        params![staff_id, date, time],
        availability_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Slots matching the filter with live remaining capacity, ordered by date, start, id.
pub fn list_slot_availability(
    conn: &Connection,
    filter: &SlotFilter,
) -> Result<Vec<SlotAvailability>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SLOT_AVAILABILITY_CTE}
         SELECT id, employee_id, work_date, start_time, end_time, cabinet_number,
                max_patients, notes, created_at, remaining
         FROM live
         WHERE (?1 IS NULL OR employee_id = ?1)
           AND (?2 IS NULL OR work_date >= ?2)
           AND (?3 IS NULL OR work_date <= ?3)
           AND (?4 = 0 OR remaining > 0)
         ORDER BY work_date, start_time, id"
    ))?;
    let rows = stmt.query_map(
        params![filter.staff_id, filter.from, filter.to, filter.only_open],
        availability_from_row,
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_slot_capacity(conn: &Connection, slot_id: i64, capacity: u32) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE schedules SET max_patients = ?1 WHERE id = ?2",
        params![capacity, slot_id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Slot", slot_id));
    }
    Ok(())
}

pub fn update_slot_window(
    conn: &Connection,
    slot_id: i64,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE schedules SET start_time = ?1, end_time = ?2 WHERE id = ?3",
        params![start_time, end_time, slot_id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Slot", slot_id));
    }
    Ok(())
}

fn slot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AvailabilitySlot> {
    Ok(AvailabilitySlot {
        id: row.get(0)?,
        staff_id: row.get(1)?,
        work_date: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        room: row.get(5)?,
        capacity: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn availability_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SlotAvailability> {
    let remaining: i64 = row.get(9)?;
    Ok(SlotAvailability {
        slot: slot_from_row(row)?,
        remaining: remaining.max(0) as u32,
    })
}
