//! Availability ledger: bookable time capacity per staff member per day.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;

use super::SchedulingError;
use crate::db::{self, repository};
use crate::models::*;
use crate::validation::{self, ValidationError};

/// Capacity minus live SCHEDULED bookings. Recomputed on every call.
pub fn remaining_capacity(conn: &Connection, slot_id: i64) -> Result<u32, SchedulingError> {
    let slot = repository::get_slot(conn, slot_id)?
        .ok_or_else(|| SchedulingError::not_found("Slot", slot_id))?;
    let scheduled = repository::count_scheduled_on_slot(conn, slot_id)?;
    Ok(slot.capacity.saturating_sub(scheduled))
}

/// The open slot of `staff_id` on `date` whose `[start, end)` window holds `time`.
///
/// Earliest start wins, then lowest id. Fails with `NotFound` when no slot
/// matches or every match is full; callers treat that as an ordinary outcome.
pub fn find_slot(
    conn: &Connection,
    staff_id: i64,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<SlotAvailability, SchedulingError> {
    repository::find_open_slot(conn, staff_id, date, time)?.ok_or_else(|| {
        SchedulingError::NotFound {
            entity: "Open slot",
            key: format!("staff {staff_id} on {date} at {}", time.format("%H:%M")),
        }
    })
}

pub fn create_slot(conn: &Connection, slot: &NewSlot) -> Result<i64, SchedulingError> {
    check_window(slot.start_time, slot.end_time)?;
    check_capacity(slot.capacity)?;
    validation::free_text("notes", slot.notes.as_deref())?;
    if !repository::staff_exists(conn, slot.staff_id)? {
        return Err(SchedulingError::not_found("Staff", slot.staff_id));
    }

    let id = repository::insert_slot(conn, slot)?;
    tracing::info!(
        slot_id = id,
        staff_id = slot.staff_id,
        date = %slot.work_date,
        capacity = slot.capacity,
        "Slot created"
    );
    Ok(id)
}

/// Changes a slot's capacity. Refuses to drop below the live SCHEDULED count,
/// which would leave remaining capacity negative.
pub fn update_slot_capacity(
    conn: &Connection,
    slot_id: i64,
    capacity: u32,
) -> Result<(), SchedulingError> {
    check_capacity(capacity)?;

    let tx = db::begin_immediate(conn)?;
    if repository::get_slot(&tx, slot_id)?.is_none() {
        return Err(SchedulingError::not_found("Slot", slot_id));
    }
    let scheduled = repository::count_scheduled_on_slot(&tx, slot_id)?;
    if capacity < scheduled {
        return Err(SchedulingError::Conflict(format!(
            "slot {slot_id} already holds {scheduled} scheduled bookings"
        )));
    }
    repository::update_slot_capacity(&tx, slot_id, capacity)?;
    tx.commit()?;

    tracing::info!(slot_id, capacity, "Slot capacity updated");
    Ok(())
}

/// Moves a slot's window. Existing bookings keep the time they were booked at.
pub fn update_slot_window(
    conn: &Connection,
    slot_id: i64,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<(), SchedulingError> {
    check_window(start_time, end_time)?;
    repository::update_slot_window(conn, slot_id, start_time, end_time).map_err(|e| match e {
        db::DatabaseError::NotFound { .. } => SchedulingError::not_found("Slot", slot_id),
        other => other.into(),
    })?;
    tracing::info!(slot_id, start = %start_time, end = %end_time, "Slot window updated");
    Ok(())
}

/// Slots with live remaining capacity, ordered by date, start, id.
pub fn list_open_slots(
    conn: &Connection,
    filter: &SlotFilter,
) -> Result<Vec<SlotAvailability>, SchedulingError> {
    Ok(repository::list_slot_availability(conn, filter)?)
}

fn check_window(start: NaiveTime, end: NaiveTime) -> Result<(), ValidationError> {
    if start < end {
        Ok(())
    } else {
        Err(ValidationError::new(
            "end_time",
            format!("{} is not after {}", end.format("%H:%M"), start.format("%H:%M")),
        ))
    }
}

fn check_capacity(capacity: u32) -> Result<(), ValidationError> {
    if capacity >= 1 {
        Ok(())
    } else {
        Err(ValidationError::new("capacity", "must be at least 1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::scheduling::scheduler;

    #[test]
    fn remaining_capacity_counts_only_scheduled() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        let slot = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 3);

        let a = scheduler::create_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 0))).unwrap();
        scheduler::create_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 10))).unwrap();
        assert_eq!(remaining_capacity(&conn, slot).unwrap(), 1);

        scheduler::complete_booking(&conn, a).unwrap();
        assert_eq!(remaining_capacity(&conn, slot).unwrap(), 2);
    }

    #[test]
    fn remaining_capacity_of_unknown_slot() {
        let conn = test_db();
        let err = remaining_capacity(&conn, 99).unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound { entity: "Slot", .. }));
    }

    #[test]
    fn find_slot_skips_full_slots() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        let first = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 1);
        let second = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (11, 0), 1);

        assert_eq!(find_slot(&conn, staff, date(2024, 3, 1), time(9, 30)).unwrap().slot.id, first);
        scheduler::create_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 30))).unwrap();
        assert_eq!(find_slot(&conn, staff, date(2024, 3, 1), time(9, 30)).unwrap().slot.id, second);
        scheduler::create_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 30))).unwrap();

        let err = find_slot(&conn, staff, date(2024, 3, 1), time(9, 30)).unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound { entity: "Open slot", .. }));
    }

    #[test]
    fn create_slot_validates_window_and_capacity() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let mut slot = NewSlot {
            staff_id: staff,
            work_date: date(2024, 3, 1),
            start_time: time(10, 0),
            end_time: time(10, 0),
            room: None,
            capacity: 1,
            notes: None,
        };
        assert!(matches!(create_slot(&conn, &slot), Err(SchedulingError::Validation(_))));

        slot.end_time = time(11, 0);
        slot.capacity = 0;
        assert!(matches!(create_slot(&conn, &slot), Err(SchedulingError::Validation(_))));

        slot.capacity = 2;
        slot.staff_id = staff + 50;
        assert!(matches!(create_slot(&conn, &slot), Err(SchedulingError::NotFound { entity: "Staff", .. })));

        slot.staff_id = staff;
        assert!(create_slot(&conn, &slot).is_ok());
    }

    #[test]
    fn capacity_cannot_drop_below_scheduled_count() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        let slot = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 3);
        scheduler::create_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 0))).unwrap();
        scheduler::create_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 0))).unwrap();

        let err = update_slot_capacity(&conn, slot, 1).unwrap_err();
        assert!(matches!(err, SchedulingError::Conflict(_)));
        assert_eq!(remaining_capacity(&conn, slot).unwrap(), 1);

        update_slot_capacity(&conn, slot, 2).unwrap();
        assert_eq!(remaining_capacity(&conn, slot).unwrap(), 0);
    }

    #[test]
    fn window_edit_leaves_booked_time_untouched() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        let slot = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 1);
        let id = scheduler::create_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 15))).unwrap();

        update_slot_window(&conn, slot, time(14, 0), time(15, 0)).unwrap();

        let booking = scheduler::get_booking(&conn, id).unwrap();
        assert_eq!(booking.time, time(9, 15));
        assert_eq!(booking.slot_id, slot);
    }

    #[test]
    fn window_edit_rejects_inverted_window() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let slot = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 1);
        let err = update_slot_window(&conn, slot, time(11, 0), time(10, 0)).unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));
    }

    #[test]
    fn list_open_slots_hides_full_ones() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 1);
        make_slot(&conn, staff, date(2024, 3, 2), (9, 0), (10, 0), 1);
        scheduler::create_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 0))).unwrap();

        let open = list_open_slots(&conn, &SlotFilter { only_open: true, ..Default::default() }).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].slot.work_date, date(2024, 3, 2));

        let all = list_open_slots(&conn, &SlotFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].remaining, 0);
    }
}
