//! Booking commands.
//!
//! - `create_booking`, `cancel_booking`: front desk
//! - `complete_booking`, `mark_no_show`: clinicians
//! - `my_bookings`: scoped to the caller
//! - `list_open_slots`: any signed-in role

use crate::auth::Session;
use crate::core_state::CoreState;
use crate::db::repository;
use crate::models::{Booking, BookingRequest, SlotAvailability, SlotFilter, UserRole};
use crate::scheduling;

use super::{guard, CommandError, ANY_ROLE, CLINICIANS, FRONT_DESK};

/// Bookings shown to callers with no patient or staff link.
pub const RECENT_BOOKINGS_LIMIT: u32 = 20;

pub fn create_booking(
    state: &CoreState,
    session: &Session,
    request: &BookingRequest,
) -> Result<i64, CommandError> {
    guard(session, FRONT_DESK)?;
    let conn = state.open_db()?;
    Ok(scheduling::create_booking(&conn, request)?)
}

pub fn cancel_booking(state: &CoreState, session: &Session, booking_id: i64) -> Result<(), CommandError> {
    guard(session, FRONT_DESK)?;
    let conn = state.open_db()?;
    Ok(scheduling::cancel_booking(&conn, booking_id, session.role)?)
}

pub fn complete_booking(state: &CoreState, session: &Session, booking_id: i64) -> Result<(), CommandError> {
    guard(session, CLINICIANS)?;
    let conn = state.open_db()?;
    Ok(scheduling::complete_booking(&conn, booking_id)?)
}

pub fn mark_no_show(state: &CoreState, session: &Session, booking_id: i64) -> Result<(), CommandError> {
    guard(session, CLINICIANS)?;
    let conn = state.open_db()?;
    Ok(scheduling::mark_no_show(&conn, booking_id)?)
}

/// A patient sees their own bookings and a doctor their own schedule.
/// Everyone else gets the most recent bookings.
pub fn my_bookings(state: &CoreState, session: &Session) -> Result<Vec<Booking>, CommandError> {
    let conn = state.open_db()?;
    let bookings = match (session.role, session.patient_id, session.staff_id) {
        (UserRole::Patient, Some(patient_id), _) => scheduling::bookings_for_patient(&conn, patient_id)?,
        (UserRole::Patient, None, _) => Vec::new(),
        (UserRole::Doctor, _, Some(staff_id)) => scheduling::bookings_for_staff(&conn, staff_id, None)?,
        _ => repository::list_recent_bookings(&conn, RECENT_BOOKINGS_LIMIT)?,
    };
    Ok(bookings)
}

pub fn list_open_slots(
    state: &CoreState,
    session: &Session,
    filter: &SlotFilter,
) -> Result<Vec<SlotAvailability>, CommandError> {
    guard(session, ANY_ROLE)?;
    let conn = state.open_db()?;
    Ok(scheduling::list_open_slots(&conn, filter)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::db::repository::fixtures::*;
    use crate::models::AppointmentStatus;
    use crate::scheduling::SchedulingError;
    use crate::models::UserRole::*;

    #[test]
    fn registrar_books_and_cancels() {
        let t = TestClinic::new();
        let desk = t.session(Registrar);

        let id = create_booking(&t.state, &desk, &t.checkup()).unwrap();
        cancel_booking(&t.state, &desk, id).unwrap();

        let conn = t.state.open_db().unwrap();
        let booking = scheduling::get_booking(&conn, id).unwrap();
        assert_eq!(booking.status, AppointmentStatus::Cancelled);
        assert_eq!(scheduling::remaining_capacity(&conn, t.slot).unwrap(), 1);
    }

    #[test]
    fn doctor_and_patient_cannot_book() {
        let t = TestClinic::new();
        for role in [Doctor, Patient] {
            let err = create_booking(&t.state, &t.session(role), &t.checkup()).unwrap_err();
            assert!(matches!(err, CommandError::Forbidden { .. }), "{role}");
        }
        let conn = t.state.open_db().unwrap();
        assert_eq!(repository::count_bookings(&conn).unwrap(), 0);
    }

    #[test]
    fn registrar_cannot_complete() {
        let t = TestClinic::new();
        let id = create_booking(&t.state, &t.session(Registrar), &t.checkup()).unwrap();

        let err = complete_booking(&t.state, &t.session(Registrar), id).unwrap_err();
        assert!(matches!(err, CommandError::Forbidden { role: Registrar, .. }));

        complete_booking(&t.state, &t.session(Doctor), id).unwrap();
    }

    #[test]
    fn scheduling_errors_pass_through() {
        let t = TestClinic::new();
        let desk = t.session(Admin);
        create_booking(&t.state, &desk, &t.checkup()).unwrap();

        let err = create_booking(&t.state, &desk, &t.checkup()).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Scheduling(SchedulingError::NoAvailability { .. })
        ));
    }

    #[test]
    fn no_show_by_doctor() {
        let t = TestClinic::new();
        let id = create_booking(&t.state, &t.session(Registrar), &t.checkup()).unwrap();
        mark_no_show(&t.state, &t.session(Doctor), id).unwrap();

        let err = cancel_booking(&t.state, &t.session(Registrar), id).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Scheduling(SchedulingError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn my_bookings_is_scoped_by_role() {
        let t = TestClinic::new();
        let conn = t.state.open_db().unwrap();
        let other = make_patient(&conn, "Jones", "Bob", date(1980, 1, 1));
        make_slot(&conn, t.staff, date(2024, 3, 1), (10, 0), (11, 0), 1);

        let desk = t.session(Registrar);
        let mine = create_booking(&t.state, &desk, &t.checkup()).unwrap();
        let theirs = create_booking(
            &t.state,
            &desk,
            &request(other, t.staff, date(2024, 3, 1), time(10, 30)),
        )
        .unwrap();

        let ids = |role| -> Vec<i64> {
            my_bookings(&t.state, &t.session(role)).unwrap().iter().map(|b| b.id).collect()
        };
        assert_eq!(ids(Patient), vec![mine]);
        assert_eq!(ids(Doctor), vec![mine, theirs]);
        assert_eq!(ids(Registrar).len(), 2);
    }

    #[test]
    fn patient_sees_open_slots() {
        let t = TestClinic::new();
        let slots = list_open_slots(&t.state, &t.session(Patient), &SlotFilter::default()).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].remaining, 1);
    }
}
