//! Repository layer: table-scoped database operations.
//!
//! One sub-module per aggregate. Writes that must go through a guarded
//! workflow (bookings, clinical records, accounts) are `pub(crate)` so only
//! the scheduler, the record store and the access gate can reach them.

mod booking;
mod catalog;
mod clinical_record;
mod patient;
mod slot;
mod staff;
mod user;

#[cfg(test)]
pub(crate) mod fixtures;

pub use booking::*;
pub use catalog::*;
pub use clinical_record::*;
pub use patient::*;
pub use slot::*;
pub use staff::*;
pub use user::*;

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::fixtures::*;
    use super::*;
    use crate::db::DatabaseError;
    use crate::models::*;

    #[test]
    fn position_names_are_unique() {
        let conn = test_db();
        insert_position(&conn, "Nurse", None, None, None).unwrap();
        let err = insert_position(&conn, "Nurse", None, None, None).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn diagnosis_lookup_by_code() {
        let conn = test_db();
        let id = insert_diagnosis(&conn, "J06.9", "Acute URI", None, Some("Respiratory"), false).unwrap();
        let found = get_diagnosis_by_code(&conn, "J06.9").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(!found.is_chronic);
        assert!(get_diagnosis_by_code(&conn, "Z00").unwrap().is_none());
    }

    #[test]
    fn services_filter_unavailable() {
        let conn = test_db();
        let a = insert_service(&conn, "S1", "Consultation", None, 1500.0, 30, Some("General")).unwrap();
        insert_service(&conn, "S2", "ECG", None, 800.0, 15, Some("Diagnostics")).unwrap();
        set_service_available(&conn, a, false).unwrap();

        assert_eq!(list_services(&conn, false).unwrap().len(), 2);
        let available = list_services(&conn, true).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].code, "S2");
    }

    #[test]
    fn negative_service_price_rejected() {
        let conn = test_db();
        let err = insert_service(&conn, "S9", "Refund", None, -1.0, 30, None).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidValue { .. }));
    }

    #[test]
    fn patient_insert_and_retrieve() {
        let conn = test_db();
        let id = make_patient(&conn, "Smith", "Anna", date(1990, 6, 15));
        let patient = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(patient.full_name(), "Smith Anna");
        assert_eq!(patient.age(date(2024, 6, 14)), 33);
        assert!(patient_exists(&conn, id).unwrap());
        assert!(!patient_exists(&conn, id + 100).unwrap());
    }

    #[test]
    fn patient_without_birth_date_rejected() {
        let conn = test_db();
        let err = insert_patient(&conn, &NewPatient {
            last_name: "Doe".into(),
            first_name: "John".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidValue { .. }));
    }

    #[test]
    fn patient_search_matches_fragments() {
        let conn = test_db();
        make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        make_patient(&conn, "Brown", "Tom", date(1985, 1, 1));
        let found = search_patients(&conn, "mit").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].last_name, "Smith");
    }

    #[test]
    fn update_contact_of_missing_patient_fails() {
        let conn = test_db();
        let err = update_patient_contact(&conn, 42, Some("+1"), None, None).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn staff_requires_existing_position() {
        let conn = test_db();
        let err = insert_staff(&conn, &NewStaffMember {
            last_name: "Ghost".into(),
            first_name: "Casper".into(),
            position_id: 999,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn staff_title_includes_position_and_specialization() {
        let conn = test_db();
        let staff_id = make_doctor(&conn);
        let title = get_staff_title(&conn, staff_id).unwrap().unwrap();
        assert_eq!(title.full_title(), "Physician Therapy House Gregory");
        assert_eq!(list_doctors(&conn).unwrap().len(), 1);
        assert_eq!(count_doctors(&conn).unwrap(), 1);
    }

    #[test]
    fn find_open_slot_respects_half_open_window() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 1);

        assert!(find_open_slot(&conn, staff, date(2024, 3, 1), time(9, 0)).unwrap().is_some());
        assert!(find_open_slot(&conn, staff, date(2024, 3, 1), time(9, 59)).unwrap().is_some());
        assert!(find_open_slot(&conn, staff, date(2024, 3, 1), time(10, 0)).unwrap().is_none());
        assert!(find_open_slot(&conn, staff, date(2024, 3, 2), time(9, 30)).unwrap().is_none());
    }

    #[test]
    fn find_open_slot_prefers_earliest_start_then_lowest_id() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let late = make_slot(&conn, staff, date(2024, 3, 1), (9, 30), (11, 0), 1);
        let early_b = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (12, 0), 1);
        let early_a = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 1);

        let found = find_open_slot(&conn, staff, date(2024, 3, 1), time(9, 45)).unwrap().unwrap();
        assert_eq!(found.slot.id, early_b.min(early_a));
        assert_ne!(found.slot.id, late);
    }

    #[test]
    fn slot_listing_reports_live_remaining() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        let slot = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 2);
        insert_scheduled_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 15)), slot, now())
            .unwrap();

        let all = list_slot_availability(&conn, &SlotFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].remaining, 1);
        assert_eq!(count_scheduled_on_slot(&conn, slot).unwrap(), 1);
    }

    #[test]
    fn booking_filters_by_staff_and_status() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        let slot = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (12, 0), 5);
        let first = insert_scheduled_booking(
            &conn,
            &request(patient, staff, date(2024, 3, 1), time(11, 0)),
            slot,
            now(),
        )
        .unwrap();
        let second = insert_scheduled_booking(
            &conn,
            &request(patient, staff, date(2024, 3, 1), time(9, 0)),
            slot,
            now(),
        )
        .unwrap();
        assert!(update_booking_status(
            &conn,
            first,
            AppointmentStatus::Scheduled,
            AppointmentStatus::Cancelled,
            now()
        )
        .unwrap());

        let all = list_bookings(&conn, &BookingFilter { staff_id: Some(staff), ..Default::default() }).unwrap();
        assert_eq!(all.iter().map(|b| b.id).collect::<Vec<_>>(), vec![second, first]);

        let scheduled = list_bookings(&conn, &BookingFilter {
            status: Some(AppointmentStatus::Scheduled),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].id, second);

        let by_status = count_bookings_by_status(&conn).unwrap();
        assert!(by_status.contains(&(AppointmentStatus::Cancelled, 1)));
        assert!(by_status.contains(&(AppointmentStatus::Scheduled, 1)));
    }

    #[test]
    fn status_update_is_compare_and_set() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        let slot = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 1);
        let id = insert_scheduled_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 0)), slot, now())
            .unwrap();

        let applied = update_booking_status(
            &conn,
            id,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            now(),
        )
        .unwrap();
        assert!(!applied);
        assert_eq!(get_booking(&conn, id).unwrap().unwrap().status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn booking_time_is_stored_verbatim() {
        let conn = test_db();
        let staff = make_doctor(&conn);
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 1, 1));
        let slot = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 1);
        let id = insert_scheduled_booking(&conn, &request(patient, staff, date(2024, 3, 1), time(9, 15)), slot, now())
            .unwrap();
        let booking = get_booking(&conn, id).unwrap().unwrap();
        assert_eq!(booking.time, NaiveTime::from_hms_opt(9, 15, 0).unwrap());
        assert_eq!(booking.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(booking.reason.as_deref(), Some("checkup"));
    }

    #[test]
    fn duplicate_username_is_constraint_violation() {
        let conn = test_db();
        let user = NewUser {
            username: "frontdesk".into(),
            password: "unused".into(),
            role: UserRole::Registrar,
            email: None,
            staff_id: None,
            patient_id: None,
        };
        insert_user(&conn, &user, "hash").unwrap();
        let err = insert_user(&conn, &user, "hash").unwrap_err();
        assert!(err.is_constraint_violation());
    }
}
