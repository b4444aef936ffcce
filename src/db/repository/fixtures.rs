//! Shared test fixtures for store-backed tests.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use super::*;
use crate::db::sqlite::open_memory_database;
use crate::models::*;

pub fn test_db() -> Connection {
    open_memory_database().unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn make_patient(conn: &Connection, last: &str, first: &str, birth: NaiveDate) -> i64 {
    insert_patient(conn, &NewPatient {
        last_name: last.into(),
        first_name: first.into(),
        birth_date: Some(birth),
        registration_date: Some(date(2024, 1, 10)),
        ..Default::default()
    })
    .unwrap()
}

/// Inserts a "Physician / Therapy" doctor named Gregory House.
pub fn make_doctor(conn: &Connection) -> i64 {
    let position = match list_positions(conn).unwrap().into_iter().find(|p| p.name == "Physician") {
        Some(p) => p.id,
        None => insert_position(conn, "Physician", None, None, None).unwrap(),
    };
    let spec = match list_specializations(conn).unwrap().into_iter().find(|s| s.name == "Therapy") {
        Some(s) => s.id,
        None => insert_specialization(conn, "Therapy", None, Some("therapeutic")).unwrap(),
    };
    insert_staff(conn, &NewStaffMember {
        last_name: "House".into(),
        first_name: "Gregory".into(),
        hire_date: Some(date(2015, 1, 1)),
        cabinet_number: Some("101".into()),
        position_id: position,
        specialization_id: Some(spec),
        ..Default::default()
    })
    .unwrap()
}

pub fn make_slot(
    conn: &Connection,
    staff_id: i64,
    work_date: NaiveDate,
    start: (u32, u32),
    end: (u32, u32),
    capacity: u32,
) -> i64 {
    insert_slot(conn, &NewSlot {
        staff_id,
        work_date,
        start_time: time(start.0, start.1),
        end_time: time(end.0, end.1),
        room: Some("101".into()),
        capacity,
        notes: None,
    })
    .unwrap()
}

pub fn request(patient_id: i64, staff_id: i64, date: NaiveDate, time: NaiveTime) -> BookingRequest {
    BookingRequest {
        patient_id,
        staff_id,
        date,
        time,
        reason: Some("checkup".into()),
    }
}
