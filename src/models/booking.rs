use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

/// Appointment joining a patient, a staff member and one availability slot.
///
/// `date`/`time` are copied at creation and never re-derived from the slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub patient_id: i64,
    pub staff_id: i64,
    pub slot_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub patient_id: i64,
    pub staff_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
}
