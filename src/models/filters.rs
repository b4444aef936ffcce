use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

/// Booking query filter. `from`/`to` are inclusive bounds on the booking date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub staff_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub limit: Option<u32>,
}

/// Inclusive patient age bounds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl AgeRange {
    pub fn contains(&self, age: i32) -> bool {
        self.min.map_or(true, |min| age >= min) && self.max.map_or(true, |max| age <= max)
    }
}

/// Slot query filter. `from`/`to` are inclusive bounds on the work date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotFilter {
    pub staff_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub only_open: bool,
}
