use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Bookable window of one staff member on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: i64,
    pub staff_id: i64,
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
    /// Maximum concurrent SCHEDULED bookings.
    pub capacity: u32,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl AvailabilitySlot {
    /// Half-open containment: `start <= time < end`.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSlot {
    pub staff_id: i64,
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub capacity: u32,
    pub notes: Option<String>,
}

/// Slot with its live remaining capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub slot: AvailabilitySlot,
    pub remaining: u32,
}
