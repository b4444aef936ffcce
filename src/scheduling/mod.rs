//! Appointment scheduling core.
//!
//! - `ledger`: bookable capacity per staff member per day. Remaining
//!   capacity is always a live count of SCHEDULED bookings, never a stored
//!   counter, so cancelling frees a place without any bookkeeping.
//! - `transitions`: the single table of legal booking status changes.
//! - `scheduler`: the only path that creates bookings or changes their status.

pub mod ledger;
pub mod scheduler;
pub mod transitions;

pub use ledger::*;
pub use scheduler::*;
pub use transitions::*;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::AppointmentStatus;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("No availability for staff {staff_id} on {date} at {}", .time.format("%H:%M"))]
    NoAvailability {
        staff_id: i64,
        date: NaiveDate,
        time: NaiveTime,
    },

    #[error("Booking {booking_id} cannot move from {from} to {to}")]
    InvalidTransition {
        booking_id: i64,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl SchedulingError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound {
            entity,
            key: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(e: rusqlite::Error) -> Self {
        SchedulingError::Storage(DatabaseError::Sqlite(e))
    }
}
