//! Appointment scheduler: the only path that creates bookings or moves
//! their status.

use chrono::NaiveDate;
use rusqlite::Connection;

use super::{check_transition, SchedulingError};
use crate::db::{self, repository};
use crate::models::*;
use crate::validation;

/// Books `request` into the first open slot that covers its time.
///
/// The slot lookup and the insert share one IMMEDIATE transaction, so two
/// callers can never both see the last free place.
pub fn create_booking(conn: &Connection, request: &BookingRequest) -> Result<i64, SchedulingError> {
    validation::free_text("reason", request.reason.as_deref())?;

    let tx = db::begin_immediate(conn)?;

    if !repository::patient_exists(&tx, request.patient_id)? {
        return Err(SchedulingError::not_found("Patient", request.patient_id));
    }
    if !repository::staff_exists(&tx, request.staff_id)? {
        return Err(SchedulingError::not_found("Staff", request.staff_id));
    }

    let Some(open) = repository::find_open_slot(&tx, request.staff_id, request.date, request.time)?
    else {
        tracing::debug!(
            staff_id = request.staff_id,
            date = %request.date,
            time = %request.time,
            "No open slot for booking request"
        );
        return Err(SchedulingError::NoAvailability {
            staff_id: request.staff_id,
            date: request.date,
            time: request.time,
        });
    };
    if open.slot.work_date != request.date || !open.slot.contains(request.time) {
        return Err(SchedulingError::Conflict(format!(
            "slot {} does not cover {} {}",
            open.slot.id, request.date, request.time
        )));
    }

    let now = chrono::Local::now().naive_local();
    let id = repository::insert_scheduled_booking(&tx, request, open.slot.id, now)?;
    tx.commit()?;

    tracing::info!(
        booking_id = id,
        slot_id = open.slot.id,
        patient_id = request.patient_id,
        staff_id = request.staff_id,
        "Booking created"
    );
    Ok(id)
}

/// Cancels a SCHEDULED booking. Its slot place frees up implicitly.
///
/// `actor_role` is recorded in the log only; authorization happens before
/// this call.
pub fn cancel_booking(
    conn: &Connection,
    booking_id: i64,
    actor_role: UserRole,
) -> Result<(), SchedulingError> {
    transition(conn, booking_id, AppointmentStatus::Cancelled)?;
    tracing::info!(booking_id, actor = %actor_role, "Booking cancelled");
    Ok(())
}

pub fn complete_booking(conn: &Connection, booking_id: i64) -> Result<(), SchedulingError> {
    transition(conn, booking_id, AppointmentStatus::Completed)?;
    tracing::info!(booking_id, "Booking completed");
    Ok(())
}

pub fn mark_no_show(conn: &Connection, booking_id: i64) -> Result<(), SchedulingError> {
    transition(conn, booking_id, AppointmentStatus::NoShow)?;
    tracing::info!(booking_id, "Booking marked as no-show");
    Ok(())
}

fn transition(
    conn: &Connection,
    booking_id: i64,
    to: AppointmentStatus,
) -> Result<(), SchedulingError> {
    let tx = db::begin_immediate(conn)?;
    let booking = repository::get_booking(&tx, booking_id)?
        .ok_or_else(|| SchedulingError::not_found("Booking", booking_id))?;

    if let Err(e) = check_transition(booking_id, booking.status, to) {
        tracing::warn!(booking_id, from = %booking.status, to = %to, "Rejected status change");
        return Err(e);
    }

    let now = chrono::Local::now().naive_local();
    if !repository::update_booking_status(&tx, booking_id, booking.status, to, now)? {
        // Unreachable while the write lock is held; kept for connections
        // that bypass the immediate transaction.
        return Err(SchedulingError::Conflict(format!(
            "booking {booking_id} changed status concurrently"
        )));
    }
    tx.commit()?;
    Ok(())
}

pub fn get_booking(conn: &Connection, booking_id: i64) -> Result<Booking, SchedulingError> {
    repository::get_booking(conn, booking_id)?
        .ok_or_else(|| SchedulingError::not_found("Booking", booking_id))
}

pub fn bookings_for_patient(conn: &Connection, patient_id: i64) -> Result<Vec<Booking>, SchedulingError> {
    if !repository::patient_exists(conn, patient_id)? {
        return Err(SchedulingError::not_found("Patient", patient_id));
    }
    let filter = BookingFilter {
        patient_id: Some(patient_id),
        ..Default::default()
    };
    Ok(repository::list_bookings(conn, &filter)?)
}

/// A staff member's bookings, optionally limited to one day.
pub fn bookings_for_staff(
    conn: &Connection,
    staff_id: i64,
    date: Option<NaiveDate>,
) -> Result<Vec<Booking>, SchedulingError> {
    if !repository::staff_exists(conn, staff_id)? {
        return Err(SchedulingError::not_found("Staff", staff_id));
    }
    let filter = BookingFilter {
        staff_id: Some(staff_id),
        from: date,
        to: date,
        ..Default::default()
    };
    Ok(repository::list_bookings(conn, &filter)?)
}
