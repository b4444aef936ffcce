//! Report and export commands, open to admins, doctors and registrars.

use crate::auth::Session;
use crate::core_state::CoreState;
use crate::models::{AgeRange, BookingFilter, SlotFilter};
use crate::reporting::{self, BookingView, ClinicStatistics, ExportResult, PatientAgeView, SlotView};

use super::{guard, CommandError, REPORT_READERS};

pub fn list_bookings(
    state: &CoreState,
    session: &Session,
    filter: &BookingFilter,
) -> Result<Vec<BookingView>, CommandError> {
    guard(session, REPORT_READERS)?;
    let conn = state.open_db()?;
    Ok(reporting::list_bookings(&conn, filter)?)
}

pub fn patients_by_age(
    state: &CoreState,
    session: &Session,
    range: AgeRange,
) -> Result<Vec<PatientAgeView>, CommandError> {
    guard(session, REPORT_READERS)?;
    let conn = state.open_db()?;
    Ok(reporting::list_patients_by_age(&conn, range, state.today())?)
}

pub fn schedule_overview(
    state: &CoreState,
    session: &Session,
    filter: &SlotFilter,
) -> Result<Vec<SlotView>, CommandError> {
    guard(session, REPORT_READERS)?;
    let conn = state.open_db()?;
    Ok(reporting::schedule_overview(&conn, filter)?)
}

pub fn clinic_statistics(state: &CoreState, session: &Session) -> Result<ClinicStatistics, CommandError> {
    guard(session, REPORT_READERS)?;
    let conn = state.open_db()?;
    Ok(reporting::clinic_statistics(&conn, state.today())?)
}

pub fn export_bookings(
    state: &CoreState,
    session: &Session,
    filter: &BookingFilter,
) -> Result<ExportResult, CommandError> {
    guard(session, REPORT_READERS)?;
    let conn = state.open_db()?;
    let result = reporting::export_bookings_json(&conn, filter, &state.config().exports_dir())?;
    tracing::info!(user_id = session.user_id, rows = result.rows, "Booking export requested");
    Ok(result)
}

pub fn export_patients(state: &CoreState, session: &Session, range: AgeRange) -> Result<ExportResult, CommandError> {
    guard(session, REPORT_READERS)?;
    let conn = state.open_db()?;
    let result = reporting::export_patients_csv(&conn, range, state.today(), &state.config().exports_dir())?;
    tracing::info!(user_id = session.user_id, rows = result.rows, "Patient export requested");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{booking, test_support::*};
    use crate::models::UserRole::*;

    #[test]
    fn reports_reflect_bookings() {
        let t = TestClinic::new();
        booking::create_booking(&t.state, &t.session(Registrar), &t.checkup()).unwrap();
        let doctor = t.session(Doctor);

        let views = list_bookings(&t.state, &doctor, &BookingFilter::default()).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].patient.id, t.patient);

        let slots = schedule_overview(&t.state, &doctor, &SlotFilter::default()).unwrap();
        assert_eq!((slots[0].booked, slots[0].remaining), (1, 0));

        let stats = clinic_statistics(&t.state, &doctor).unwrap();
        assert_eq!(stats.bookings, 1);
    }

    #[test]
    fn patients_cannot_read_reports() {
        let t = TestClinic::new();
        let patient = t.session(Patient);
        assert!(matches!(
            clinic_statistics(&t.state, &patient),
            Err(CommandError::Forbidden { .. })
        ));
        assert!(matches!(
            export_patients(&t.state, &patient, AgeRange::default()),
            Err(CommandError::Forbidden { .. })
        ));
    }

    #[test]
    fn exports_land_in_exports_dir() {
        let t = TestClinic::new();
        let desk = t.session(Registrar);

        let csv = export_patients(&t.state, &desk, AgeRange::default()).unwrap();
        assert_eq!(csv.rows, 1);
        assert!(csv.path.starts_with(t.state.config().exports_dir()));

        let json = export_bookings(&t.state, &desk, &BookingFilter::default()).unwrap();
        assert_eq!(json.rows, 0);
        assert!(json.path.exists());
    }
}
