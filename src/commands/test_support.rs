//! A file-backed clinic with one account per role.

use tempfile::TempDir;

use super::login;
use crate::auth::{self, Session};
use crate::config::ClinicConfig;
use crate::core_state::CoreState;
use crate::db::repository::fixtures::*;
use crate::models::*;

pub const PASSWORD: &str = "secret1";

pub struct TestClinic {
    pub state: CoreState,
    pub patient: i64,
    pub staff: i64,
    /// 2024-03-01 09:00-10:00, capacity 1.
    pub slot: i64,
    _dir: TempDir,
}

impl TestClinic {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClinicConfig::with_data_dir(dir.path());
        config.pbkdf2_iterations = 1_000;
        let state = CoreState::new(config);

        let conn = state.open_db().unwrap();
        let patient = make_patient(&conn, "Smith", "Anna", date(1990, 5, 1));
        let staff = make_doctor(&conn);
        let slot = make_slot(&conn, staff, date(2024, 3, 1), (9, 0), (10, 0), 1);

        for role in UserRole::ALL {
            let user = NewUser {
                username: role.as_str().into(),
                password: PASSWORD.into(),
                role: *role,
                email: None,
                staff_id: (*role == UserRole::Doctor).then_some(staff),
                patient_id: (*role == UserRole::Patient).then_some(patient),
            };
            auth::register_user(&conn, &user, 1_000).unwrap();
        }

        Self { state, patient, staff, slot, _dir: dir }
    }

    /// Logs in the account named after `role`.
    pub fn session(&self, role: UserRole) -> Session {
        login(&self.state, role.as_str(), PASSWORD).unwrap()
    }

    pub fn checkup(&self) -> BookingRequest {
        request(self.patient, self.staff, date(2024, 3, 1), time(9, 15))
    }
}
