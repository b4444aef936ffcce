//! Caller boundary. Every command takes the shared [`CoreState`] and the
//! caller's [`Session`], checks the role, then opens a connection and
//! delegates to the domain module.

pub mod admin;
pub mod booking;
pub mod clinical;
pub mod registry;
pub mod reports;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

use crate::auth::{self, AuthError, Session};
use crate::backup::BackupError;
use crate::clinical::ClinicalError;
use crate::core_state::CoreState;
use crate::db::DatabaseError;
use crate::models::UserRole::{self, *};
use crate::reporting::ReportError;
use crate::scheduling::SchedulingError;
use crate::validation::ValidationError;

/// Booking creation and cancellation.
pub const FRONT_DESK: &[UserRole] = &[Admin, Registrar];
/// Completion, no-shows, clinical records and prescriptions.
pub const CLINICIANS: &[UserRole] = &[Admin, Doctor];
/// Accounts, catalog, staff, slots and backups.
pub const ADMINS: &[UserRole] = &[Admin];
/// Reports and exports.
pub const REPORT_READERS: &[UserRole] = &[Admin, Doctor, Registrar];
pub const ANY_ROLE: &[UserRole] = UserRole::ALL;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Forbidden: role {role} requires one of: {required}")]
    Forbidden { role: UserRole, required: String },

    #[error(transparent)]
    Auth(AuthError),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Clinical(#[from] ClinicalError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<AuthError> for CommandError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Forbidden { role, required } => CommandError::Forbidden { role, required },
            other => CommandError::Auth(other),
        }
    }
}

impl From<rusqlite::Error> for CommandError {
    fn from(e: rusqlite::Error) -> Self {
        CommandError::Database(DatabaseError::Sqlite(e))
    }
}

pub(crate) fn forbidden(session: &Session, required: &[UserRole]) -> CommandError {
    CommandError::Forbidden {
        role: session.role,
        required: required.iter().map(UserRole::as_str).collect::<Vec<_>>().join(", "),
    }
}

/// Role gate run first by every guarded command.
pub(crate) fn guard(session: &Session, required: &[UserRole]) -> Result<(), CommandError> {
    auth::require(session, required)?;
    Ok(())
}

/// Verifies credentials and returns the session to pass to other commands.
pub fn login(state: &CoreState, username: &str, password: &str) -> Result<Session, CommandError> {
    let conn = state.open_db()?;
    Ok(auth::authenticate(&conn, username, password, state.pbkdf2_iterations())?)
}

pub fn change_password(
    state: &CoreState,
    session: &Session,
    current: &str,
    new_password: &str,
) -> Result<(), CommandError> {
    let conn = state.open_db()?;
    auth::change_password(&conn, session, current, new_password, state.pbkdf2_iterations())?;
    Ok(())
}
