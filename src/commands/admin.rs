//! Administration commands: accounts, catalog, staff, slots and backups.
//! All of them are admin-only except `list_services`.

use std::path::PathBuf;

use crate::auth::{self, Session};
use crate::backup::{self, BackupInfo, BackupResult, RestorePreview, RestoreResult};
use crate::core_state::CoreState;
use crate::db::repository;
use crate::models::{NewSlot, NewStaffMember, NewUser, Service, User};
use crate::scheduling;
use crate::validation::{self, ValidationError};

use super::{guard, CommandError, ADMINS, ANY_ROLE};

// ── Accounts ────────────────────────────────────────────────

pub fn register_user(state: &CoreState, session: &Session, user: &NewUser) -> Result<i64, CommandError> {
    guard(session, ADMINS)?;
    let conn = state.open_db()?;
    Ok(auth::register_user(&conn, user, state.pbkdf2_iterations())?)
}

pub fn deactivate_user(state: &CoreState, session: &Session, user_id: i64) -> Result<(), CommandError> {
    guard(session, ADMINS)?;
    if user_id == session.user_id {
        return Err(ValidationError::new("user_id", "cannot deactivate your own account").into());
    }
    let conn = state.open_db()?;
    Ok(auth::deactivate_user(&conn, user_id)?)
}

pub fn list_users(state: &CoreState, session: &Session) -> Result<Vec<User>, CommandError> {
    guard(session, ADMINS)?;
    let conn = state.open_db()?;
    Ok(repository::list_users(&conn)?)
}

// ── Catalog ─────────────────────────────────────────────────

pub fn add_position(
    state: &CoreState,
    session: &Session,
    name: &str,
    description: Option<&str>,
) -> Result<i64, CommandError> {
    guard(session, ADMINS)?;
    validation::require_name("name", name)?;
    let conn = state.open_db()?;
    Ok(repository::insert_position(&conn, name.trim(), description, None, None)?)
}

pub fn add_specialization(
    state: &CoreState,
    session: &Session,
    name: &str,
    category: Option<&str>,
) -> Result<i64, CommandError> {
    guard(session, ADMINS)?;
    validation::require_name("name", name)?;
    let conn = state.open_db()?;
    Ok(repository::insert_specialization(&conn, name.trim(), None, category)?)
}

pub fn add_diagnosis(
    state: &CoreState,
    session: &Session,
    code: &str,
    name: &str,
    category: Option<&str>,
    is_chronic: bool,
) -> Result<i64, CommandError> {
    guard(session, ADMINS)?;
    let code = code.trim().to_uppercase();
    validation::diagnosis_code(&code)?;
    validation::require_name("name", name)?;
    let conn = state.open_db()?;
    Ok(repository::insert_diagnosis(&conn, &code, name.trim(), None, category, is_chronic)?)
}

pub fn add_service(
    state: &CoreState,
    session: &Session,
    code: &str,
    name: &str,
    price: f64,
    duration_minutes: u32,
) -> Result<i64, CommandError> {
    guard(session, ADMINS)?;
    validation::require_name("code", code)?;
    validation::require_name("name", name)?;
    let conn = state.open_db()?;
    Ok(repository::insert_service(&conn, code.trim(), name.trim(), None, price, duration_minutes, None)?)
}

pub fn set_service_available(
    state: &CoreState,
    session: &Session,
    service_id: i64,
    available: bool,
) -> Result<(), CommandError> {
    guard(session, ADMINS)?;
    let conn = state.open_db()?;
    Ok(repository::set_service_available(&conn, service_id, available)?)
}

/// Price list. Everyone sees what is offered; admins also see withdrawn services.
pub fn list_services(state: &CoreState, session: &Session) -> Result<Vec<Service>, CommandError> {
    guard(session, ANY_ROLE)?;
    let conn = state.open_db()?;
    let only_available = !auth::authorize(session.role, ADMINS);
    Ok(repository::list_services(&conn, only_available)?)
}

// ── Staff & slots ───────────────────────────────────────────

pub fn add_staff(state: &CoreState, session: &Session, staff: &NewStaffMember) -> Result<i64, CommandError> {
    guard(session, ADMINS)?;
    validation::new_staff(staff, state.today())?;
    let conn = state.open_db()?;
    let id = repository::insert_staff(&conn, staff)?;
    tracing::info!(staff_id = id, "Staff member added");
    Ok(id)
}

pub fn create_slot(state: &CoreState, session: &Session, slot: &NewSlot) -> Result<i64, CommandError> {
    guard(session, ADMINS)?;
    let conn = state.open_db()?;
    Ok(scheduling::create_slot(&conn, slot)?)
}

pub fn update_slot_capacity(
    state: &CoreState,
    session: &Session,
    slot_id: i64,
    capacity: u32,
) -> Result<(), CommandError> {
    guard(session, ADMINS)?;
    let conn = state.open_db()?;
    Ok(scheduling::update_slot_capacity(&conn, slot_id, capacity)?)
}

pub fn update_slot_window(
    state: &CoreState,
    session: &Session,
    slot_id: i64,
    start_time: chrono::NaiveTime,
    end_time: chrono::NaiveTime,
) -> Result<(), CommandError> {
    guard(session, ADMINS)?;
    let conn = state.open_db()?;
    Ok(scheduling::update_slot_window(&conn, slot_id, start_time, end_time)?)
}

// ── Backups ─────────────────────────────────────────────────

pub fn create_backup(state: &CoreState, session: &Session) -> Result<BackupResult, CommandError> {
    guard(session, ADMINS)?;
    let conn = state.open_db()?;
    Ok(backup::create_backup(&conn, &state.config().backups_dir())?)
}

pub fn list_backups(state: &CoreState, session: &Session) -> Result<Vec<BackupInfo>, CommandError> {
    guard(session, ADMINS)?;
    Ok(backup::list_backups(&state.config().backups_dir())?)
}

pub fn preview_backup(state: &CoreState, session: &Session, name: &str) -> Result<RestorePreview, CommandError> {
    guard(session, ADMINS)?;
    let path = backup_path(state, name)?;
    Ok(backup::preview_backup(&path)?)
}

/// Replaces the live store with the named backup. Connections opened
/// before the restore keep reading the old file.
pub fn restore_backup(state: &CoreState, session: &Session, name: &str) -> Result<RestoreResult, CommandError> {
    guard(session, ADMINS)?;
    let path = backup_path(state, name)?;
    let config = state.config();
    let result = backup::restore_backup(&path, &config.database_path(), &config.backups_dir())?;
    tracing::warn!(backup = %name, user_id = session.user_id, "Store restored from backup");
    Ok(result)
}

/// Resolves a bare backup file name inside the backups directory.
fn backup_path(state: &CoreState, name: &str) -> Result<PathBuf, ValidationError> {
    let plain = !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.starts_with('.')
        && name.ends_with(".db");
    if !plain {
        return Err(ValidationError::new("backup", format!("'{name}' is not a backup file name")));
    }
    Ok(state.config().backups_dir().join(name))
}
