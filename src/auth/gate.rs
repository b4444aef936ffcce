use rusqlite::Connection;

use super::{dummy_verify, hash_password, verify_password, AuthError, Session, MIN_PASSWORD_LEN};
use crate::db::{repository, DatabaseError};
use crate::models::*;
use crate::validation;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Creates an active account. Linked staff/patient ids must exist.
pub fn register_user(conn: &Connection, user: &NewUser, iterations: u32) -> Result<i64, AuthError> {
    validation::require_name("username", &user.username)?;
    validation::optional_email(user.email.as_deref())?;
    if user.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    if let Some(staff_id) = user.staff_id {
        if !repository::staff_exists(conn, staff_id)? {
            return Err(AuthError::NotFound { entity: "Staff", id: staff_id });
        }
    }
    if let Some(patient_id) = user.patient_id {
        if !repository::patient_exists(conn, patient_id)? {
            return Err(AuthError::NotFound { entity: "Patient", id: patient_id });
        }
    }
    if repository::get_user_by_username(conn, &user.username)?.is_some() {
        return Err(AuthError::UsernameTaken(user.username.clone()));
    }

    let hash = hash_password(&user.password, iterations);
    let id = repository::insert_user(conn, user, &hash).map_err(|e| {
        if e.is_constraint_violation() {
            AuthError::UsernameTaken(user.username.clone())
        } else {
            AuthError::Storage(e)
        }
    })?;

    tracing::info!(user_id = id, username = %user.username, role = %user.role, "User registered");
    Ok(id)
}

/// Verifies credentials of an active account.
///
/// Unknown usernames, inactive accounts and wrong passwords all produce
/// `InvalidCredentials`, and all of them pay one key derivation at
/// `iterations`.
pub fn authenticate(
    conn: &Connection,
    username: &str,
    password: &str,
    iterations: u32,
) -> Result<Session, AuthError> {
    let user = match repository::get_user_by_username(conn, username)? {
        Some(user) if user.is_active => user,
        _ => {
            dummy_verify(password, iterations);
            tracing::info!(username, "Login refused");
            return Err(AuthError::InvalidCredentials);
        }
    };
    if !verify_password(password, &user.password_hash)? {
        tracing::info!(username, "Login refused");
        return Err(AuthError::InvalidCredentials);
    }

    let display_name = display_name(conn, &user)?;
    tracing::info!(user_id = user.id, role = %user.role, "Login succeeded");
    Ok(Session {
        user_id: user.id,
        username: user.username,
        role: user.role,
        display_name,
        staff_id: user.staff_id,
        patient_id: user.patient_id,
    })
}

fn display_name(conn: &Connection, user: &User) -> Result<String, DatabaseError> {
    let linked = match (user.role, user.staff_id, user.patient_id) {
        (UserRole::Doctor, Some(staff_id), _) => {
            repository::get_staff(conn, staff_id)?.map(|s| s.full_name())
        }
        (UserRole::Patient, _, Some(patient_id)) => {
            repository::get_patient(conn, patient_id)?.map(|p| p.full_name())
        }
        _ => None,
    };
    Ok(linked.unwrap_or_else(|| user.username.clone()))
}

pub fn authorize(role: UserRole, required: &[UserRole]) -> bool {
    required.contains(&role)
}

/// `Forbidden` unless the session's role is one of `required`.
pub fn require(session: &Session, required: &[UserRole]) -> Result<(), AuthError> {
    if authorize(session.role, required) {
        return Ok(());
    }
    tracing::warn!(user_id = session.user_id, role = %session.role, "Access denied");
    Err(AuthError::Forbidden {
        role: session.role,
        required: required.iter().map(UserRole::as_str).collect::<Vec<_>>().join(", "),
    })
}

/// Replaces a password after re-checking the current one.
pub fn change_password(
    conn: &Connection,
    session: &Session,
    current: &str,
    new_password: &str,
    iterations: u32,
) -> Result<(), AuthError> {
    let user = repository::get_user(conn, session.user_id)?
        .ok_or(AuthError::NotFound { entity: "User", id: session.user_id })?;
    if !verify_password(current, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials);
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    repository::update_password_hash(conn, user.id, &hash_password(new_password, iterations))?;
    tracing::info!(user_id = user.id, "Password changed");
    Ok(())
}

pub fn deactivate_user(conn: &Connection, user_id: i64) -> Result<(), AuthError> {
    repository::set_user_active(conn, user_id, false).map_err(|e| match e {
        DatabaseError::NotFound { .. } => AuthError::NotFound { entity: "User", id: user_id },
        other => other.into(),
    })?;
    tracing::info!(user_id, "User deactivated");
    Ok(())
}

/// Creates the `admin` account when it does not exist yet. Returns whether
/// an account was created.
pub fn ensure_default_admin(conn: &Connection, password: &str, iterations: u32) -> Result<bool, AuthError> {
    if repository::get_user_by_username(conn, DEFAULT_ADMIN_USERNAME)?.is_some() {
        return Ok(false);
    }
    register_user(
        conn,
        &NewUser {
            username: DEFAULT_ADMIN_USERNAME.into(),
            password: password.into(),
            role: UserRole::Admin,
            email: Some("admin@clinic.local".into()),
            staff_id: None,
            patient_id: None,
        },
        iterations,
    )?;
    Ok(true)
}
