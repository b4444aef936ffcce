//! Access gate: accounts, password verification and role checks.
//!
//! There is no ambient "current user": `authenticate` hands back a
//! [`Session`] value and every guarded call receives it explicitly.

pub mod gate;
pub mod password;

pub use gate::*;
pub use password::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::UserRole;
use crate::validation::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    #[error("Role {role} may not perform this action (requires one of: {required})")]
    Forbidden { role: UserRole, required: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Authenticated identity, passed by value into guarded operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
    /// Linked staff or patient full name, else the username.
    pub display_name: String,
    pub staff_id: Option<i64>,
    pub patient_id: Option<i64>,
}

impl Session {
    pub fn has_role(&self, required: &[UserRole]) -> bool {
        authorize(self.role, required)
    }
}
