use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::UserRole;

/// Login account. The password hash never leaves the auth module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub created_at: NaiveDateTime,
    pub is_active: bool,
    pub staff_id: Option<i64>,
    pub patient_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub email: Option<String>,
    pub staff_id: Option<i64>,
    pub patient_id: Option<i64>,
}
