use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::join_full_name;

/// Clinic employee. Doctors are staff members with a specialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hire_date: NaiveDate,
    pub cabinet_number: Option<String>,
    pub position_id: i64,
    pub specialization_id: Option<i64>,
}

impl StaffMember {
    pub fn full_name(&self) -> String {
        join_full_name(&self.last_name, &self.first_name, self.patronymic.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStaffMember {
    pub last_name: String,
    pub first_name: String,
    pub patronymic: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub cabinet_number: Option<String>,
    pub position_id: i64,
    pub specialization_id: Option<i64>,
}

/// Staff member joined with catalog names, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffTitle {
    pub staff_id: i64,
    pub full_name: String,
    pub position: String,
    pub specialization: Option<String>,
}

impl StaffTitle {
    /// "position specialization full name", skipping a missing specialization.
    pub fn full_title(&self) -> String {
        let spec = self.specialization.as_deref().unwrap_or("");
        format!("{} {} {}", self.position, spec, self.full_name)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
