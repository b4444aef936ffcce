use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{age_on, join_full_name};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub passport_series: Option<String>,
    pub passport_number: Option<String>,
    pub email: Option<String>,
    pub registration_date: NaiveDate,
}

impl Patient {
    pub fn full_name(&self) -> String {
        join_full_name(&self.last_name, &self.first_name, self.patronymic.as_deref())
    }

    pub fn age(&self, today: NaiveDate) -> i32 {
        age_on(self.birth_date, today)
    }
}

/// Input for registering a patient. `registration_date` defaults to today.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPatient {
    pub last_name: String,
    pub first_name: String,
    pub patronymic: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub passport_series: Option<String>,
    pub passport_number: Option<String>,
    pub email: Option<String>,
    pub registration_date: Option<NaiveDate>,
}
