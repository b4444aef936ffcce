use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Clinical notes for exactly one completed booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub id: i64,
    pub booking_id: i64,
    pub patient_id: i64,
    pub staff_id: i64,
    pub complaints: Option<String>,
    pub diagnosis_id: Option<i64>,
    pub examination_results: Option<String>,
    pub recommendations: Option<String>,
    pub record_date: NaiveDateTime,
    pub next_visit_date: Option<NaiveDate>,
    pub is_emergency: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClinicalRecord {
    pub complaints: Option<String>,
    pub diagnosis_id: Option<i64>,
    pub examination_results: Option<String>,
    pub recommendations: Option<String>,
    pub next_visit_date: Option<NaiveDate>,
    pub is_emergency: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub record_id: i64,
    pub medication_name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPrescription {
    pub medication_name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A record together with its prescriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDetail {
    pub record: ClinicalRecord,
    pub prescriptions: Vec<Prescription>,
}
