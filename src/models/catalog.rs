use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specialization {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Broad grouping, e.g. "therapeutic" or "surgical".
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: i64,
    /// ICD-10 code.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_chronic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: u32,
    pub category: Option<String>,
    pub is_available: bool,
}
