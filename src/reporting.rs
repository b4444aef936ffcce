//! Read-only reports over bookings, patients and slots, plus file exports.
//!
//! Nothing here writes to the store. Exports land in a caller-chosen
//! directory as `appointments_<YYYYmmdd_HHMMSS>.json` and
//! `patients_<YYYYmmdd_HHMMSS>.csv`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{repository, DatabaseError};
use crate::models::*;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for ReportError {
    fn from(e: rusqlite::Error) -> Self {
        ReportError::Storage(DatabaseError::Sqlite(e))
    }
}

// ── Views ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRef {
    pub id: i64,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRef {
    pub id: i64,
    pub full_name: String,
    pub specialization: Option<String>,
}

/// Booking with the names a human needs to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingView {
    pub id: i64,
    pub patient: PatientRef,
    pub doctor: DoctorRef,
    pub slot_id: i64,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientAgeView {
    #[serde(flatten)]
    pub patient: Patient,
    pub age: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    pub slot: AvailabilitySlot,
    pub remaining: u32,
    pub booked: u32,
    pub staff_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: AppointmentStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgeGroupCount {
    pub label: &'static str,
    pub count: i64,
    /// Share of all patients, 0.0 when there are none.
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicStatistics {
    pub patients: i64,
    pub doctors: i64,
    pub bookings: i64,
    pub records: i64,
    pub by_status: Vec<StatusCount>,
    pub age_groups: Vec<AgeGroupCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResult {
    pub path: PathBuf,
    pub rows: usize,
}

/// Inclusive age bands used by the statistics report.
pub const AGE_GROUPS: [(&str, i32, i32); 4] = [
    ("0-17", 0, 17),
    ("18-35", 18, 35),
    ("36-60", 36, 60),
    ("61+", 61, i32::MAX),
];

// ── Queries ────────────────────────────────────────────────

/// Bookings matching `filter`, ordered by date, time, id.
pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> Result<Vec<BookingView>, ReportError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.schedule_id, a.appointment_date, a.appointment_time, a.status, a.reason,
                a.created_at,
                p.id, p.last_name, p.first_name, p.patronymic, p.phone,
                e.id, e.last_name, e.first_name, e.patronymic, s.name
         FROM appointments a
         JOIN patients p ON p.id = a.patient_id
         JOIN employees e ON e.id = a.doctor_id
         LEFT JOIN specializations s ON s.id = e.specialization_id
         WHERE (?1 IS NULL OR a.appointment_date >= ?1)
           AND (?2 IS NULL OR a.appointment_date <= ?2)
           AND (?3 IS NULL OR a.doctor_id = ?3)
           AND (?4 IS NULL OR a.patient_id = ?4)
           AND (?5 IS NULL OR a.status = ?5)
         ORDER BY a.appointment_date, a.appointment_time, a.id
         LIMIT ?6",
    )?;
    let limit = filter.limit.map_or(-1, i64::from);
    let rows = stmt.query_map(
        params![filter.from, filter.to, filter.staff_id, filter.patient_id, filter.status, limit],
        |row| {
            let patient_last: String = row.get(8)?;
            let patient_first: String = row.get(9)?;
            let patient_middle: Option<String> = row.get(10)?;
            let doctor_last: String = row.get(13)?;
            let doctor_first: String = row.get(14)?;
            let doctor_middle: Option<String> = row.get(15)?;
            Ok(BookingView {
                id: row.get(0)?,
                slot_id: row.get(1)?,
                appointment_date: row.get(2)?,
                appointment_time: row.get(3)?,
                status: row.get(4)?,
                reason: row.get(5)?,
                created_at: row.get(6)?,
                patient: PatientRef {
                    id: row.get(7)?,
                    full_name: join_full_name(&patient_last, &patient_first, patient_middle.as_deref()),
                    phone: row.get(11)?,
                },
                doctor: DoctorRef {
                    id: row.get(12)?,
                    full_name: join_full_name(&doctor_last, &doctor_first, doctor_middle.as_deref()),
                    specialization: row.get(16)?,
                },
            })
        },
    )?;
    rows.collect::<Result<Vec<_>, _>>().map_err(ReportError::from)
}

/// Patients whose age on `today` falls in `range`, ordered by name.
pub fn list_patients_by_age(
    conn: &Connection,
    range: AgeRange,
    today: NaiveDate,
) -> Result<Vec<PatientAgeView>, ReportError> {
    Ok(repository::list_patients(conn)?
        .into_iter()
        .map(|patient| {
            let age = patient.age(today);
            PatientAgeView { patient, age }
        })
        .filter(|view| range.contains(view.age))
        .collect())
}

/// Slots with live booked/remaining counts and the staff member's title.
pub fn schedule_overview(conn: &Connection, filter: &SlotFilter) -> Result<Vec<SlotView>, ReportError> {
    let mut titles: HashMap<i64, String> = HashMap::new();
    let mut views = Vec::new();
    for SlotAvailability { slot, remaining } in repository::list_slot_availability(conn, filter)? {
        if !titles.contains_key(&slot.staff_id) {
            let title = repository::get_staff_title(conn, slot.staff_id)?
                .map(|t| t.full_title())
                .unwrap_or_else(|| format!("staff #{}", slot.staff_id));
            titles.insert(slot.staff_id, title);
        }
        let staff_title = titles.get(&slot.staff_id).cloned().unwrap_or_default();
        views.push(SlotView {
            booked: slot.capacity.saturating_sub(remaining),
            remaining,
            staff_title,
            slot,
        });
    }
    Ok(views)
}

pub fn clinic_statistics(conn: &Connection, today: NaiveDate) -> Result<ClinicStatistics, ReportError> {
    let patients = repository::list_patients(conn)?;
    let total = patients.len() as i64;

    let mut age_groups: Vec<AgeGroupCount> = AGE_GROUPS
        .iter()
        .map(|&(label, _, _)| AgeGroupCount { label, count: 0, percent: 0.0 })
        .collect();
    for patient in &patients {
        let age = patient.age(today);
        if let Some(i) = AGE_GROUPS.iter().position(|&(_, lo, hi)| (lo..=hi).contains(&age)) {
            age_groups[i].count += 1;
        }
    }
    if total > 0 {
        for group in &mut age_groups {
            group.percent = group.count as f64 * 100.0 / total as f64;
        }
    }

    let counted: HashMap<AppointmentStatus, i64> =
        repository::count_bookings_by_status(conn)?.into_iter().collect();
    let by_status = AppointmentStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: counted.get(status).copied().unwrap_or(0),
        })
        .collect();

    Ok(ClinicStatistics {
        patients: total,
        doctors: repository::count_doctors(conn)?,
        bookings: repository::count_bookings(conn)?,
        records: repository::count_records(conn)?,
        by_status,
        age_groups,
    })
}

// ── Exports ────────────────────────────────────────────────

fn export_path(dir: &Path, prefix: &str, extension: &str) -> Result<PathBuf, std::io::Error> {
    std::fs::create_dir_all(dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    Ok(dir.join(format!("{prefix}_{stamp}.{extension}")))
}

/// Writes matching bookings as pretty-printed JSON.
pub fn export_bookings_json(
    conn: &Connection,
    filter: &BookingFilter,
    dir: &Path,
) -> Result<ExportResult, ReportError> {
    let bookings = list_bookings(conn, filter)?;
    let path = export_path(dir, "appointments", "json")?;
    std::fs::write(&path, serde_json::to_string_pretty(&bookings)?)?;

    tracing::info!(rows = bookings.len(), path = %path.display(), "Bookings exported");
    Ok(ExportResult { path, rows: bookings.len() })
}

const PATIENT_CSV_HEADER: [&str; 11] = [
    "id",
    "last_name",
    "first_name",
    "patronymic",
    "birth_date",
    "age",
    "gender",
    "phone",
    "email",
    "address",
    "registration_date",
];

/// Writes patients in the age range as CSV (UTF-8 with BOM, CRLF rows).
pub fn export_patients_csv(
    conn: &Connection,
    range: AgeRange,
    today: NaiveDate,
    dir: &Path,
) -> Result<ExportResult, ReportError> {
    let patients = list_patients_by_age(conn, range, today)?;
    let path = export_path(dir, "patients", "csv")?;

    let mut out = std::io::BufWriter::new(std::fs::File::create(&path)?);
    out.write_all("\u{feff}".as_bytes())?;
    write_csv_row(&mut out, PATIENT_CSV_HEADER.iter().map(|h| Cow::Borrowed(*h)))?;
    for PatientAgeView { patient: p, age } in &patients {
        let opt = |v: &Option<String>| Cow::Owned(v.clone().unwrap_or_default());
        write_csv_row(
            &mut out,
            [
                Cow::Owned(p.id.to_string()),
                Cow::Borrowed(p.last_name.as_str()),
                Cow::Borrowed(p.first_name.as_str()),
                opt(&p.patronymic),
                Cow::Owned(p.birth_date.to_string()),
                Cow::Owned(age.to_string()),
                opt(&p.gender),
                opt(&p.phone),
                opt(&p.email),
                opt(&p.address),
                Cow::Owned(p.registration_date.to_string()),
            ],
        )?;
    }
    out.flush()?;

    tracing::info!(rows = patients.len(), path = %path.display(), "Patients exported");
    Ok(ExportResult { path, rows: patients.len() })
}

fn write_csv_row<'a>(
    out: &mut impl Write,
    fields: impl IntoIterator<Item = Cow<'a, str>>,
) -> std::io::Result<()> {
    let line = fields
        .into_iter()
        .map(|f| csv_field(&f).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    write!(out, "{line}\r\n")
}

/// RFC 4180 quoting: fields holding a comma, quote or line break are
/// wrapped in quotes with inner quotes doubled.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
