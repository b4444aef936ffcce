//! Reference catalog, demo data and test accounts for an empty store.
//!
//! Demo bookings and records go through the scheduler and record store,
//! so seeded data obeys the same capacity and status rules as live data.

use chrono::{Duration, NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::auth::{self, AuthError};
use crate::clinical::{self, ClinicalError};
use crate::db::{repository, DatabaseError};
use crate::models::*;
use crate::scheduling::{self, SchedulingError};

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Clinical error: {0}")]
    Clinical(#[from] ClinicalError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Missing reference entry: {0}")]
    MissingReference(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub positions: usize,
    pub specializations: usize,
    pub diagnoses: usize,
    pub services: usize,
    pub staff: usize,
    pub patients: usize,
    pub slots: usize,
    pub bookings: usize,
    pub records: usize,
    pub prescriptions: usize,
    pub users: usize,
}

// ── Reference catalog ──────────────────────────────────────

const POSITIONS: [(&str, &str, f64, f64); 8] = [
    ("Chief physician", "Head of the clinic", 100_000.0, 200_000.0),
    ("Therapist", "General practitioner", 60_000.0, 120_000.0),
    ("Cardiologist", "Heart disease specialist", 80_000.0, 150_000.0),
    ("Neurologist", "Nervous system specialist", 75_000.0, 140_000.0),
    ("Surgeon", "Surgical specialist", 90_000.0, 160_000.0),
    ("Nurse", "Nursing staff", 30_000.0, 60_000.0),
    ("Registrar", "Front desk", 25_000.0, 40_000.0),
    ("Administrator", "Clinic management", 50_000.0, 90_000.0),
];

const SPECIALIZATIONS: [(&str, &str, &str); 7] = [
    ("Therapy", "General therapy", "therapeutic"),
    ("Cardiology", "Cardiovascular diseases", "therapeutic"),
    ("Neurology", "Nervous system diseases", "therapeutic"),
    ("Surgery", "Surgical diseases", "surgical"),
    ("Pediatrics", "Children's diseases", "therapeutic"),
    ("Ophthalmology", "Eye diseases", "therapeutic"),
    ("Dentistry", "Teeth and oral cavity", "therapeutic"),
];

const DIAGNOSES: [(&str, &str, &str, &str, bool); 5] = [
    ("I10", "Essential (primary) hypertension", "High blood pressure", "Cardiology", true),
    ("J06.9", "Acute upper respiratory infection, unspecified", "Common cold", "Therapy", false),
    ("M54.5", "Low back pain", "Lumbar pain", "Neurology", false),
    ("E11.9", "Type 2 diabetes mellitus without complications", "Type 2 diabetes", "Endocrinology", true),
    ("K29.7", "Gastritis, unspecified", "Stomach lining inflammation", "Gastroenterology", true),
];

const SERVICES: [(&str, &str, &str, f64, u32); 7] = [
    ("CONS", "Therapist consultation", "Initial consultation", 1500.0, 30),
    ("CARD", "Cardiologist consultation", "Cardiology consultation", 2000.0, 40),
    ("NEUR", "Neurologist consultation", "Neurology consultation", 1800.0, 45),
    ("SURG", "Surgeon consultation", "Surgery consultation", 2500.0, 50),
    ("CBC", "Complete blood count", "Blood sampling and analysis", 800.0, 15),
    ("ECG", "Electrocardiogram", "Resting ECG", 1200.0, 20),
    ("US", "Abdominal ultrasound", "Ultrasound examination", 3000.0, 60),
];

pub fn seed_reference_data(conn: &Connection) -> Result<SeedSummary, SeedError> {
    for (name, description, min, max) in POSITIONS {
        repository::insert_position(conn, name, Some(description), Some(min), Some(max))?;
    }
    for (name, description, category) in SPECIALIZATIONS {
        repository::insert_specialization(conn, name, Some(description), Some(category))?;
    }
    for (code, name, description, category, chronic) in DIAGNOSES {
        repository::insert_diagnosis(conn, code, name, Some(description), Some(category), chronic)?;
    }
    for (code, name, description, price, minutes) in SERVICES {
        repository::insert_service(conn, code, name, Some(description), price, minutes, None)?;
    }
    Ok(SeedSummary {
        positions: POSITIONS.len(),
        specializations: SPECIALIZATIONS.len(),
        diagnoses: DIAGNOSES.len(),
        services: SERVICES.len(),
        ..Default::default()
    })
}

// ── Demo data ──────────────────────────────────────────────

struct DemoStaff {
    last: &'static str,
    first: &'static str,
    middle: &'static str,
    born: (i32, u32, u32),
    hired: (i32, u32, u32),
    cabinet: &'static str,
    position: &'static str,
    specialization: Option<&'static str>,
}

const STAFF: [DemoStaff; 5] = [
    DemoStaff { last: "Ivanov", first: "Alexander", middle: "Petrovich", born: (1975, 5, 15), hired: (2010, 3, 10), cabinet: "101", position: "Chief physician", specialization: Some("Therapy") },
    DemoStaff { last: "Petrova", first: "Maria", middle: "Ivanovna", born: (1980, 8, 22), hired: (2015, 6, 20), cabinet: "102", position: "Therapist", specialization: Some("Therapy") },
    DemoStaff { last: "Sidorov", first: "Dmitry", middle: "Alexandrovich", born: (1985, 3, 30), hired: (2018, 9, 1), cabinet: "103", position: "Cardiologist", specialization: Some("Cardiology") },
    DemoStaff { last: "Kozlova", first: "Elena", middle: "Sergeevna", born: (1990, 11, 5), hired: (2020, 1, 15), cabinet: "201", position: "Neurologist", specialization: Some("Neurology") },
    DemoStaff { last: "Smirnova", first: "Anna", middle: "Vladimirovna", born: (1992, 7, 18), hired: (2021, 4, 10), cabinet: "001", position: "Registrar", specialization: None },
];

const PATIENTS: [(&str, &str, &str, (i32, u32, u32), &str, &str); 5] = [
    ("Vasiliev", "Igor", "Nikolaevich", (1985, 2, 14), "M", "12 Lenin St, apt 5"),
    ("Nikolaeva", "Olga", "Sergeevna", (1990, 6, 25), "F", "25 Sovetskaya St, apt 12"),
    ("Fedorov", "Mikhail", "Alexandrovich", (1978, 9, 3), "M", "5 Mira St, apt 8"),
    ("Alexandrova", "Tatiana", "Igorevna", (1995, 12, 12), "F", "15 Pushkin St, apt 3"),
    ("Dmitriev", "Sergey", "Vladimirovich", (2000, 4, 30), "M", "8 Gagarin St, apt 15"),
];

/// Complaints, diagnosis code, examination, recommendation, medication,
/// dosage, frequency, course length in days.
const VISITS: [(&str, &str, &str, &str, &str, &str, &str, i64); 5] = [
    ("Headache, weakness", "I10", "BP 140/90, HR 80", "Antihypertensives, recheck in a week", "Enalapril", "10 mg", "twice daily", 30),
    ("Back pain", "M54.5", "Limited spinal mobility", "Physiotherapy, exercise therapy", "Diclofenac", "50 mg", "three times daily", 10),
    ("High blood pressure", "I10", "BP 160/100", "Antihypertensives, diet", "Amlodipine", "5 mg", "once daily", 30),
    ("Cough, fever", "J06.9", "Wheezing, temperature 37.8", "Antivirals, bed rest", "Umifenovir", "200 mg", "four times daily", 7),
    ("Stomach pain", "K29.7", "Tender on palpation", "Diet, antacids", "Omeprazole", "20 mg", "twice daily", 14),
];

const SLOT_DAYS: i64 = 7;
const SLOTS_PER_DAY: u32 = 5;

fn ymd((y, m, d): (i32, u32, u32)) -> Result<NaiveDate, SeedError> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| SeedError::MissingReference(format!("date {y}-{m}-{d}")))
}

fn hour(h: u32) -> Result<NaiveTime, SeedError> {
    NaiveTime::from_hms_opt(h, 0, 0).ok_or_else(|| SeedError::MissingReference(format!("hour {h}")))
}

/// Staff, patients, a week of hourly slots around `today`, past visits with
/// records and prescriptions, and a few upcoming bookings.
///
/// Expects [`seed_reference_data`] to have run.
pub fn seed_demo_data(conn: &Connection, today: NaiveDate) -> Result<SeedSummary, SeedError> {
    let positions = repository::list_positions(conn)?;
    let specializations = repository::list_specializations(conn)?;
    let diagnoses = repository::list_diagnoses(conn)?;

    let mut summary = SeedSummary::default();

    let mut doctors = Vec::new();
    for s in &STAFF {
        let position_id = positions
            .iter()
            .find(|p| p.name == s.position)
            .map(|p| p.id)
            .ok_or_else(|| SeedError::MissingReference(s.position.into()))?;
        let specialization_id = match s.specialization {
            Some(name) => Some(
                specializations
                    .iter()
                    .find(|sp| sp.name == name)
                    .map(|sp| sp.id)
                    .ok_or_else(|| SeedError::MissingReference(name.into()))?,
            ),
            None => None,
        };
        let id = repository::insert_staff(conn, &NewStaffMember {
            last_name: s.last.into(),
            first_name: s.first.into(),
            patronymic: Some(s.middle.into()),
            birth_date: Some(ymd(s.born)?),
            email: Some(format!("{}@clinic.local", s.last.to_lowercase())),
            hire_date: Some(ymd(s.hired)?),
            cabinet_number: Some(s.cabinet.into()),
            position_id,
            specialization_id,
            ..Default::default()
        })?;
        summary.staff += 1;
        if specialization_id.is_some() {
            doctors.push((id, s.cabinet));
        }
    }

    let mut patients = Vec::new();
    for (i, (last, first, middle, born, gender, address)) in PATIENTS.iter().enumerate() {
        let id = repository::insert_patient(conn, &NewPatient {
            last_name: (*last).into(),
            first_name: (*first).into(),
            patronymic: Some((*middle).into()),
            birth_date: Some(ymd(*born)?),
            gender: Some((*gender).into()),
            phone: Some(format!("+1 555 010 {:04}", 1000 + i)),
            address: Some((*address).into()),
            email: Some(format!("{}@mail.local", last.to_lowercase())),
            registration_date: Some(today - Duration::days(30 * (PATIENTS.len() - i) as i64)),
            ..Default::default()
        })?;
        patients.push(id);
        summary.patients += 1;
    }

    // Days run from two days ago so the past visits have slots to sit in.
    let first_day = today - Duration::days(2);
    for offset in 0..SLOT_DAYS {
        let work_date = first_day + Duration::days(offset);
        for &(staff_id, cabinet) in &doctors {
            for n in 0..SLOTS_PER_DAY {
                scheduling::create_slot(conn, &NewSlot {
                    staff_id,
                    work_date,
                    start_time: hour(9 + n)?,
                    end_time: hour(10 + n)?,
                    room: Some(cabinet.into()),
                    capacity: 1,
                    notes: None,
                })?;
                summary.slots += 1;
            }
        }
    }

    // One past visit per patient, spread over the doctors, each completed
    // and documented.
    for (i, (&patient_id, visit)) in patients.iter().zip(VISITS.iter()).enumerate() {
        let (complaints, code, exam, advice, medication, dosage, frequency, days) = *visit;
        let (staff_id, _) = doctors[i % doctors.len()];
        let visit_day = first_day + Duration::days((i % 2) as i64);
        let booking_id = scheduling::create_booking(conn, &BookingRequest {
            patient_id,
            staff_id,
            date: visit_day,
            time: hour(9 + (i as u32 / doctors.len() as u32))?,
            reason: Some("Consultation".into()),
        })?;
        scheduling::complete_booking(conn, booking_id)?;
        summary.bookings += 1;

        let diagnosis_id = diagnoses.iter().find(|d| d.code == code).map(|d| d.id);
        let record_id = clinical::attach_record(conn, booking_id, &NewClinicalRecord {
            complaints: Some(complaints.into()),
            diagnosis_id,
            examination_results: Some(exam.into()),
            recommendations: Some(advice.into()),
            next_visit_date: Some(today + Duration::days(14)),
            is_emergency: i == 2,
        })?;
        summary.records += 1;

        clinical::add_prescription(conn, record_id, &NewPrescription {
            medication_name: medication.into(),
            dosage: Some(dosage.into()),
            frequency: Some(frequency.into()),
            duration: Some(format!("{days} days")),
            start_date: Some(visit_day),
            end_date: Some(visit_day + Duration::days(days)),
            ..Default::default()
        })?;
        summary.prescriptions += 1;
    }

    // Upcoming visits tomorrow morning.
    for (i, &patient_id) in patients.iter().enumerate() {
        let (staff_id, _) = doctors[i % doctors.len()];
        scheduling::create_booking(conn, &BookingRequest {
            patient_id,
            staff_id,
            date: today + Duration::days(1),
            time: hour(9 + (i as u32 / doctors.len() as u32))?,
            reason: Some("Follow-up".into()),
        })?;
        summary.bookings += 1;
    }

    tracing::info!(
        staff = summary.staff,
        patients = summary.patients,
        slots = summary.slots,
        bookings = summary.bookings,
        "Demo data seeded"
    );
    Ok(summary)
}

// ── Test accounts ──────────────────────────────────────────

enum Link {
    None,
    Staff(&'static str),
    Patient(&'static str),
}

const TEST_USERS: [(&str, &str, UserRole, Link); 6] = [
    ("admin", "admin123", UserRole::Admin, Link::None),
    ("doctor1", "doctor123", UserRole::Doctor, Link::Staff("Ivanov")),
    ("doctor2", "doctor123", UserRole::Doctor, Link::Staff("Petrova")),
    ("registrar", "registrar123", UserRole::Registrar, Link::Staff("Smirnova")),
    ("patient1", "patient123", UserRole::Patient, Link::Patient("Vasiliev")),
    ("patient2", "patient123", UserRole::Patient, Link::Patient("Nikolaeva")),
];

/// Registers the demo accounts that do not exist yet. Returns how many
/// were created.
pub fn create_test_users(conn: &Connection, iterations: u32) -> Result<usize, SeedError> {
    let staff = repository::list_staff(conn)?;
    let patients = repository::list_patients(conn)?;
    let mut created = 0;

    for (username, password, role, link) in &TEST_USERS {
        let (staff_id, patient_id) = match link {
            Link::None => (None, None),
            Link::Staff(last) => (staff.iter().find(|s| s.last_name == *last).map(|s| s.id), None),
            Link::Patient(last) => (None, patients.iter().find(|p| p.last_name == *last).map(|p| p.id)),
        };
        let user = NewUser {
            username: (*username).into(),
            password: (*password).into(),
            role: *role,
            email: None,
            staff_id,
            patient_id,
        };
        match auth::register_user(conn, &user, iterations) {
            Ok(_) => created += 1,
            Err(AuthError::UsernameTaken(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(created)
}

/// Seeds everything when the store holds no patients yet. Returns `None`
/// for a store that already has data.
pub fn seed_if_empty(
    conn: &Connection,
    today: NaiveDate,
    iterations: u32,
) -> Result<Option<SeedSummary>, SeedError> {
    if repository::count_patients(conn)? > 0 {
        return Ok(None);
    }
    let reference = seed_reference_data(conn)?;
    let demo = seed_demo_data(conn, today)?;
    let users = create_test_users(conn, iterations)?;
    Ok(Some(SeedSummary {
        positions: reference.positions,
        specializations: reference.specializations,
        diagnoses: reference.diagnoses,
        services: reference.services,
        users,
        ..demo
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;

    const FAST: u32 = 1_000;

    #[test]
    fn reference_data_fills_catalog() {
        let conn = test_db();
        let summary = seed_reference_data(&conn).unwrap();
        assert_eq!(summary.positions, repository::list_positions(&conn).unwrap().len());
        assert_eq!(repository::list_diagnoses(&conn).unwrap().len(), 5);
        assert_eq!(repository::list_services(&conn, true).unwrap().len(), 7);
    }

    #[test]
    fn demo_data_respects_scheduling_rules() {
        let conn = test_db();
        let today = date(2024, 3, 10);
        seed_reference_data(&conn).unwrap();
        let summary = seed_demo_data(&conn, today).unwrap();

        assert_eq!(summary.staff, 5);
        assert_eq!(summary.patients, 5);
        assert_eq!(summary.slots, 7 * 4 * 5);
        assert_eq!(summary.bookings, 10);
        assert_eq!(summary.records, 5);
        assert_eq!(repository::count_records(&conn).unwrap(), 5);

        let open = scheduling::list_open_slots(&conn, &SlotFilter::default()).unwrap();
        assert!(open.iter().all(|s| s.remaining <= s.slot.capacity));
    }

    #[test]
    fn seed_if_empty_runs_once() {
        let conn = test_db();
        let summary = seed_if_empty(&conn, date(2024, 3, 10), FAST).unwrap().unwrap();
        assert_eq!(summary.users, 6);
        assert_eq!(summary.services, 7);
        assert_eq!(summary.patients, 5);
        assert!(seed_if_empty(&conn, date(2024, 3, 10), FAST).unwrap().is_none());

        let session = auth::authenticate(&conn, "doctor1", "doctor123", FAST).unwrap();
        assert_eq!(session.display_name, "Ivanov Alexander Petrovich");
        let session = auth::authenticate(&conn, "patient2", "patient123", FAST).unwrap();
        assert_eq!(session.display_name, "Nikolaeva Olga Sergeevna");
    }

    #[test]
    fn test_users_skip_existing_accounts() {
        let conn = test_db();
        auth::ensure_default_admin(&conn, "changed-password", FAST).unwrap();
        assert_eq!(create_test_users(&conn, FAST).unwrap(), 5);
        assert!(auth::authenticate(&conn, "admin", "changed-password", FAST).is_ok());
    }
}
