//! Whole-store snapshots: create, list, preview and restore.
//!
//! A backup is a pair of files in the backups directory:
//! `backup_<YYYYmmdd_HHMMSS>.db`, a consistent copy taken with
//! `VACUUM INTO`, and `backup_<...>.json`, a manifest that can be read
//! without opening the snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::APP_VERSION;
use crate::db::{self, DatabaseError, SCHEMA_VERSION};

/// Manifest format written by this build.
pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// Tables counted into the manifest.
const COUNTED_TABLES: [&str; 11] = [
    "positions",
    "specializations",
    "diagnoses",
    "services",
    "patients",
    "employees",
    "schedules",
    "appointments",
    "medical_records",
    "prescriptions",
    "users",
];

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub version: u32,
    pub created_at: NaiveDateTime,
    pub app_version: String,
    pub schema_version: i64,
    pub db_file: String,
    pub row_counts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupResult {
    pub db_path: PathBuf,
    pub manifest_path: PathBuf,
    pub size_bytes: u64,
    pub manifest: BackupManifest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub name: String,
    pub db_path: PathBuf,
    pub size_bytes: u64,
    /// From the manifest, or the file's modification time without one.
    pub created_at: Option<NaiveDateTime>,
    pub has_manifest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorePreview {
    pub manifest: BackupManifest,
    pub size_bytes: u64,
    pub compatible: bool,
    pub compatibility_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResult {
    pub restored_from: PathBuf,
    /// Copy of the replaced store, absent when there was none.
    pub safety_copy: Option<PathBuf>,
    pub row_counts: BTreeMap<String, i64>,
}

fn manifest_path_for(db_path: &Path) -> PathBuf {
    db_path.with_extension("json")
}

fn row_counts(conn: &Connection) -> Result<BTreeMap<String, i64>, rusqlite::Error> {
    COUNTED_TABLES
        .iter()
        .map(|table| {
            let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok((table.to_string(), n))
        })
        .collect()
}

/// First free `<prefix>_<timestamp>[_n].db` name in `dir`.
fn unique_db_path(dir: &Path, prefix: &str, now: NaiveDateTime) -> PathBuf {
    let stamp = now.format("%Y%m%d_%H%M%S");
    let mut candidate = dir.join(format!("{prefix}_{stamp}.db"));
    let mut n = 2;
    while candidate.exists() || manifest_path_for(&candidate).exists() {
        candidate = dir.join(format!("{prefix}_{stamp}_{n}.db"));
        n += 1;
    }
    candidate
}

/// Snapshots the live store into `dir` and writes its manifest.
pub fn create_backup(conn: &Connection, dir: &Path) -> Result<BackupResult, BackupError> {
    std::fs::create_dir_all(dir)?;
    let now = chrono::Local::now().naive_local();
    let db_path = unique_db_path(dir, "backup", now);

    conn.execute("VACUUM INTO ?1", [db_path.to_string_lossy()])?;

    let manifest = BackupManifest {
        version: BACKUP_FORMAT_VERSION,
        created_at: now,
        app_version: APP_VERSION.into(),
        schema_version: db::get_current_version(conn),
        db_file: db_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        row_counts: row_counts(conn)?,
    };
    let manifest_path = manifest_path_for(&db_path);
    std::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;

    let size_bytes = std::fs::metadata(&db_path)?.len();
    tracing::info!(path = %db_path.display(), size_bytes, "Backup created");

    Ok(BackupResult {
        db_path,
        manifest_path,
        size_bytes,
        manifest,
    })
}

/// Backups in `dir`, newest first. A missing directory has none.
pub fn list_backups(dir: &Path) -> Result<Vec<BackupInfo>, BackupError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !(name.starts_with("backup_") && name.ends_with(".db")) {
            continue;
        }
        let meta = entry.metadata()?;
        let manifest = read_manifest(&manifest_path_for(&path)).ok();
        let created_at = manifest.as_ref().map(|m| m.created_at).or_else(|| {
            meta.modified()
                .ok()
                .map(|t| chrono::DateTime::<chrono::Local>::from(t).naive_local())
        });
        backups.push(BackupInfo {
            name,
            db_path: path,
            size_bytes: meta.len(),
            created_at,
            has_manifest: manifest.is_some(),
        });
    }

    backups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.name.cmp(&a.name)));
    Ok(backups)
}

fn read_manifest(path: &Path) -> Result<BackupManifest, BackupError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Reads a backup's manifest without opening the snapshot.
pub fn preview_backup(db_path: &Path) -> Result<RestorePreview, BackupError> {
    if !db_path.exists() {
        return Err(BackupError::NotFound(db_path.display().to_string()));
    }
    let manifest_path = manifest_path_for(db_path);
    if !manifest_path.exists() {
        return Err(BackupError::NotFound(manifest_path.display().to_string()));
    }
    let manifest = read_manifest(&manifest_path)?;
    let size_bytes = std::fs::metadata(db_path)?.len();

    let compatibility_message = if manifest.version > BACKUP_FORMAT_VERSION {
        Some(format!("Backup format v{} is newer than this build supports.", manifest.version))
    } else if manifest.schema_version > SCHEMA_VERSION {
        Some(format!(
            "Backup schema v{} is newer than this build's v{SCHEMA_VERSION}.",
            manifest.schema_version
        ))
    } else {
        None
    };

    Ok(RestorePreview {
        manifest,
        size_bytes,
        compatible: compatibility_message.is_none(),
        compatibility_message,
    })
}

/// Checks that `path` is an intact store this build can open.
fn validate_snapshot(path: &Path) -> Result<(), BackupError> {
    let invalid = |e: rusqlite::Error| BackupError::Validation(format!("not a readable store: {e}"));
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(invalid)?;

    let integrity: String = conn
        .query_row("PRAGMA integrity_check", [], |row| row.get(0))
        .map_err(invalid)?;
    if integrity != "ok" {
        return Err(BackupError::Validation(format!("integrity check failed: {integrity}")));
    }

    match db::get_current_version(&conn) {
        0 => Err(BackupError::Validation("file holds no clinic schema".into())),
        v if v > SCHEMA_VERSION => Err(BackupError::Validation(format!(
            "schema v{v} is newer than this build's v{SCHEMA_VERSION}"
        ))),
        _ => Ok(()),
    }
}

/// Replaces the store at `db_path` with the snapshot at `backup_path`.
///
/// The current store is first copied to `pre_restore_<ts>.db` in
/// `backups_dir`. Callers must close their connections to `db_path`
/// beforehand.
pub fn restore_backup(
    backup_path: &Path,
    db_path: &Path,
    backups_dir: &Path,
) -> Result<RestoreResult, BackupError> {
    if !backup_path.exists() {
        return Err(BackupError::NotFound(backup_path.display().to_string()));
    }
    validate_snapshot(backup_path)?;

    let safety_copy = if db_path.exists() {
        std::fs::create_dir_all(backups_dir)?;
        let copy = unique_db_path(backups_dir, "pre_restore", chrono::Local::now().naive_local());
        std::fs::copy(db_path, &copy)?;
        Some(copy)
    } else {
        None
    };

    // Copy beside the target first so the swap is a rename.
    let staging = db_path.with_extension("restoring");
    std::fs::copy(backup_path, &staging)?;
    std::fs::rename(&staging, db_path)?;

    let conn = db::open_database(db_path)?;
    let counts = row_counts(&conn)?;

    tracing::info!(
        from = %backup_path.display(),
        patients = counts.get("patients").copied().unwrap_or(0),
        "Store restored from backup"
    );

    Ok(RestoreResult {
        restored_from: backup_path.to_path_buf(),
        safety_copy,
        row_counts: counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{count_patients, fixtures::*};

    fn file_store(dir: &Path) -> (PathBuf, Connection) {
        let path = dir.join("clinic.db");
        let conn = db::open_database(&path).unwrap();
        make_patient(&conn, "Smith", "Anna", date(1990, 5, 1));
        make_patient(&conn, "Brown", "Bob", date(2015, 8, 20));
        (path, conn)
    }

    #[test]
    fn backup_writes_snapshot_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let (_, conn) = file_store(dir.path());
        let backups = dir.path().join("backups");

        let result = create_backup(&conn, &backups).unwrap();

        assert!(result.db_path.exists());
        assert!(result.manifest_path.exists());
        assert!(result.size_bytes > 0);
        let name = result.manifest.db_file.clone();
        assert!(name.starts_with("backup_") && name.ends_with(".db"), "{name}");
        assert_eq!(result.manifest.schema_version, SCHEMA_VERSION);
        assert_eq!(result.manifest.row_counts["patients"], 2);

        let snapshot = db::open_database(&result.db_path).unwrap();
        assert_eq!(count_patients(&snapshot).unwrap(), 2);
    }

    #[test]
    fn preview_reads_manifest_only() {
        let dir = tempfile::tempdir().unwrap();
        let (_, conn) = file_store(dir.path());
        let result = create_backup(&conn, dir.path()).unwrap();

        let preview = preview_backup(&result.db_path).unwrap();
        assert!(preview.compatible);
        assert_eq!(preview.manifest, result.manifest);

        std::fs::remove_file(&result.manifest_path).unwrap();
        assert!(matches!(preview_backup(&result.db_path), Err(BackupError::NotFound(_))));
    }

    #[test]
    fn newer_manifest_is_flagged_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let (_, conn) = file_store(dir.path());
        let result = create_backup(&conn, dir.path()).unwrap();

        let mut manifest = result.manifest.clone();
        manifest.schema_version = SCHEMA_VERSION + 1;
        std::fs::write(&result.manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();

        let preview = preview_backup(&result.db_path).unwrap();
        assert!(!preview.compatible);
        assert!(preview.compatibility_message.is_some());
    }

    #[test]
    fn list_is_newest_first_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let (_, conn) = file_store(dir.path());
        let backups = dir.path().join("backups");
        let first = create_backup(&conn, &backups).unwrap();
        let second = create_backup(&conn, &backups).unwrap();
        std::fs::write(backups.join("notes.txt"), "not a backup").unwrap();

        let listed = list_backups(&backups).unwrap();
        let paths: Vec<&PathBuf> = listed.iter().map(|b| &b.db_path).collect();
        assert_eq!(paths, vec![&second.db_path, &first.db_path]);
        assert!(listed.iter().all(|b| b.has_manifest));

        assert!(list_backups(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn restore_replaces_store_and_keeps_safety_copy() {
        let dir = tempfile::tempdir().unwrap();
        let (db_path, conn) = file_store(dir.path());
        let backups = dir.path().join("backups");
        let backup = create_backup(&conn, &backups).unwrap();

        make_patient(&conn, "Late", "Comer", date(2000, 1, 1));
        assert_eq!(count_patients(&conn).unwrap(), 3);
        drop(conn);

        let result = restore_backup(&backup.db_path, &db_path, &backups).unwrap();
        assert_eq!(result.row_counts["patients"], 2);

        let safety = result.safety_copy.unwrap();
        assert!(safety.file_name().unwrap().to_string_lossy().starts_with("pre_restore_"));
        assert_eq!(count_patients(&db::open_database(&safety).unwrap()).unwrap(), 3);
        assert_eq!(count_patients(&db::open_database(&db_path).unwrap()).unwrap(), 2);
    }

    #[test]
    fn restore_rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let (db_path, conn) = file_store(dir.path());
        drop(conn);

        let garbage = dir.path().join("garbage.db");
        std::fs::write(&garbage, b"definitely not sqlite, just some bytes padding it out").unwrap();
        assert!(matches!(
            restore_backup(&garbage, &db_path, dir.path()),
            Err(BackupError::Validation(_))
        ));

        let empty = dir.path().join("empty.db");
        Connection::open(&empty).unwrap().execute_batch("CREATE TABLE t (x)").unwrap();
        assert!(matches!(
            restore_backup(&empty, &db_path, dir.path()),
            Err(BackupError::Validation(_))
        ));

        assert!(matches!(
            restore_backup(&dir.path().join("missing.db"), &db_path, dir.path()),
            Err(BackupError::NotFound(_))
        ));
        assert_eq!(count_patients(&db::open_database(&db_path).unwrap()).unwrap(), 2);
    }
}
