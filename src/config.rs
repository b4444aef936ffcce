use std::path::{Path, PathBuf};

use crate::auth::PBKDF2_ITERATIONS;

/// Application-level constants
pub const APP_NAME: &str = "MedClinic";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_DB_FILE: &str = "medical_clinic.db";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

pub const ENV_DATA_DIR: &str = "MEDCLINIC_DATA_DIR";
pub const ENV_DB_FILE: &str = "MEDCLINIC_DB";
pub const ENV_ADMIN_PASSWORD: &str = "MEDCLINIC_ADMIN_PASSWORD";
pub const ENV_PBKDF2_ITERATIONS: &str = "MEDCLINIC_PBKDF2_ITERATIONS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medclinic_lib=info,medclinic=info,warn"
}

/// Get the application data directory
/// ~/MedClinic/, or ./MedClinic when no home directory is known
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct ClinicConfig {
    pub data_dir: PathBuf,
    pub db_file: String,
    pub admin_password: String,
    pub pbkdf2_iterations: u32,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            data_dir: app_data_dir(),
            db_file: DEFAULT_DB_FILE.into(),
            admin_password: DEFAULT_ADMIN_PASSWORD.into(),
            pbkdf2_iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl ClinicConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values fall back to
    /// defaults; an unparsable iteration count is logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = get(ENV_DB_FILE) {
            config.db_file = file;
        }
        if let Some(password) = get(ENV_ADMIN_PASSWORD) {
            config.admin_password = password;
        }
        if let Some(raw) = get(ENV_PBKDF2_ITERATIONS) {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.pbkdf2_iterations = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid {ENV_PBKDF2_ITERATIONS}"),
            }
        }
        config
    }

    /// Config rooted at `dir`, for tests and tools.
    pub fn with_data_dir(dir: &Path) -> Self {
        Self {
            data_dir: dir.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}
