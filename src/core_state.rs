//! Shared application state handed to every command.
//!
//! Holds resolved configuration only. Who is calling travels separately as
//! an explicit [`crate::auth::Session`]; nothing here remembers a login.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::config::ClinicConfig;
use crate::db::{self, DatabaseError};

pub struct CoreState {
    config: ClinicConfig,
}

impl CoreState {
    pub fn new(config: ClinicConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(ClinicConfig::from_env())
    }

    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    /// Opens a fresh connection to the store, migrating it if needed.
    ///
    /// Each command opens its own connection; SQLite's write lock
    /// serialises concurrent writers.
    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        db::open_database(&self.config.database_path())
    }

    pub fn pbkdf2_iterations(&self) -> u32 {
        self.config.pbkdf2_iterations
    }

    pub fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}
