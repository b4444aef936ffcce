pub mod auth; // Access gate: accounts, sessions, role checks
pub mod backup;
pub mod clinical; // Clinical record store
pub mod commands; // Caller boundary
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod reporting;
pub mod scheduling; // Availability ledger + appointment scheduler
pub mod seed;
pub mod validation;

use tracing_subscriber::EnvFilter;

use crate::core_state::CoreState;

/// Starts the clinic core. Errors are logged before they are returned so
/// the binary can exit non-zero.
pub fn run() -> Result<(), seed::SeedError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let state = CoreState::from_env();
    let report = bootstrap(&state).inspect_err(|e| tracing::error!(error = %e, "Startup failed"))?;

    if report.admin_created {
        tracing::warn!(username = auth::DEFAULT_ADMIN_USERNAME, "Created default admin account; change its password");
    }
    match &report.seeded {
        Some(summary) => tracing::info!(
            patients = summary.patients,
            staff = summary.staff,
            slots = summary.slots,
            bookings = summary.bookings,
            "Seeded empty store"
        ),
        None => tracing::debug!("Store already populated, skipping seed"),
    }
    Ok(())
}

/// What a startup changed in the store.
#[derive(Debug, Default)]
struct BootstrapReport {
    admin_created: bool,
    seeded: Option<seed::SeedSummary>,
}

/// Opens (and migrates) the store, makes sure an admin can log in, and
/// seeds a brand-new store with reference and demo data.
fn bootstrap(state: &CoreState) -> Result<BootstrapReport, seed::SeedError> {
    let config = state.config();
    let conn = state.open_db()?;
    tracing::info!(path = %config.database_path().display(), "Store ready");

    let admin_created = auth::ensure_default_admin(&conn, &config.admin_password, state.pbkdf2_iterations())?;
    let seeded = seed::seed_if_empty(&conn, state.today(), state.pbkdf2_iterations())?;

    let stats = reporting::clinic_statistics(&conn, state.today())
        .map_err(|e| tracing::warn!(error = %e, "Statistics unavailable"))
        .ok();
    if let Some(stats) = stats {
        tracing::info!(
            patients = stats.patients,
            doctors = stats.doctors,
            bookings = stats.bookings,
            records = stats.records,
            "Clinic summary"
        );
    }
    Ok(BootstrapReport { admin_created, seeded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClinicConfig;

    fn state_in(dir: &std::path::Path) -> CoreState {
        let mut config = ClinicConfig::with_data_dir(dir);
        config.pbkdf2_iterations = 1_000;
        CoreState::new(config)
    }

    #[test]
    fn first_start_creates_admin_and_seeds_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());

        let first = bootstrap(&state).unwrap();
        assert!(first.admin_created);
        assert!(first.seeded.is_some());

        let second = bootstrap(&state).unwrap();
        assert!(!second.admin_created);
        assert!(second.seeded.is_none());
    }

    #[test]
    fn unusable_data_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let err = bootstrap(&state_in(&blocker.join("clinic"))).unwrap_err();
        assert!(matches!(err, seed::SeedError::Database(_)));
    }
}
