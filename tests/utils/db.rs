/// Postgres test utilities with singleton pattern
///
/// Tests that need a real database call [`test_database`] and return early
/// when `TEST_DATABASE_URL` is not set.
use diesel::RunQueryDsl;
use lunafrost_lib::shared::Database;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

static DATABASE: OnceLock<Option<Arc<Database>>> = OnceLock::new();
static TEST_LOCK: Mutex<()> = Mutex::new(());

/// Migrated test database, or `None` when no test server is configured
pub fn test_database() -> Option<Arc<Database>> {
    DATABASE
        .get_or_init(|| {
            dotenvy::dotenv().ok();
            let url = std::env::var("TEST_DATABASE_URL").ok()?;

            let database = Database::new(&url).expect("Failed to create test database pool");
            database
                .run_migrations()
                .expect("Failed to run test migrations");
            Some(Arc::new(database))
        })
        .clone()
}

/// Serializes tests sharing the database; survives a panicking test
pub fn acquire_test_lock() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clean all tables - use at the start of each test
pub fn clean_test_db(database: &Database) {
    let mut conn = database.get_connection().expect("Failed to get DB connection");

    diesel::sql_query(
        "TRUNCATE TABLE background_jobs, translation_token_usage, chapters, novels \
         RESTART IDENTITY CASCADE",
    )
    .execute(&mut conn)
    .expect("Failed to clean test tables");
}
