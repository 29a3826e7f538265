//! Helpers for wiring cell tests against a throwaway database.
use std::path::Path;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;

use shared_config::AppConfig;
use shared_database::Database;
use shared_events::EventBroadcaster;
use shared_state::AppState;

fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        port: 0,
    }
}

/// State over a private in-memory database. Single connection, so the
/// in-memory database is shared across all queries of the test.
pub async fn memory_state() -> Arc<AppState> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");

    let db = Database::from_pool(pool);
    db.init_schema().await.expect("schema bootstrap");

    Arc::new(AppState::new(
        test_config("sqlite::memory:"),
        db,
        EventBroadcaster::default(),
    ))
}

/// State over a file-backed database, for tests that need real connection
/// concurrency (e.g. competing bookings).
pub async fn file_state(dir: &Path) -> Arc<AppState> {
    let database_url = format!("sqlite://{}", dir.join("calendar.db").display());
    let config = test_config(&database_url);
    let state = AppState::from_config(config)
        .await
        .expect("file-backed database");
    Arc::new(state)
}
