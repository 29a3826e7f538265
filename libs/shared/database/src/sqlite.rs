use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use shared_config::AppConfig;

/// Handle to the practice calendar database: one SQLite file, one table.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        debug!("Connecting to {}", config.database_url);

        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Wrap an already-connected pool. The caller is responsible for
    /// running `init_schema` before first use.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the appointments table and its indexes if missing.
    ///
    /// The partial unique index is what makes booking atomic: a competing
    /// insert for the same non-cancelled (date, start_time) fails at the
    /// database instead of racing an application-level existence check.
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing calendar schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS appointments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                patient_name TEXT NOT NULL,
                phone TEXT,
                date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                treatment_type TEXT NOT NULL DEFAULT 'Beratung',
                notes TEXT,
                status TEXT NOT NULL DEFAULT 'confirmed',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_slot
                ON appointments (date, start_time)
                WHERE status <> 'cancelled'
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments (date)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_appointments_phone ON appointments (phone)",
        )
        .execute(&self.pool)
        .await?;

        info!("Calendar schema ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> Database {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let db = Database::from_pool(pool);
        db.init_schema().await.unwrap();
        db
    }

    async fn insert_slot(db: &Database, date: &str, time: &str, status: &str) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments
                (patient_name, date, start_time, end_time, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind("Test Patient")
        .bind(date)
        .bind(time)
        .bind("09:30")
        .bind(status)
        .bind("2025-01-01T00:00:00Z")
        .bind("2025-01-01T00:00:00Z")
        .execute(db.pool())
        .await
        .map(|_| ())
    }

    #[tokio::test]
    async fn test_init_schema_idempotent() {
        let db = setup_test_db().await;

        // A second run must not fail or duplicate anything
        db.init_schema().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_slot_index_rejects_double_booking() {
        let db = setup_test_db().await;

        insert_slot(&db, "2025-03-10", "09:00", "confirmed").await.unwrap();
        let err = insert_slot(&db, "2025-03-10", "09:00", "confirmed")
            .await
            .unwrap_err();

        match err {
            sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
            other => panic!("expected unique violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_rows_free_their_slot() {
        let db = setup_test_db().await;

        insert_slot(&db, "2025-03-10", "09:00", "cancelled").await.unwrap();
        // Same slot again as a live booking: allowed
        insert_slot(&db, "2025-03-10", "09:00", "confirmed").await.unwrap();
    }
}
