use anyhow::Result;

use shared_config::AppConfig;
use shared_database::Database;
use shared_events::EventBroadcaster;

/// Shared state handed to every cell router.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub events: EventBroadcaster,
}

impl AppState {
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let db = Database::connect(&config).await?;
        Ok(Self {
            config,
            db,
            events: EventBroadcaster::default(),
        })
    }

    /// Assemble state around an existing database, e.g. a test pool.
    pub fn new(config: AppConfig, db: Database, events: EventBroadcaster) -> Self {
        Self { config, db, events }
    }
}
