use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using local file database");
                    "sqlite://dental_calendar.db".to_string()
                }),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| match raw.parse() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("PORT is not a valid port number: {}", raw);
                        None
                    }
                })
                .unwrap_or(3005),
        }
    }
}
