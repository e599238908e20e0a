//! Service configuration.
//!
//! Reads configuration from environment variables:
//! - `TEMPORA_DB_PATH`: SQLite database file path (default: in-memory database)

/// Environment variable naming the SQLite database file.
pub const DB_PATH_VAR: &str = "TEMPORA_DB_PATH";

/// Settings for opening a [`GraphService`](crate::GraphService).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// SQLite database file. `None` keeps the database in memory.
    pub db_path: Option<String>,
}

impl ServiceConfig {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Self {
        ServiceConfig {
            db_path: std::env::var(DB_PATH_VAR).ok().filter(|p| !p.is_empty()),
        }
    }

    pub fn with_db_path(path: impl Into<String>) -> Self {
        ServiceConfig {
            db_path: Some(path.into()),
        }
    }
}
