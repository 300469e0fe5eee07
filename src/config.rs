#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// SQLite database file path.
    pub database_path: String,
    /// Admins that must remain after any role removal.
    pub min_admin_count: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: "data/dacgov.db".to_string(),
            min_admin_count: 2,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment (and a `.env` file when
    /// present). Unset or malformed values fall back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = EngineConfig::default();

        let database_path = match std::env::var("DACGOV_DATABASE") {
            Ok(val) if !val.is_empty() => val,
            _ => defaults.database_path,
        };

        let min_admin_count = match std::env::var("DACGOV_MIN_ADMIN_COUNT") {
            Ok(val) => match val.parse::<i64>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    log::warn!(
                        "DACGOV_MIN_ADMIN_COUNT invalid ({val}) — using default {}",
                        defaults.min_admin_count
                    );
                    defaults.min_admin_count
                }
            },
            Err(_) => defaults.min_admin_count,
        };

        EngineConfig {
            database_path,
            min_admin_count,
        }
    }
}
