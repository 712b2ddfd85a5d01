use std::env;

pub const DEFAULT_DB_URL: &str = "sqlite:tracker.sqlite3";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Runtime settings, read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerConfig {
    pub db_url: String,
    pub log_filter: String,
}

impl TrackerConfig {
    /// `TRACKER_DB_URL` and `TRACKER_LOG`, falling back to defaults when
    /// unset or blank.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            db_url: read("TRACKER_DB_URL", DEFAULT_DB_URL),
            log_filter: read("TRACKER_LOG", DEFAULT_LOG_FILTER),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
