// src/config/mod.rs
// All tunables load from the environment (.env supported). Keyword and
// journal configuration is NOT here: it is loaded into an immutable
// snapshot per scan cycle so that concurrent scans never race a reload.

use once_cell::sync::Lazy;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // ── Database Configuration
    pub database_url: String,
    pub sqlite_max_connections: u32,

    // ── Crossref API Configuration
    pub crossref_api_url: String,
    pub crossref_mailto: String,
    pub fetch_days: i64,
    pub fetch_max_rows: u32,

    // ── Scan Cycle Configuration
    pub cache_window_hours: i64,
    pub fetch_timeout_secs: u64,
    pub max_concurrent_fetches: usize,

    // ── Recommendation Defaults
    pub min_score: f64,
    pub prune_after_days: i64,

    // ── Keyword Configuration
    pub keyword_overrides_path: Option<String>,
    pub exclusion_filter_enabled: bool,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            clean_val.parse::<T>().unwrap_or(default)
        }
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        // Missing .env is fine; plain environment variables still apply.
        let _ = dotenvy::dotenv();

        Self {
            database_url: env_var_or("DATABASE_URL", "sqlite:./paperscout.db".to_string()),
            sqlite_max_connections: env_var_or("SQLITE_MAX_CONNECTIONS", 10),
            crossref_api_url: env_var_or(
                "CROSSREF_API_URL",
                "https://api.crossref.org/works".to_string(),
            ),
            crossref_mailto: env_var_or(
                "CROSSREF_MAILTO",
                "research@example.com".to_string(),
            ),
            fetch_days: env_var_or("PAPERSCOUT_FETCH_DAYS", 30),
            fetch_max_rows: env_var_or("PAPERSCOUT_FETCH_MAX_ROWS", 100),
            cache_window_hours: env_var_or("PAPERSCOUT_CACHE_WINDOW_HOURS", 24),
            fetch_timeout_secs: env_var_or("PAPERSCOUT_FETCH_TIMEOUT", 60),
            max_concurrent_fetches: env_var_or("PAPERSCOUT_MAX_CONCURRENT_FETCHES", 4),
            min_score: env_var_or("PAPERSCOUT_MIN_SCORE", 0.2),
            prune_after_days: env_var_or("PAPERSCOUT_PRUNE_AFTER_DAYS", 90),
            keyword_overrides_path: std::env::var("PAPERSCOUT_KEYWORDS_FILE").ok(),
            exclusion_filter_enabled: env_var_or("PAPERSCOUT_EXCLUSION_FILTER", true),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_window_hours)
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        // The ambient environment must not leak into this assertion.
        for key in [
            "PAPERSCOUT_FETCH_DAYS",
            "PAPERSCOUT_FETCH_MAX_ROWS",
            "PAPERSCOUT_MIN_SCORE",
        ] {
            std::env::remove_var(key);
        }
        let config = Config::from_env();
        assert_eq!(config.fetch_days, 30);
        assert_eq!(config.fetch_max_rows, 100);
        assert!((config.min_score - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn env_var_or_strips_inline_comments() {
        std::env::set_var("PAPERSCOUT_TEST_VALUE", "42 # rows per request");
        let parsed: u32 = env_var_or("PAPERSCOUT_TEST_VALUE", 0);
        assert_eq!(parsed, 42);
        std::env::remove_var("PAPERSCOUT_TEST_VALUE");
    }
}
